//! Raw audio-features request that bypasses [`SpotifyClient`].
//!
//! Used by the attribute recovery plan when the client call for a sub-batch
//! failed: the same endpoint is requested with the bearer token passed in,
//! and the raw status and body are reported back instead of being
//! classified. Requests go through the same rate limiter as the client.
//!
//! [`SpotifyClient`]: crate::providers::SpotifyClient

use crate::attributes::{DirectFeatureFetch, DirectOutcome};
use crate::models::TrackId;
use crate::providers::spotify::SpotifyClient;
use crate::providers::types::AudioFeaturesResponse;
use crate::rate_limiter::SharedRateLimiter;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Characters of a refused response body kept for diagnostics.
const BODY_EXCERPT_CHARS: usize = 500;

pub struct DirectFeatureRequest {
    http_client: Arc<dyn HttpClient>,
    rate_limiter: SharedRateLimiter,
    base_url: String,
    timeout: Duration,
}

impl DirectFeatureRequest {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        rate_limiter: SharedRateLimiter,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            rate_limiter,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl DirectFeatureFetch for DirectFeatureRequest {
    async fn fetch_direct(&self, ids: &[TrackId], bearer_token: &str) -> DirectOutcome {
        let url = format!(
            "{}/audio-features?ids={}",
            self.base_url,
            SpotifyClient::encode_ids(ids)
        );
        let request = HttpRequest::get(url)
            .bearer_token(bearer_token)
            .header("Accept", "application/json")
            .timeout(self.timeout);

        self.rate_limiter.lock().await.wait_if_needed().await;

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => return DirectOutcome::Failed(e.to_string()),
        };

        if !response.is_success() {
            return DirectOutcome::Refused {
                status: response.status,
                body: response.body_excerpt(BODY_EXCERPT_CHARS),
            };
        }

        match response.json::<AudioFeaturesResponse>() {
            Ok(parsed) => {
                debug!(size = ids.len(), "Direct audio features request succeeded");
                DirectOutcome::Features(parsed.audio_features)
            }
            Err(e) => DirectOutcome::Failed(format!("Unreadable audio features body: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use crate::rate_limiter::RateLimiter;
    use bridge_traits::http::HttpResponse;
    use bridge_traits::time::{Clock, SystemClock};
    use chrono::{DateTime, Utc};
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn direct(mock: MockHttpClient) -> DirectFeatureRequest {
        DirectFeatureRequest::new(
            Arc::new(mock),
            RateLimiter::shared(0, Arc::new(SystemClock)),
            "https://api.test/v1",
            Duration::from_secs(5),
        )
    }

    fn ids(list: &[&str]) -> Vec<TrackId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_features_parsed_with_given_token() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req: &HttpRequest| {
                req.url == "https://api.test/v1/audio-features?ids=t1,t2"
                    && req.headers.get("Authorization").map(String::as_str) == Some("Bearer raw")
            })
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"audio_features": [{"id": "t1", "danceability": 0.5, "key": 7}, null]}"#,
                ))
            });

        match direct(mock).fetch_direct(&ids(&["t1", "t2"]), "raw").await {
            DirectOutcome::Features(entries) => {
                assert_eq!(entries.len(), 2);
                let first = entries[0].as_ref().unwrap();
                assert_eq!(first.id, "t1");
                assert_eq!(first.key, Some(7));
                assert!(entries[1].is_none());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refusal_keeps_status_and_truncated_body() {
        let long_body = "x".repeat(2_000);
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(move |_| Ok(HttpResponse::new(403, long_body.clone())));

        match direct(mock).fetch_direct(&ids(&["t1"]), "raw").await {
            DirectOutcome::Refused { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body.chars().count(), BODY_EXCERPT_CHARS);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_is_failed() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Err(BridgeError::Connection("reset".to_string())));

        assert!(matches!(
            direct(mock).fetch_direct(&ids(&["t1"]), "raw").await,
            DirectOutcome::Failed(_)
        ));
    }

    /// Clock that never advances, so every request owes the full spacing.
    struct FrozenClock(DateTime<Utc>);

    impl Clock for FrozenClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_requests_share_client_spacing() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(2)
            .returning(|_| Ok(HttpResponse::new(403, "{}")));

        let limiter = RateLimiter::shared(1_000, Arc::new(FrozenClock(Utc::now())));
        let direct = DirectFeatureRequest::new(
            Arc::new(mock),
            limiter.clone(),
            "https://api.test/v1",
            Duration::from_secs(5),
        );
        let start = tokio::time::Instant::now();

        // A client request takes the first slot.
        limiter.lock().await.wait_if_needed().await;
        direct.fetch_direct(&ids(&["t1"]), "raw").await;
        assert!(start.elapsed() >= Duration::from_millis(1_000));

        direct.fetch_direct(&ids(&["t2"]), "raw").await;
        assert!(start.elapsed() >= Duration::from_millis(2_000));

        // The next client request waits behind the direct ones.
        limiter.lock().await.wait_if_needed().await;
        assert!(start.elapsed() >= Duration::from_millis(3_000));
    }
}
