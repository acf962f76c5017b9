//! Spotify Web API Client
//!
//! Implements [`CatalogApi`] on top of the host [`HttpClient`].
//!
//! ## API Endpoints
//!
//! - **Playlist items**: `GET /playlists/{id}/tracks?fields=items.track.id,next&limit=100`
//! - **Artist search**: `GET /search?q=artist:{name}&type=artist&limit=1`
//! - **Top tracks**: `GET /artists/{id}/top-tracks?market={market}`
//! - **Tracks**: `GET /tracks?ids=` (up to 50)
//! - **Audio features**: `GET /audio-features?ids=` (up to 100)
//! - **Artists**: `GET /artists?ids=` (up to 50)
//!
//! ## Error classification
//!
//! Every failure becomes an [`ApiError`]: 404 is `NotFound`, 401/403 is
//! `Authorization`, 429/5xx/transport errors and unreadable bodies are
//! `Transient`, other 4xx are `Rejected`.
//!
//! ## Credentials
//!
//! Bearer tokens come from a shared [`TokenProvider`]. The client remembers
//! the held token once the API refuses it, so [`CatalogApi::refresh_credentials`]
//! can hand it to [`TokenProvider::force_refresh`] and concurrent callers
//! share one refresh.

use crate::api::{ApiError, ApiErrorKind, ApiResult, CatalogApi, Page};
use crate::models::{ArtistGenres, ArtistSummary, AudioFeatures, TrackId, TrackRecord};
use crate::providers::types::{
    ArtistSearchResponse, ArtistsResponse, AudioFeaturesResponse, PlaylistItemsResponse,
    TopTracksResponse, TracksResponse,
};
use crate::rate_limiter::SharedRateLimiter;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use core_auth::{AuthError, TokenProvider};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Fields requested for playlist items
const PLAYLIST_FIELDS: &str = "items.track.id,next";

/// Default timeout for API requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SpotifyClient {
    http_client: Arc<dyn HttpClient>,
    tokens: Arc<TokenProvider>,
    rate_limiter: SharedRateLimiter,
    base_url: String,
    timeout: Duration,
    /// Most recent held bearer value answered with 401/403
    rejected_token: Mutex<Option<String>>,
}

impl SpotifyClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        tokens: Arc<TokenProvider>,
        rate_limiter: SharedRateLimiter,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            tokens,
            rate_limiter,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: REQUEST_TIMEOUT,
            rejected_token: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Comma-joined, percent-encoded id list for `?ids=`.
    pub(crate) fn encode_ids(ids: &[String]) -> String {
        ids.iter()
            .map(|id| urlencoding::encode(id).into_owned())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Remembers `refused` for the next refresh, unless the provider has
    /// already moved past it. A late refusal of an older token must not
    /// mask a refusal of the one currently held.
    pub(crate) async fn note_refused(&self, refused: &str) {
        let mut rejected = self.rejected_token.lock().await;
        let held = self.tokens.cached_token().await;
        match held {
            Some(held) if held.secret() != refused => {
                debug!("Ignoring refusal of a token that was already replaced");
            }
            _ => *rejected = Some(refused.to_string()),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> ApiResult<T> {
        let token = self.tokens.access_token().await.map_err(auth_failure)?;

        self.rate_limiter.lock().await.wait_if_needed().await;

        debug!(url = %url, "Spotify API request");
        let request = HttpRequest::get(url.as_str())
            .bearer_token(token.secret())
            .header("Accept", "application/json")
            .timeout(self.timeout);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| ApiError::transient(format!("Request to {} failed: {}", url, e)))?;

        if let Some(kind) = ApiErrorKind::from_status(response.status) {
            if kind == ApiErrorKind::Authorization {
                self.note_refused(token.secret()).await;
            }
            let excerpt = response.body_excerpt(200);
            debug!(status = response.status, body = %excerpt, "Spotify API error response");
            return Err(ApiError::new(kind, Some(response.status), excerpt)
                .with_retry_after(response.retry_after()));
        }

        response
            .json()
            .map_err(|e| ApiError::transient(format!("Unreadable response from {}: {}", url, e)))
    }
}

/// Maps token failures onto the API taxonomy.
fn auth_failure(error: AuthError) -> ApiError {
    match error {
        AuthError::CredentialsRejected { status, body } => ApiError::rejected(status, body),
        other => ApiError::transient(other.to_string()),
    }
}

#[async_trait]
impl CatalogApi for SpotifyClient {
    async fn playlist_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> ApiResult<Page<Option<TrackId>>> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => format!(
                "{}/playlists/{}/tracks?fields={}&limit={}",
                self.base_url,
                urlencoding::encode(playlist_id),
                urlencoding::encode(PLAYLIST_FIELDS),
                page_size
            ),
        };

        let page: PlaylistItemsResponse = self.get_json(url).await?;
        Ok(Page {
            items: page
                .items
                .into_iter()
                .map(|item| item.track.and_then(|track| track.id))
                .collect(),
            next: page.next,
        })
    }

    async fn search_artist(&self, name: &str, limit: usize) -> ApiResult<Vec<ArtistSummary>> {
        let query = format!("artist:{}", name);
        let url = format!(
            "{}/search?q={}&type=artist&limit={}",
            self.base_url,
            urlencoding::encode(&query),
            limit
        );

        let response: ArtistSearchResponse = self.get_json(url).await?;
        Ok(response.artists.items)
    }

    async fn artist_top_tracks(&self, artist_id: &str, market: &str) -> ApiResult<Vec<TrackId>> {
        let url = format!(
            "{}/artists/{}/top-tracks?market={}",
            self.base_url,
            urlencoding::encode(artist_id),
            urlencoding::encode(market)
        );

        let response: TopTracksResponse = self.get_json(url).await?;
        Ok(response
            .tracks
            .into_iter()
            .filter_map(|track| track.id)
            .collect())
    }

    async fn tracks(&self, ids: &[TrackId]) -> ApiResult<Vec<Option<TrackRecord>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/tracks?ids={}", self.base_url, Self::encode_ids(ids));

        let response: TracksResponse = self.get_json(url).await?;
        Ok(response
            .tracks
            .into_iter()
            .map(|track| track.and_then(|t| t.into_record()))
            .collect())
    }

    async fn audio_features(&self, ids: &[TrackId]) -> ApiResult<Vec<Option<AudioFeatures>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/audio-features?ids={}",
            self.base_url,
            Self::encode_ids(ids)
        );

        let response: AudioFeaturesResponse = self.get_json(url).await?;
        Ok(response.audio_features)
    }

    async fn artists(&self, ids: &[String]) -> ApiResult<Vec<Option<ArtistGenres>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/artists?ids={}", self.base_url, Self::encode_ids(ids));

        let response: ArtistsResponse = self.get_json(url).await?;
        Ok(response.artists)
    }

    async fn refresh_credentials(&self) -> ApiResult<()> {
        let stale = self.rejected_token.lock().await.clone();
        self.tokens
            .force_refresh(stale.as_deref())
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!(error = %e, "Token refresh failed");
                auth_failure(e)
            })
    }

    async fn bearer_token(&self) -> Option<String> {
        self.tokens
            .cached_token()
            .await
            .map(|token| token.secret().to_string())
    }
}
