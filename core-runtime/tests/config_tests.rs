use core_runtime::config::{BackoffConfig, IngestConfig, DEFAULT_TOKEN_URL};
use core_runtime::logging::{init_logging, LogLevel, LoggingConfig};
use core_runtime::Error;
use std::time::Duration;

#[test]
fn builder_overrides_every_option() {
    let config = IngestConfig::builder()
        .client_id("id")
        .client_secret("secret")
        .max_tracks(10)
        .market("GB")
        .max_concurrent_batches(2)
        .rate_limit_delay_ms(0)
        .backoff(BackoffConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        })
        .request_timeout(Duration::from_secs(3))
        .api_base_url("http://localhost:8080/v1")
        .build()
        .expect("valid config");

    assert_eq!(config.max_tracks, 10);
    assert_eq!(config.market, "GB");
    assert_eq!(config.max_concurrent_batches, 2);
    assert_eq!(config.rate_limit_delay_ms, 0);
    assert_eq!(config.backoff.max_attempts, 2);
    assert_eq!(config.request_timeout, Duration::from_secs(3));
    assert_eq!(config.api_base_url, "http://localhost:8080/v1");
    assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
}

#[test]
fn rate_limit_above_a_minute_is_rejected() {
    let result = IngestConfig::builder()
        .client_id("id")
        .client_secret("secret")
        .rate_limit_delay_ms(61_000)
        .build();

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn empty_environment_values_count_as_missing() {
    let result = IngestConfig::from_lookup(|key| match key {
        "SPOTIFY_CLIENT_ID" => Some("   ".to_string()),
        "SPOTIPY_CLIENT_ID" => Some("fallback-id".to_string()),
        "SPOTIFY_CLIENT_SECRET" => Some("secret".to_string()),
        _ => None,
    })
    .expect("fallback id should be used");

    assert_eq!(result.credentials.client_id, "fallback-id");
}

#[test]
fn logging_initializes_once() {
    let config = LoggingConfig::default().with_level(LogLevel::Warn);
    assert!(init_logging(config.clone()).is_ok());
    assert!(matches!(init_logging(config), Err(Error::Config(_))));
}
