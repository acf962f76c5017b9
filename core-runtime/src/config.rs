//! # Ingestion Configuration Module
//!
//! Provides configuration management for the catalog ingestion pipeline.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `IngestConfig` instance holding the API credentials and the run limits.
//! It enforces fail-fast validation: missing credentials are the one
//! condition that stops a run before it starts.
//!
//! Batch sizes (50 ids for tracks and artists, 100 for audio features) are
//! imposed by the upstream API and are deliberately not part of this struct.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::IngestConfig;
//!
//! let config = IngestConfig::builder()
//!     .client_id("my-client-id")
//!     .client_secret("my-client-secret")
//!     .max_tracks(500)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ### From the environment
//!
//! ```ignore
//! let config = IngestConfig::from_env()?;
//! ```
//!
//! Recognised variables: `SPOTIFY_CLIENT_ID` (or `SPOTIPY_CLIENT_ID`),
//! `SPOTIFY_CLIENT_SECRET` (or `SPOTIPY_CLIENT_SECRET`), `MAX_TRACKS`,
//! `INGEST_MARKET`, `INGEST_MAX_CONCURRENT`, `INGEST_RATE_LIMIT_MS`.

use crate::error::{Error, Result};
use crate::logging::redact_if_sensitive;
use std::time::Duration;
use tracing::debug;

/// Default cap on the number of distinct tracks per run
pub const DEFAULT_MAX_TRACKS: usize = 2000;

/// Default market used for artist top tracks
pub const DEFAULT_MARKET: &str = "US";

/// Spotify Web API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Spotify accounts token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Client-credentials pair for the catalog API.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &redact_if_sensitive("client_secret", &self.client_secret),
            )
            .finish()
    }
}

/// Retry/backoff settings for the primary batch fetcher.
///
/// The wait before retry `n` (1-based) is `min(max_delay, base_delay * 2^n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Attempts per batch, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Configuration for one ingestion run.
///
/// Use [`IngestConfigBuilder`] or [`IngestConfig::from_env`] to construct instances.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// API credentials (required)
    pub credentials: ApiCredentials,

    /// Maximum number of distinct tracks ingested in one run
    pub max_tracks: usize,

    /// Market passed to the artist top-tracks endpoint
    pub market: String,

    /// Number of batches in flight per phase
    pub max_concurrent_batches: usize,

    /// Minimum delay between two API requests, shared by all workers
    pub rate_limit_delay_ms: u64,

    /// Backoff for the primary batch fetcher
    pub backoff: BackoffConfig,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// API base URL (overridable for tests and proxies)
    pub api_base_url: String,

    /// Token endpoint URL
    pub token_url: String,
}

impl IngestConfig {
    /// Creates a new builder for constructing an `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Builds a configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Kept separate from [`from_env`](Self::from_env) so tests never touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_of = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let mut builder = Self::builder();

        if let Some(id) = first_of(&["SPOTIFY_CLIENT_ID", "SPOTIPY_CLIENT_ID"]) {
            builder = builder.client_id(id);
        }
        if let Some(secret) = first_of(&["SPOTIFY_CLIENT_SECRET", "SPOTIPY_CLIENT_SECRET"]) {
            builder = builder.client_secret(secret);
        }
        if let Some(raw) = first_of(&["MAX_TRACKS"]) {
            builder = builder.max_tracks(parse_number("MAX_TRACKS", &raw)?);
        }
        if let Some(market) = first_of(&["INGEST_MARKET"]) {
            builder = builder.market(market);
        }
        if let Some(raw) = first_of(&["INGEST_MAX_CONCURRENT"]) {
            builder = builder.max_concurrent_batches(parse_number("INGEST_MAX_CONCURRENT", &raw)?);
        }
        if let Some(raw) = first_of(&["INGEST_RATE_LIMIT_MS"]) {
            builder = builder.rate_limit_delay_ms(parse_number("INGEST_RATE_LIMIT_MS", &raw)?);
        }

        let config = builder.build()?;
        debug!(
            client_id = %config.credentials.client_id,
            max_tracks = config.max_tracks,
            market = %config.market,
            max_concurrent_batches = config.max_concurrent_batches,
            "Loaded ingestion configuration"
        );
        Ok(config)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Credentials are present
    /// - Track cap and concurrency are non-zero
    /// - Backoff settings allow at least one attempt
    /// - Rate limit delay stays under one minute
    pub fn validate(&self) -> Result<()> {
        if self.credentials.client_id.trim().is_empty() {
            return Err(credentials_missing_error("client id"));
        }

        if self.credentials.client_secret.trim().is_empty() {
            return Err(credentials_missing_error("client secret"));
        }

        if self.max_tracks == 0 {
            return Err(Error::Config(
                "max_tracks must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_batches == 0 {
            return Err(Error::Config(
                "max_concurrent_batches must be greater than 0".to_string(),
            ));
        }

        if self.backoff.max_attempts == 0 {
            return Err(Error::Config(
                "Backoff must allow at least one attempt".to_string(),
            ));
        }

        if self.rate_limit_delay_ms > 60_000 {
            return Err(Error::Config(
                "Rate limit delay exceeds maximum of 60 seconds (60,000ms)".to_string(),
            ));
        }

        if self.market.trim().is_empty() {
            return Err(Error::Config("Market cannot be empty".to_string()));
        }

        Ok(())
    }
}

fn credentials_missing_error(which: &str) -> Error {
    Error::CapabilityMissing {
        capability: "ClientCredentials".to_string(),
        message: format!(
            "API {} is required. Set SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET \
             in the environment or a .env file, or pass them to the builder.",
            which
        ),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

/// Builder for constructing [`IngestConfig`] instances.
///
/// Unset options fall back to their defaults; credentials have no default and
/// [`build()`](IngestConfigBuilder::build) fails without them.
#[derive(Default)]
pub struct IngestConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    max_tracks: Option<usize>,
    market: Option<String>,
    max_concurrent_batches: Option<usize>,
    rate_limit_delay_ms: Option<u64>,
    backoff: Option<BackoffConfig>,
    request_timeout: Option<Duration>,
    api_base_url: Option<String>,
    token_url: Option<String>,
}

impl IngestConfigBuilder {
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn max_tracks(mut self, max_tracks: usize) -> Self {
        self.max_tracks = Some(max_tracks);
        self
    }

    pub fn market(mut self, market: impl Into<String>) -> Self {
        self.market = Some(market.into());
        self
    }

    pub fn max_concurrent_batches(mut self, max: usize) -> Self {
        self.max_concurrent_batches = Some(max);
        self
    }

    pub fn rate_limit_delay_ms(mut self, delay_ms: u64) -> Self {
        self.rate_limit_delay_ms = Some(delay_ms);
        self
    }

    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Builds the final `IngestConfig`, validating all settings.
    ///
    /// # Errors
    ///
    /// - `Error::CapabilityMissing` when the client id or secret is absent
    /// - `Error::Config` when a limit is out of range
    pub fn build(self) -> Result<IngestConfig> {
        let client_id = self
            .client_id
            .ok_or_else(|| credentials_missing_error("client id"))?;
        let client_secret = self
            .client_secret
            .ok_or_else(|| credentials_missing_error("client secret"))?;

        let config = IngestConfig {
            credentials: ApiCredentials {
                client_id,
                client_secret,
            },
            max_tracks: self.max_tracks.unwrap_or(DEFAULT_MAX_TRACKS),
            market: self.market.unwrap_or_else(|| DEFAULT_MARKET.to_string()),
            max_concurrent_batches: self.max_concurrent_batches.unwrap_or(4),
            rate_limit_delay_ms: self.rate_limit_delay_ms.unwrap_or(100),
            backoff: self.backoff.unwrap_or_default(),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(10)),
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            token_url: self
                .token_url
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }
}
