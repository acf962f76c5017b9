//! Catalog API seam.
//!
//! The fetchers never talk HTTP directly. They call a [`CatalogApi`], which
//! classifies every failure into an [`ApiErrorKind`]; retry and recovery
//! decisions switch on that kind only.

use crate::models::{ArtistGenres, ArtistSummary, AudioFeatures, TrackId, TrackRecord};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Failure classes the pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// 404: the resource does not exist or is not visible
    NotFound,
    /// 401/403: the token was refused
    Authorization,
    /// 429, 5xx, timeouts, broken connections, unreadable bodies
    Transient,
    /// Any other 4xx
    Rejected,
}

impl ApiErrorKind {
    /// Maps an HTTP status to a failure class. Returns `None` for 2xx.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            404 => Some(ApiErrorKind::NotFound),
            401 | 403 => Some(ApiErrorKind::Authorization),
            429 => Some(ApiErrorKind::Transient),
            400..=499 => Some(ApiErrorKind::Rejected),
            _ => Some(ApiErrorKind::Transient),
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiErrorKind::NotFound => "not found",
            ApiErrorKind::Authorization => "authorization",
            ApiErrorKind::Transient => "transient",
            ApiErrorKind::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Typed API failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
    /// Server-requested wait before the next attempt (429 `Retry-After`)
    pub retry_after: Option<Duration>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} error ({}): {}", self.kind, status, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn new(kind: ApiErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, wait: Option<Duration>) -> Self {
        self.retry_after = wait;
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, Some(404), message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Authorization, Some(401), message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transient, None, message)
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Rejected, Some(status), message)
    }

    /// Builds an error from a non-2xx status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = ApiErrorKind::from_status(status).unwrap_or(ApiErrorKind::Transient);
        Self::new(kind, Some(status), message)
    }

    /// Whether the primary fetcher should retry after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::Transient | ApiErrorKind::Authorization
        )
    }

    pub fn is_authorization(&self) -> bool {
        self.kind == ApiErrorKind::Authorization
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the next page; `None` on the last page
    pub next: Option<String>,
}

/// Authenticated catalog operations used by the pipeline.
///
/// Batch methods return one entry per requested id, in request order; `None`
/// marks ids the service had no record for.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Lists a playlist page. Entries without a track id come back as `None`.
    async fn playlist_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> ApiResult<Page<Option<TrackId>>>;

    async fn search_artist(&self, name: &str, limit: usize) -> ApiResult<Vec<ArtistSummary>>;

    async fn artist_top_tracks(&self, artist_id: &str, market: &str) -> ApiResult<Vec<TrackId>>;

    /// At most 50 ids.
    async fn tracks(&self, ids: &[TrackId]) -> ApiResult<Vec<Option<TrackRecord>>>;

    /// At most 100 ids.
    async fn audio_features(&self, ids: &[TrackId]) -> ApiResult<Vec<Option<AudioFeatures>>>;

    /// At most 50 ids.
    async fn artists(&self, ids: &[String]) -> ApiResult<Vec<Option<ArtistGenres>>>;

    /// Reissues the credential used by subsequent calls.
    async fn refresh_credentials(&self) -> ApiResult<()>;

    /// Raw bearer value currently in use, for the direct fallback path.
    async fn bearer_token(&self) -> Option<String>;
}
