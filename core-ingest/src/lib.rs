//! # Catalog Ingestion Core
//!
//! Bulk ingestion of track metadata, audio features and artist genres into
//! one denormalized [`Dataset`].
//!
//! ## Overview
//!
//! The catalog API is rate limited, paginated and unreliable in places: the
//! audio-features endpoint in particular refuses requests inconsistently.
//! This crate fetches everything it can and reports what it could not,
//! rather than failing the run.
//!
//! ## Components
//!
//! - [`resolver`]: playlist references to ids
//! - [`collection`]: paginated playlist listing and artist top tracks
//! - [`primary`] and [`backoff`]: batched track lookups with bounded retry
//! - [`attributes`]: audio features through an ordered recovery plan
//! - [`genres`] and [`assembler`]: genre lookup, dedup and the final join
//! - [`pipeline`]: the run driver
//! - [`providers`]: the Spotify Web API client and the direct request path

pub mod api;
pub mod assembler;
pub mod attributes;
pub mod backoff;
pub mod collection;
pub mod error;
pub mod genres;
pub mod models;
pub mod pipeline;
pub mod primary;
pub mod providers;
pub mod rate_limiter;
pub mod resolver;
pub mod stats;

pub use api::{ApiError, ApiErrorKind, ApiResult, CatalogApi, Page};
pub use attributes::{
    AttemptRecord, AttributeFetcher, AttributePhase, BatchReport, BatchResolution,
    DirectFeatureFetch, DirectOutcome, FetchPath, RecoveryStrategy,
};
pub use backoff::{BackoffPolicy, BatchOutcome};
pub use error::{IngestError, Result};
pub use models::{
    ArtistGenres, ArtistSummary, AudioFeatures, Dataset, OutputRow, TrackId, TrackRecord,
};
pub use pipeline::{IngestPipeline, IngestReport, IngestRequest, PipelineSettings};
pub use providers::{DirectFeatureRequest, SpotifyClient};
pub use resolver::resolve_collection_id;
pub use stats::{IngestStats, RunId};
