//! # Ingestion Pipeline
//!
//! Drives one run from references to an assembled [`Dataset`].
//!
//! ## Phases
//!
//! 1. **Collect**: playlists, then artist names (top tracks), then direct
//!    ids. A reference that fails is logged and counted; the run goes on.
//! 2. **Prepare**: dedup in first-seen order, cap at `max_tracks`.
//! 3. **Primary**: track metadata in batches of 50 with bounded retry.
//! 4. **Attributes**: audio features for the primary ids through the
//!    degraded-mode recovery plan.
//! 5. **Genres**: artist genres for the primary records.
//! 6. **Assemble**: left join into one row per primary record.
//!
//! Each phase waits for all of its batches before the next one starts.
//! Only credential failures while connecting and cancellation end a run
//! with an error.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use core_ingest::{IngestPipeline, IngestRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! let pipeline = IngestPipeline::connect(config, Arc::new(ReqwestHttpClient::new())).await?;
//! let request = IngestRequest::new().with_playlists(["37i9dQZF1DXcBWIGoYBM5M"]);
//! let report = pipeline.run(request, &CancellationToken::new()).await?;
//! println!("{} rows", report.dataset.len());
//! ```

use crate::api::CatalogApi;
use crate::assembler::{assemble, cap_ids, dedup_ids};
use crate::attributes::{AttributeFetcher, BatchReport, DirectFeatureFetch};
use crate::backoff::BackoffPolicy;
use crate::collection::CollectionFetcher;
use crate::error::{IngestError, Result};
use crate::genres::GenreFetcher;
use crate::models::{Dataset, TrackId};
use crate::primary::PrimaryFetcher;
use crate::providers::{DirectFeatureRequest, SpotifyClient};
use crate::rate_limiter::RateLimiter;
use crate::stats::{IngestStats, RunId};
use bridge_traits::http::HttpClient;
use bridge_traits::time::{Clock, SystemClock};
use core_auth::{ClientCredentialsConfig, ClientCredentialsFlow, TokenProvider};
use core_runtime::config::{IngestConfig, DEFAULT_MARKET, DEFAULT_MAX_TRACKS};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, instrument, warn, Instrument};

/// What to ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestRequest {
    /// Playlist ids, URIs or URLs
    pub playlists: Vec<String>,
    /// Artist names, resolved through search
    pub artists: Vec<String>,
    pub track_ids: Vec<TrackId>,
    /// Overrides the configured cap for this run
    pub max_tracks: Option<usize>,
}

impl IngestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playlists<I, S>(mut self, playlists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.playlists.extend(playlists.into_iter().map(Into::into));
        self
    }

    pub fn with_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artists.extend(artists.into_iter().map(Into::into));
        self
    }

    pub fn with_track_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.track_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_max_tracks(mut self, max_tracks: usize) -> Self {
        self.max_tracks = Some(max_tracks);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty() && self.artists.is_empty() && self.track_ids.is_empty()
    }
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub run_id: RunId,
    pub dataset: Dataset,
    pub stats: IngestStats,
    /// Per-batch recovery history of the attribute phase
    pub attribute_reports: Vec<BatchReport>,
}

/// Run-level tunables taken from [`IngestConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub max_tracks: usize,
    pub market: String,
    pub max_concurrent_batches: usize,
    pub backoff: BackoffPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_tracks: DEFAULT_MAX_TRACKS,
            market: DEFAULT_MARKET.to_string(),
            max_concurrent_batches: 4,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl From<&IngestConfig> for PipelineSettings {
    fn from(config: &IngestConfig) -> Self {
        Self {
            max_tracks: config.max_tracks,
            market: config.market.clone(),
            max_concurrent_batches: config.max_concurrent_batches,
            backoff: BackoffPolicy::from(config.backoff),
        }
    }
}

pub struct IngestPipeline {
    api: Arc<dyn CatalogApi>,
    settings: PipelineSettings,
    collections: CollectionFetcher,
    primary: PrimaryFetcher,
    attributes: AttributeFetcher,
    genres: GenreFetcher,
}

impl IngestPipeline {
    /// Builds a pipeline over an existing API client.
    pub fn new(api: Arc<dyn CatalogApi>, settings: PipelineSettings) -> Self {
        let concurrency = settings.max_concurrent_batches;
        Self {
            collections: CollectionFetcher::new(api.clone()),
            primary: PrimaryFetcher::new(api.clone(), settings.backoff, concurrency),
            attributes: AttributeFetcher::new(api.clone(), concurrency),
            genres: GenreFetcher::new(api.clone(), concurrency),
            api,
            settings,
        }
    }

    /// Enables the direct request path of the attribute recovery plan.
    pub fn with_direct_fallback(mut self, direct: Arc<dyn DirectFeatureFetch>) -> Self {
        self.attributes = AttributeFetcher::new(self.api.clone(), self.settings.max_concurrent_batches)
            .with_direct_fallback(direct);
        self
    }

    /// Connects to the Spotify Web API with the configured credentials.
    ///
    /// The first access token is issued here, so bad credentials fail before
    /// any work starts.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Credentials`] when credentials are missing or the
    ///   token endpoint refuses them
    /// - [`IngestError::Config`] when a limit is out of range
    #[instrument(skip_all, fields(api_base_url = %config.api_base_url))]
    pub async fn connect(config: IngestConfig, http_client: Arc<dyn HttpClient>) -> Result<Self> {
        config.validate().map_err(|e| match e {
            core_runtime::Error::CapabilityMissing { message, .. } => IngestError::Credentials(message),
            other => IngestError::Config(other),
        })?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let flow = ClientCredentialsFlow::new(
            ClientCredentialsConfig::from_ingest_config(&config),
            http_client.clone(),
            clock.clone(),
        );
        let tokens = Arc::new(TokenProvider::new(flow, clock.clone()));

        tokens
            .access_token()
            .await
            .map_err(|e| IngestError::Credentials(e.to_string()))?;
        info!("Access token issued");

        let rate_limiter = RateLimiter::shared(config.rate_limit_delay_ms, clock);
        let client = SpotifyClient::new(
            http_client.clone(),
            tokens,
            rate_limiter.clone(),
            config.api_base_url.clone(),
        )
        .with_timeout(config.request_timeout);
        let direct = DirectFeatureRequest::new(
            http_client,
            rate_limiter,
            config.api_base_url.clone(),
            config.request_timeout,
        );

        Ok(Self::new(Arc::new(client), PipelineSettings::from(&config))
            .with_direct_fallback(Arc::new(direct)))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs every phase for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Cancelled`] once `cancel` fires. Reference,
    /// batch and genre failures are reflected in the report's stats instead.
    pub async fn run(&self, request: IngestRequest, cancel: &CancellationToken) -> Result<IngestReport> {
        let run_id = RunId::new();
        let span = info_span!("ingest_run", run_id = %run_id);
        self.execute(run_id, request, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: RunId,
        request: IngestRequest,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let limit = request.max_tracks.unwrap_or(self.settings.max_tracks);
        let mut stats = IngestStats::default();

        info!(
            playlists = request.playlists.len(),
            artists = request.artists.len(),
            track_ids = request.track_ids.len(),
            limit,
            "Starting ingestion run"
        );

        let collected = self.collect_ids(&request, limit, cancel, &mut stats).await?;
        let ids = cap_ids(dedup_ids(collected), limit);
        stats.ids_requested = ids.len();

        if ids.is_empty() {
            warn!("No track ids collected, nothing to ingest");
            return Ok(IngestReport {
                run_id,
                dataset: Dataset::default(),
                stats,
                attribute_reports: Vec::new(),
            });
        }

        ensure_active(cancel)?;
        let primary = self.primary.fetch(&ids, cancel).await?;
        stats.record_primary(&primary);

        ensure_active(cancel)?;
        let primary_ids = dedup_ids(primary.records.iter().map(|record| record.id.clone()));
        let attributes = self.attributes.fetch(&primary_ids, cancel).await?;
        stats.record_attributes(&attributes);

        ensure_active(cancel)?;
        let genres = self.genres.fetch(&primary.records, cancel).await?;
        stats.record_genres(&genres);

        let dataset = assemble(primary.records, attributes.features, &genres.genres);
        stats.record_dataset(&dataset);

        info!(
            rows = stats.rows,
            rows_with_attributes = stats.rows_with_attributes,
            coverage = stats.attribute_coverage(),
            metadata_only = !dataset.attributes_joined,
            degraded = stats.is_degraded(),
            "Ingestion run complete"
        );

        Ok(IngestReport {
            run_id,
            dataset,
            stats,
            attribute_reports: attributes.reports,
        })
    }

    /// Expands every reference into ids, in request order.
    ///
    /// Stops expanding references once `limit` distinct ids are known, since
    /// the cap would drop anything collected after that point.
    async fn collect_ids(
        &self,
        request: &IngestRequest,
        limit: usize,
        cancel: &CancellationToken,
        stats: &mut IngestStats,
    ) -> Result<Vec<TrackId>> {
        let mut collected = IdCollector::default();

        for reference in &request.playlists {
            ensure_active(cancel)?;
            if collected.distinct() >= limit {
                debug!(reference = %reference, "Track limit reached, playlist not expanded");
                continue;
            }
            match self.collections.fetch(reference, limit).await {
                Ok(ids) => {
                    stats.references_resolved += 1;
                    info!(reference = %reference, tracks = ids.len(), "Playlist collected");
                    collected.extend(ids);
                }
                Err(error) => {
                    stats.references_failed += 1;
                    warn!(reference = %reference, error = %error, "Playlist skipped");
                }
            }
        }

        for name in &request.artists {
            ensure_active(cancel)?;
            if collected.distinct() >= limit {
                debug!(artist = %name, "Track limit reached, artist not expanded");
                continue;
            }
            match self
                .collections
                .artist_top_tracks(name, &self.settings.market)
                .await
            {
                Ok(ids) => {
                    stats.references_resolved += 1;
                    info!(artist = %name, tracks = ids.len(), "Artist top tracks collected");
                    collected.extend(ids);
                }
                Err(error) => {
                    stats.references_failed += 1;
                    warn!(artist = %name, error = %error, "Artist skipped");
                }
            }
        }

        collected.extend(request.track_ids.iter().cloned());
        Ok(collected.into_ids())
    }
}

/// Ids in arrival order plus a count of distinct non-empty ones.
#[derive(Default)]
struct IdCollector {
    ids: Vec<TrackId>,
    seen: HashSet<TrackId>,
}

impl IdCollector {
    fn extend<I: IntoIterator<Item = TrackId>>(&mut self, ids: I) {
        for id in ids {
            let trimmed = id.trim();
            if !trimmed.is_empty() {
                self.seen.insert(trimmed.to_string());
            }
            self.ids.push(id);
        }
    }

    fn distinct(&self) -> usize {
        self.seen.len()
    }

    fn into_ids(self) -> Vec<TrackId> {
        self.ids
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(IngestError::Cancelled);
    }
    Ok(())
}
