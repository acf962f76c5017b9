//! # Audio Feature Fetcher
//!
//! The audio-features endpoint fails far more often than the track endpoint,
//! and frequently with authorization errors that a fresh token or a smaller
//! request gets past. Each batch of up to 100 ids walks an ordered recovery
//! plan until one stage succeeds:
//!
//! 1. [`RecoveryStrategy::FullBatch`]: one call with the whole batch.
//! 2. [`RecoveryStrategy::RefreshAndRetry`]: only after an authorization
//!    failure; reissue the token and retry the whole batch once.
//! 3. [`RecoveryStrategy::Reduce`] with 50, 20, 10, 5 and 1 ids per request.
//!    The first sub-batch decides whether a size is kept. It tries the client
//!    call, then the direct request when a bearer token and a
//!    [`DirectFeatureFetch`] are available. Once a size is kept, the rest of
//!    the batch runs at that size and failing sub-batches are skipped. At one
//!    id per request there is no smaller size left, so every id is tried and
//!    the batch is exhausted only if all of them fail.
//!
//! A batch whose plan runs out contributes no features. Nothing here returns
//! an error except cancellation; every attempt lands in a [`BatchReport`].

use crate::api::{ApiError, ApiErrorKind, CatalogApi};
use crate::error::{IngestError, Result};
use crate::models::{AudioFeatures, TrackId};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Ids per `audio-features` request; imposed by the API.
pub const ATTRIBUTE_BATCH_SIZE: usize = 100;

/// Sub-batch sizes tried by the reduction stages, largest first.
pub const REDUCTION_SIZES: [usize; 5] = [50, 20, 10, 5, SINGLE_ID_SIZE];

/// The last reduction stage, where every id is requested on its own.
const SINGLE_ID_SIZE: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryStrategy {
    FullBatch,
    RefreshAndRetry,
    Reduce(usize),
}

/// The fixed stage order applied to every batch.
pub fn recovery_plan() -> Vec<RecoveryStrategy> {
    let mut plan = vec![RecoveryStrategy::FullBatch, RecoveryStrategy::RefreshAndRetry];
    plan.extend(REDUCTION_SIZES.iter().map(|&size| RecoveryStrategy::Reduce(size)));
    plan
}

/// Result of a raw request made outside the API client.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectOutcome {
    Features(Vec<Option<AudioFeatures>>),
    /// Non-2xx answer; `body` holds at most 500 characters
    Refused { status: u16, body: String },
    /// The request never produced a response
    Failed(String),
}

/// Raw audio-features request with an explicit bearer token.
#[async_trait]
pub trait DirectFeatureFetch: Send + Sync {
    async fn fetch_direct(&self, ids: &[TrackId], bearer_token: &str) -> DirectOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPath {
    Client,
    Direct,
}

/// One request made while recovering a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub stage: RecoveryStrategy,
    /// Number of ids in the request
    pub size: usize,
    pub path: FetchPath,
    pub succeeded: bool,
    /// HTTP status of a failed attempt, when there was one
    pub status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchResolution {
    FullBatch,
    Refreshed,
    /// Recovered at `size` ids per request; `skipped_ids` kept no features
    Reduced { size: usize, skipped_ids: usize },
    Exhausted,
}

/// Everything that happened to one batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_index: usize,
    pub batch_len: usize,
    pub attempts: Vec<AttemptRecord>,
    pub resolution: BatchResolution,
    pub features: Vec<AudioFeatures>,
}

impl BatchReport {
    fn new(batch_index: usize, batch_len: usize) -> Self {
        Self {
            batch_index,
            batch_len,
            attempts: Vec::new(),
            resolution: BatchResolution::Exhausted,
            features: Vec::new(),
        }
    }

    /// Attempts made during `stage`, over both paths.
    pub fn attempts_in(&self, stage: RecoveryStrategy) -> usize {
        self.attempts.iter().filter(|a| a.stage == stage).count()
    }

    pub fn client_attempts(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.path == FetchPath::Client)
            .count()
    }

    /// Stages entered before the batch settled.
    pub fn stages_tried(&self) -> usize {
        let mut stages: Vec<RecoveryStrategy> = Vec::new();
        for attempt in &self.attempts {
            if !stages.contains(&attempt.stage) {
                stages.push(attempt.stage);
            }
        }
        stages.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.resolution == BatchResolution::Exhausted
    }

    fn record(&mut self, stage: RecoveryStrategy, size: usize, path: FetchPath, status: Option<u16>, succeeded: bool) {
        self.attempts.push(AttemptRecord {
            stage,
            size,
            path,
            succeeded,
            status,
        });
    }
}

/// Output of the attribute phase.
#[derive(Debug, Clone, Default)]
pub struct AttributePhase {
    pub features: Vec<AudioFeatures>,
    pub reports: Vec<BatchReport>,
    pub batches: usize,
    pub exhausted_batches: usize,
    /// Batches recovered by a reduction stage
    pub partially_recovered: usize,
    /// Ids left without features inside recovered batches
    pub skipped_ids: usize,
}

pub struct AttributeFetcher {
    api: Arc<dyn CatalogApi>,
    direct: Option<Arc<dyn DirectFeatureFetch>>,
    max_concurrent: usize,
}

impl AttributeFetcher {
    pub fn new(api: Arc<dyn CatalogApi>, max_concurrent: usize) -> Self {
        Self {
            api,
            direct: None,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn with_direct_fallback(mut self, direct: Arc<dyn DirectFeatureFetch>) -> Self {
        self.direct = Some(direct);
        self
    }

    /// Fetches audio features for `ids`. Only cancellation is an error.
    #[instrument(skip_all, fields(ids = ids.len()))]
    pub async fn fetch(&self, ids: &[TrackId], cancel: &CancellationToken) -> Result<AttributePhase> {
        let batches: Vec<&[TrackId]> = ids.chunks(ATTRIBUTE_BATCH_SIZE).collect();
        let mut phase = AttributePhase {
            batches: batches.len(),
            ..AttributePhase::default()
        };

        let mut reports = stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| self.recover_batch(index, batch, cancel))
            .buffered(self.max_concurrent);

        while let Some(report) = reports.next().await {
            let mut report = report?;
            match &report.resolution {
                BatchResolution::Exhausted => phase.exhausted_batches += 1,
                BatchResolution::Reduced { skipped_ids, .. } => {
                    phase.partially_recovered += 1;
                    phase.skipped_ids += skipped_ids;
                }
                BatchResolution::FullBatch | BatchResolution::Refreshed => {}
            }
            phase.features.append(&mut report.features);
            phase.reports.push(report);
        }

        info!(
            features = phase.features.len(),
            batches = phase.batches,
            exhausted = phase.exhausted_batches,
            reduced = phase.partially_recovered,
            "Attribute phase complete"
        );
        Ok(phase)
    }

    /// Walks the recovery plan for one batch.
    pub async fn recover_batch(
        &self,
        index: usize,
        batch: &[TrackId],
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::new(index, batch.len());
        let mut last_failure: Option<ApiErrorKind> = None;

        for stage in recovery_plan() {
            if cancel.is_cancelled() {
                return Err(IngestError::Cancelled);
            }

            match stage {
                RecoveryStrategy::FullBatch => {
                    match self.client_attempt(stage, batch, &mut report).await {
                        Ok(features) => {
                            report.features = features;
                            report.resolution = BatchResolution::FullBatch;
                            return Ok(report);
                        }
                        Err(error) => last_failure = Some(error.kind),
                    }
                }
                RecoveryStrategy::RefreshAndRetry => {
                    if last_failure != Some(ApiErrorKind::Authorization) {
                        continue;
                    }
                    if let Err(error) = self.api.refresh_credentials().await {
                        warn!(batch = index, error = %error, "Credential refresh failed");
                        last_failure = Some(error.kind);
                        continue;
                    }
                    match self.client_attempt(stage, batch, &mut report).await {
                        Ok(features) => {
                            report.features = features;
                            report.resolution = BatchResolution::Refreshed;
                            return Ok(report);
                        }
                        Err(error) => last_failure = Some(error.kind),
                    }
                }
                RecoveryStrategy::Reduce(size) => {
                    let single_ids = size == SINGLE_ID_SIZE;
                    let mut chunks = batch.chunks(size);
                    let Some(first) = chunks.next() else {
                        continue;
                    };

                    let mut recovered_any = true;
                    let mut skipped_ids = 0;
                    let mut features = match self.sub_batch_attempt(stage, first, &mut report).await {
                        Ok(features) => features,
                        Err(kind) if single_ids => {
                            // Nothing smaller to fall back to; the id alone is refused.
                            last_failure = kind;
                            recovered_any = false;
                            skipped_ids += first.len();
                            debug!(batch = index, "Single id refused, trying the rest one by one");
                            Vec::new()
                        }
                        Err(kind) => {
                            last_failure = kind;
                            debug!(batch = index, size, "Sub-batch size abandoned");
                            continue;
                        }
                    };

                    for chunk in chunks {
                        if cancel.is_cancelled() {
                            return Err(IngestError::Cancelled);
                        }
                        match self.sub_batch_attempt(stage, chunk, &mut report).await {
                            Ok(mut more) => {
                                recovered_any = true;
                                features.append(&mut more);
                            }
                            Err(kind) => {
                                skipped_ids += chunk.len();
                                if !recovered_any {
                                    last_failure = kind;
                                    continue;
                                }
                                warn!(
                                    batch = index,
                                    size,
                                    skipped = chunk.len(),
                                    "Sub-batch skipped at accepted size"
                                );
                            }
                        }
                    }

                    if !recovered_any {
                        break;
                    }

                    info!(
                        batch = index,
                        size,
                        recovered = features.len(),
                        skipped_ids,
                        "Batch recovered at reduced size"
                    );
                    report.features = features;
                    report.resolution = BatchResolution::Reduced { size, skipped_ids };
                    return Ok(report);
                }
            }
        }

        warn!(
            batch = index,
            size = batch.len(),
            attempts = report.attempts.len(),
            last_failure = ?last_failure,
            "Audio features unavailable for batch"
        );
        report.resolution = BatchResolution::Exhausted;
        Ok(report)
    }

    async fn client_attempt(
        &self,
        stage: RecoveryStrategy,
        ids: &[TrackId],
        report: &mut BatchReport,
    ) -> std::result::Result<Vec<AudioFeatures>, ApiError> {
        match self.api.audio_features(ids).await {
            Ok(entries) => {
                report.record(stage, ids.len(), FetchPath::Client, None, true);
                Ok(entries.into_iter().flatten().collect())
            }
            Err(error) => {
                debug!(stage = ?stage, size = ids.len(), error = %error, "Audio features request failed");
                report.record(stage, ids.len(), FetchPath::Client, error.status, false);
                Err(error)
            }
        }
    }

    /// Client call, then the direct request if possible. The error carries
    /// the client failure kind.
    async fn sub_batch_attempt(
        &self,
        stage: RecoveryStrategy,
        ids: &[TrackId],
        report: &mut BatchReport,
    ) -> std::result::Result<Vec<AudioFeatures>, Option<ApiErrorKind>> {
        let client_error = match self.client_attempt(stage, ids, report).await {
            Ok(features) => return Ok(features),
            Err(error) => error,
        };

        let Some(direct) = &self.direct else {
            return Err(Some(client_error.kind));
        };
        let Some(token) = self.api.bearer_token().await else {
            return Err(Some(client_error.kind));
        };

        match direct.fetch_direct(ids, &token).await {
            DirectOutcome::Features(entries) => {
                report.record(stage, ids.len(), FetchPath::Direct, None, true);
                Ok(entries.into_iter().flatten().collect())
            }
            DirectOutcome::Refused { status, body } => {
                warn!(status, body = %body, size = ids.len(), "Direct audio features request refused");
                report.record(stage, ids.len(), FetchPath::Direct, Some(status), false);
                Err(Some(client_error.kind))
            }
            DirectOutcome::Failed(message) => {
                warn!(error = %message, size = ids.len(), "Direct audio features request failed");
                report.record(stage, ids.len(), FetchPath::Direct, None, false);
                Err(Some(client_error.kind))
            }
        }
    }
}
