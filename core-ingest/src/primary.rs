//! Primary track metadata, fetched in batches with bounded retry.

use crate::api::CatalogApi;
use crate::backoff::{retry_with_backoff, BackoffPolicy, BatchOutcome};
use crate::error::{IngestError, Result};
use crate::models::{TrackId, TrackRecord};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Ids per `tracks` request; imposed by the API.
pub const PRIMARY_BATCH_SIZE: usize = 50;

/// Records gathered by the primary phase.
#[derive(Debug, Clone, Default)]
pub struct PrimaryPhase {
    /// Records in input order; ids without a record are absent
    pub records: Vec<TrackRecord>,
    pub batches: usize,
    pub exhausted_batches: usize,
}

pub struct PrimaryFetcher {
    api: Arc<dyn CatalogApi>,
    policy: BackoffPolicy,
    max_concurrent: usize,
}

impl PrimaryFetcher {
    pub fn new(api: Arc<dyn CatalogApi>, policy: BackoffPolicy, max_concurrent: usize) -> Self {
        Self {
            api,
            policy,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Fetches records for `ids`.
    ///
    /// Batches that exhaust their retries contribute nothing; only
    /// cancellation returns an error.
    #[instrument(skip_all, fields(ids = ids.len()))]
    pub async fn fetch(&self, ids: &[TrackId], cancel: &CancellationToken) -> Result<PrimaryPhase> {
        let batches: Vec<&[TrackId]> = ids.chunks(PRIMARY_BATCH_SIZE).collect();
        let mut phase = PrimaryPhase {
            batches: batches.len(),
            ..PrimaryPhase::default()
        };

        let mut outcomes = stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| self.fetch_batch(index, batch, cancel))
            .buffered(self.max_concurrent);

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                BatchOutcome::Success(records) => {
                    phase.records.extend(records.into_iter().flatten());
                }
                BatchOutcome::Exhausted(_) => phase.exhausted_batches += 1,
                BatchOutcome::Cancelled => return Err(IngestError::Cancelled),
            }
        }

        info!(
            records = phase.records.len(),
            batches = phase.batches,
            exhausted = phase.exhausted_batches,
            "Primary phase complete"
        );
        Ok(phase)
    }

    async fn fetch_batch(
        &self,
        index: usize,
        batch: &[TrackId],
        cancel: &CancellationToken,
    ) -> BatchOutcome<Vec<Option<TrackRecord>>> {
        if cancel.is_cancelled() {
            return BatchOutcome::Cancelled;
        }

        let api: &dyn CatalogApi = self.api.as_ref();
        let max_attempts = self.policy.max_attempts;
        let outcome = retry_with_backoff(&self.policy, cancel, move |attempt| async move {
            debug!(batch = index, attempt, size = batch.len(), "Fetching track batch");
            let result = api.tracks(batch).await;
            if let Err(error) = &result {
                // No retry follows the last attempt, so a new token would go unused.
                if error.is_authorization() && attempt < max_attempts {
                    if let Err(refresh_error) = api.refresh_credentials().await {
                        warn!(error = %refresh_error, "Credential refresh failed");
                    }
                }
            }
            result
        })
        .await;

        if let BatchOutcome::Exhausted(error) = &outcome {
            warn!(
                batch = index,
                size = batch.len(),
                error = %error,
                "Track batch skipped"
            );
        }
        outcome
    }
}
