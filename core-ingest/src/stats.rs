//! Run identifiers and per-run counters.

use crate::attributes::AttributePhase;
use crate::genres::GenrePhase;
use crate::models::Dataset;
use crate::primary::PrimaryPhase;
use serde::Serialize;
use uuid::Uuid;

/// Unique identifier for one ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestStats {
    pub references_resolved: usize,
    pub references_failed: usize,
    /// Distinct ids after dedup and cap
    pub ids_requested: usize,
    pub primary_batches: usize,
    pub primary_exhausted: usize,
    pub attribute_batches: usize,
    pub attribute_exhausted: usize,
    pub attribute_partially_recovered: usize,
    pub attribute_skipped_ids: usize,
    pub genre_batches: usize,
    pub genre_batches_failed: usize,
    pub rows: usize,
    pub rows_with_attributes: usize,
}

impl IngestStats {
    pub(crate) fn record_primary(&mut self, phase: &PrimaryPhase) {
        self.primary_batches = phase.batches;
        self.primary_exhausted = phase.exhausted_batches;
    }

    pub(crate) fn record_attributes(&mut self, phase: &AttributePhase) {
        self.attribute_batches = phase.batches;
        self.attribute_exhausted = phase.exhausted_batches;
        self.attribute_partially_recovered = phase.partially_recovered;
        self.attribute_skipped_ids = phase.skipped_ids;
    }

    pub(crate) fn record_genres(&mut self, phase: &GenrePhase) {
        self.genre_batches = phase.batches;
        self.genre_batches_failed = phase.failed_batches;
    }

    pub(crate) fn record_dataset(&mut self, dataset: &Dataset) {
        self.rows = dataset.len();
        self.rows_with_attributes = dataset.rows_with_attributes();
    }

    /// Share of rows carrying audio features, in `[0, 1]`. An empty dataset
    /// has coverage 0.
    pub fn attribute_coverage(&self) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        self.rows_with_attributes as f64 / self.rows as f64
    }

    /// True when any batch or reference contributed less than requested.
    pub fn is_degraded(&self) -> bool {
        self.references_failed > 0
            || self.primary_exhausted > 0
            || self.attribute_exhausted > 0
            || self.attribute_skipped_ids > 0
            || self.genre_batches_failed > 0
    }
}
