//! Artist genre lookup.
//!
//! Genres only feed the `primary_artist_genre` column, so this phase is
//! best effort: a failing batch is logged and contributes nothing.

use crate::api::CatalogApi;
use crate::error::{IngestError, Result};
use crate::models::TrackRecord;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Ids per `artists` request; imposed by the API.
pub const ARTIST_BATCH_SIZE: usize = 50;

/// Artist id to its listed genres, in the order the API lists them.
pub type GenreMap = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Default)]
pub struct GenrePhase {
    pub genres: GenreMap,
    pub batches: usize,
    pub failed_batches: usize,
}

/// Distinct artist ids across `records`, first-seen order.
pub fn distinct_artist_ids(records: &[TrackRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .flat_map(|record| record.artist_ids.iter())
        .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// First genre of the first artist, in credit order, that has any genre.
pub fn primary_genre(artist_ids: &[String], genres: &GenreMap) -> Option<String> {
    artist_ids
        .iter()
        .filter_map(|id| genres.get(id))
        .find_map(|list| list.iter().find(|genre| !genre.is_empty()))
        .cloned()
}

pub struct GenreFetcher {
    api: Arc<dyn CatalogApi>,
    max_concurrent: usize,
}

impl GenreFetcher {
    pub fn new(api: Arc<dyn CatalogApi>, max_concurrent: usize) -> Self {
        Self {
            api,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Looks up genres for every artist credited on `records`.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn fetch(&self, records: &[TrackRecord], cancel: &CancellationToken) -> Result<GenrePhase> {
        let artist_ids = distinct_artist_ids(records);
        let batches: Vec<&[String]> = artist_ids.chunks(ARTIST_BATCH_SIZE).collect();
        let mut phase = GenrePhase {
            batches: batches.len(),
            ..GenrePhase::default()
        };

        let api: &dyn CatalogApi = self.api.as_ref();
        let mut results = stream::iter(batches.into_iter().enumerate())
            .map(move |(index, batch)| async move {
                if cancel.is_cancelled() {
                    return Err(IngestError::Cancelled);
                }
                Ok((index, batch.len(), api.artists(batch).await))
            })
            .buffered(self.max_concurrent);

        while let Some(result) = results.next().await {
            let (index, size, response) = result?;
            match response {
                Ok(artists) => {
                    for artist in artists.into_iter().flatten() {
                        phase.genres.insert(artist.id, artist.genres);
                    }
                }
                Err(error) => {
                    phase.failed_batches += 1;
                    warn!(batch = index, size, error = %error, "Artist batch failed, genres skipped");
                }
            }
        }

        info!(
            artists = artist_ids.len(),
            with_genres = phase.genres.values().filter(|g| !g.is_empty()).count(),
            failed_batches = phase.failed_batches,
            "Genre phase complete"
        );
        Ok(phase)
    }
}
