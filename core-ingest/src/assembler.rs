//! Id preparation and the final join.

use crate::genres::{primary_genre, GenreMap};
use crate::models::{AudioFeatures, Dataset, OutputRow, TrackId, TrackRecord};
use std::collections::{HashMap, HashSet};

/// Drops empty ids and repeats, keeping first-seen order.
pub fn dedup_ids<I>(ids: I) -> Vec<TrackId>
where
    I: IntoIterator<Item = TrackId>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// Keeps the first `max` ids.
pub fn cap_ids(mut ids: Vec<TrackId>, max: usize) -> Vec<TrackId> {
    ids.truncate(max);
    ids
}

/// Joins primary records with features and genres.
///
/// One row per distinct record id, in record order; the first record seen
/// for an id wins. Features are a left join. With no features at all the
/// join is skipped and the dataset is marked metadata-only.
pub fn assemble(primary: Vec<TrackRecord>, attributes: Vec<AudioFeatures>, genres: &GenreMap) -> Dataset {
    let attributes_joined = !attributes.is_empty();
    let mut features_by_id: HashMap<TrackId, AudioFeatures> = HashMap::with_capacity(attributes.len());
    for features in attributes {
        features_by_id.entry(features.id.clone()).or_insert(features);
    }

    let mut seen = HashSet::new();
    let rows = primary
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .map(|track| {
            let features = if attributes_joined {
                features_by_id.remove(&track.id)
            } else {
                None
            };
            let primary_artist_genre = primary_genre(&track.artist_ids, genres);
            OutputRow {
                track,
                features,
                primary_artist_genre,
            }
        })
        .collect();

    Dataset {
        rows,
        attributes_joined,
    }
}
