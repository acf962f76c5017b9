//! Scripted catalog fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use core_ingest::{
    ApiError, ApiResult, ArtistGenres, ArtistSummary, AudioFeatures, CatalogApi,
    DirectFeatureFetch, DirectOutcome, Page, TrackId, TrackRecord,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type FeatureScript = dyn Fn(&[TrackId]) -> ApiResult<Vec<Option<AudioFeatures>>> + Send + Sync;
type DirectScript = dyn Fn(&[TrackId]) -> DirectOutcome + Send + Sync;

pub fn ids(prefix: &str, count: usize) -> Vec<TrackId> {
    (0..count).map(|i| format!("{}{}", prefix, i)).collect()
}

pub fn features_for(id: &str) -> AudioFeatures {
    let mut features = AudioFeatures::empty(id);
    features.danceability = Some(0.5);
    features.tempo = Some(120.0);
    features
}

/// Serves every id it is asked for.
pub fn all_features(ids: &[TrackId]) -> ApiResult<Vec<Option<AudioFeatures>>> {
    Ok(ids.iter().map(|id| Some(features_for(id))).collect())
}

/// In-memory catalog with per-endpoint scripts and call logs.
pub struct ScriptedApi {
    playlists: HashMap<String, Vec<Vec<Option<TrackId>>>>,
    artists_by_name: HashMap<String, (String, Vec<TrackId>)>,
    records: HashMap<TrackId, TrackRecord>,
    track_failures: Vec<(TrackId, ApiError)>,
    features: Box<FeatureScript>,
    genres: HashMap<String, Vec<String>>,
    failing_artists: Vec<String>,
    bearer: Option<String>,

    pub requested_tracks: Mutex<Vec<TrackId>>,
    pub track_calls: AtomicUsize,
    pub feature_calls: Mutex<Vec<usize>>,
    pub artist_calls: AtomicUsize,
    pub refreshes: AtomicUsize,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self {
            playlists: HashMap::new(),
            artists_by_name: HashMap::new(),
            records: HashMap::new(),
            track_failures: Vec::new(),
            features: Box::new(all_features),
            genres: HashMap::new(),
            failing_artists: Vec::new(),
            bearer: None,
            requested_tracks: Mutex::new(Vec::new()),
            track_calls: AtomicUsize::new(0),
            feature_calls: Mutex::new(Vec::new()),
            artist_calls: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
        }
    }
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Playlist served in `pages`; empty strings become entries without a track.
    pub fn with_playlist(mut self, id: &str, pages: Vec<Vec<&str>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| {
                page.into_iter()
                    .map(|item| (!item.is_empty()).then(|| item.to_string()))
                    .collect()
            })
            .collect();
        self.playlists.insert(id.to_string(), pages);
        self
    }

    pub fn with_artist(mut self, name: &str, artist_id: &str, top_tracks: &[&str]) -> Self {
        self.artists_by_name.insert(
            name.to_string(),
            (
                artist_id.to_string(),
                top_tracks.iter().map(|s| s.to_string()).collect(),
            ),
        );
        self
    }

    pub fn with_record(mut self, record: TrackRecord) -> Self {
        self.records.insert(record.id.clone(), record);
        self
    }

    /// Plain records, one per id, without artists.
    pub fn with_records<'a>(mut self, ids: impl IntoIterator<Item = &'a TrackId>) -> Self {
        for id in ids {
            self.records.insert(id.clone(), TrackRecord::new(id.as_str()));
        }
        self
    }

    /// Any `tracks` batch containing `id` fails with `error`.
    pub fn failing_tracks(mut self, id: &str, error: ApiError) -> Self {
        self.track_failures.push((id.to_string(), error));
        self
    }

    pub fn with_features<F>(mut self, script: F) -> Self
    where
        F: Fn(&[TrackId]) -> ApiResult<Vec<Option<AudioFeatures>>> + Send + Sync + 'static,
    {
        self.features = Box::new(script);
        self
    }

    pub fn with_genres(mut self, artist_id: &str, genres: &[&str]) -> Self {
        self.genres.insert(
            artist_id.to_string(),
            genres.iter().map(|g| g.to_string()).collect(),
        );
        self
    }

    /// Any `artists` batch containing `artist_id` fails.
    pub fn failing_artist(mut self, artist_id: &str) -> Self {
        self.failing_artists.push(artist_id.to_string());
        self
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn feature_call_sizes(&self) -> Vec<usize> {
        self.feature_calls.lock().unwrap().clone()
    }

    pub fn requested_track_ids(&self) -> Vec<TrackId> {
        self.requested_tracks.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogApi for ScriptedApi {
    async fn playlist_page(
        &self,
        playlist_id: &str,
        cursor: Option<&str>,
        _page_size: usize,
    ) -> ApiResult<Page<Option<TrackId>>> {
        let pages = self
            .playlists
            .get(playlist_id)
            .ok_or_else(|| ApiError::not_found(format!("playlist {}", playlist_id)))?;

        let index = match cursor {
            Some(cursor) => cursor
                .rsplit('#')
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| ApiError::rejected(400, "bad cursor"))?,
            None => 0,
        };

        let items = pages.get(index).cloned().unwrap_or_default();
        let next = (index + 1 < pages.len()).then(|| format!("{}#{}", playlist_id, index + 1));
        Ok(Page { items, next })
    }

    async fn search_artist(&self, name: &str, limit: usize) -> ApiResult<Vec<ArtistSummary>> {
        Ok(self
            .artists_by_name
            .get(name)
            .map(|(id, _)| ArtistSummary {
                id: id.clone(),
                name: name.to_string(),
            })
            .into_iter()
            .take(limit)
            .collect())
    }

    async fn artist_top_tracks(&self, artist_id: &str, _market: &str) -> ApiResult<Vec<TrackId>> {
        self.artists_by_name
            .values()
            .find(|(id, _)| id == artist_id)
            .map(|(_, tracks)| tracks.clone())
            .ok_or_else(|| ApiError::not_found(format!("artist {}", artist_id)))
    }

    async fn tracks(&self, ids: &[TrackId]) -> ApiResult<Vec<Option<TrackRecord>>> {
        self.track_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_tracks
            .lock()
            .unwrap()
            .extend(ids.iter().cloned());

        if let Some((_, error)) = self
            .track_failures
            .iter()
            .find(|(id, _)| ids.contains(id))
        {
            return Err(error.clone());
        }

        Ok(ids.iter().map(|id| self.records.get(id).cloned()).collect())
    }

    async fn audio_features(&self, ids: &[TrackId]) -> ApiResult<Vec<Option<AudioFeatures>>> {
        self.feature_calls.lock().unwrap().push(ids.len());
        (self.features)(ids)
    }

    async fn artists(&self, ids: &[String]) -> ApiResult<Vec<Option<ArtistGenres>>> {
        self.artist_calls.fetch_add(1, Ordering::SeqCst);
        if ids.iter().any(|id| self.failing_artists.contains(id)) {
            return Err(ApiError::transient("artist lookup failed"));
        }
        Ok(ids
            .iter()
            .map(|id| {
                self.genres.get(id).map(|genres| ArtistGenres {
                    id: id.clone(),
                    genres: genres.clone(),
                })
            })
            .collect())
    }

    async fn refresh_credentials(&self) -> ApiResult<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn bearer_token(&self) -> Option<String> {
        self.bearer.clone()
    }
}

/// Direct request path driven by a closure.
pub struct ScriptedDirect {
    respond: Box<DirectScript>,
    pub calls: Mutex<Vec<(usize, String)>>,
}

impl ScriptedDirect {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&[TrackId]) -> DirectOutcome + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DirectFeatureFetch for ScriptedDirect {
    async fn fetch_direct(&self, ids: &[TrackId], bearer_token: &str) -> DirectOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((ids.len(), bearer_token.to_string()));
        (self.respond)(ids)
    }
}
