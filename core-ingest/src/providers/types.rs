//! Spotify Web API response types
//!
//! Only the fields the pipeline reads are declared; everything else in the
//! payloads is ignored.

use crate::models::{ArtistGenres, ArtistSummary, AudioFeatures, TrackRecord};
use serde::Deserialize;

/// `GET /playlists/{id}/tracks` page
#[derive(Debug, Deserialize)]
pub struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    /// Null for removed or local tracks
    #[serde(default)]
    pub track: Option<TrackRef>,
}

#[derive(Debug, Deserialize)]
pub struct TrackRef {
    #[serde(default)]
    pub id: Option<String>,
}

/// `GET /search?type=artist`
#[derive(Debug, Deserialize)]
pub struct ArtistSearchResponse {
    pub artists: ArtistSearchPage,
}

#[derive(Debug, Deserialize)]
pub struct ArtistSearchPage {
    #[serde(default)]
    pub items: Vec<ArtistSummary>,
}

/// `GET /artists/{id}/top-tracks`
#[derive(Debug, Deserialize)]
pub struct TopTracksResponse {
    #[serde(default)]
    pub tracks: Vec<TrackObject>,
}

/// `GET /tracks?ids=`
#[derive(Debug, Deserialize)]
pub struct TracksResponse {
    #[serde(default)]
    pub tracks: Vec<Option<TrackObject>>,
}

/// `GET /audio-features?ids=`
#[derive(Debug, Deserialize)]
pub struct AudioFeaturesResponse {
    #[serde(default)]
    pub audio_features: Vec<Option<AudioFeatures>>,
}

/// `GET /artists?ids=`
#[derive(Debug, Deserialize)]
pub struct ArtistsResponse {
    #[serde(default)]
    pub artists: Vec<Option<ArtistGenres>>,
}

/// Full track object
#[derive(Debug, Deserialize)]
pub struct TrackObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub album: Option<AlbumObject>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub explicit: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumObject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl TrackObject {
    /// Converts to a domain record; tracks without an id yield `None`.
    pub fn into_record(self) -> Option<TrackRecord> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let (album, release_date) = match self.album {
            Some(album) => (album.name, album.release_date),
            None => (None, None),
        };

        Some(TrackRecord {
            id,
            name: self.name,
            album,
            release_date,
            artist_names: self
                .artists
                .iter()
                .map(|artist| artist.name.clone().unwrap_or_default())
                .collect(),
            artist_ids: self
                .artists
                .into_iter()
                .filter_map(|artist| artist.id)
                .filter(|id| !id.is_empty())
                .collect(),
            popularity: self.popularity,
            duration_ms: self.duration_ms,
            explicit: self.explicit,
        })
    }
}
