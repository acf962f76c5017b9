//! Domain records produced by the ingestion phases.

use serde::{Deserialize, Serialize};

/// Catalog track identifier.
pub type TrackId = String;

/// Metadata columns emitted for every row, in order.
pub const METADATA_COLUMNS: [&str; 9] = [
    "track_id",
    "track_name",
    "album",
    "release_date",
    "artist_names",
    "artist_ids",
    "popularity",
    "duration_ms",
    "explicit",
];

/// Audio feature columns, emitted only when attributes were joined.
pub const FEATURE_COLUMNS: [&str; 12] = [
    "danceability",
    "energy",
    "key",
    "loudness",
    "mode",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
    "time_signature",
];

pub const GENRE_COLUMN: &str = "primary_artist_genre";

/// Separator for list-valued cells.
pub const LIST_SEPARATOR: &str = ";";

/// Primary metadata for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: TrackId,
    pub name: Option<String>,
    pub album: Option<String>,
    pub release_date: Option<String>,
    pub artist_names: Vec<String>,
    /// Artist ids in credit order, empty ids removed
    pub artist_ids: Vec<String>,
    pub popularity: Option<u32>,
    pub duration_ms: Option<u64>,
    pub explicit: Option<bool>,
}

impl TrackRecord {
    /// Minimal record, mostly useful in tests and fakes.
    pub fn new(id: impl Into<TrackId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            album: None,
            release_date: None,
            artist_names: Vec::new(),
            artist_ids: Vec::new(),
            popularity: None,
            duration_ms: None,
            explicit: None,
        }
    }

    pub fn with_artists(mut self, artists: &[(&str, &str)]) -> Self {
        self.artist_ids = artists
            .iter()
            .map(|(id, _)| id.to_string())
            .filter(|id| !id.is_empty())
            .collect();
        self.artist_names = artists.iter().map(|(_, name)| name.to_string()).collect();
        self
    }
}

/// Derived audio attributes for one track. Every measure may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: TrackId,
    #[serde(default)]
    pub danceability: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub key: Option<i32>,
    #[serde(default)]
    pub loudness: Option<f64>,
    #[serde(default)]
    pub mode: Option<i32>,
    #[serde(default)]
    pub speechiness: Option<f64>,
    #[serde(default)]
    pub acousticness: Option<f64>,
    #[serde(default)]
    pub instrumentalness: Option<f64>,
    #[serde(default)]
    pub liveness: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub time_signature: Option<i32>,
}

impl AudioFeatures {
    pub fn empty(id: impl Into<TrackId>) -> Self {
        Self {
            id: id.into(),
            danceability: None,
            energy: None,
            key: None,
            loudness: None,
            mode: None,
            speechiness: None,
            acousticness: None,
            instrumentalness: None,
            liveness: None,
            valence: None,
            tempo: None,
            time_signature: None,
        }
    }

    /// Values in [`FEATURE_COLUMNS`] order.
    fn cells(&self) -> [String; 12] {
        [
            opt_cell(self.danceability),
            opt_cell(self.energy),
            opt_cell(self.key),
            opt_cell(self.loudness),
            opt_cell(self.mode),
            opt_cell(self.speechiness),
            opt_cell(self.acousticness),
            opt_cell(self.instrumentalness),
            opt_cell(self.liveness),
            opt_cell(self.valence),
            opt_cell(self.tempo),
            opt_cell(self.time_signature),
        ]
    }
}

/// Genres listed for one artist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistGenres {
    pub id: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Search hit for an artist name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One row of the assembled dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub track: TrackRecord,
    pub features: Option<AudioFeatures>,
    pub primary_artist_genre: Option<String>,
}

impl OutputRow {
    pub fn track_id(&self) -> &str {
        &self.track.id
    }

    /// Cell values matching [`Dataset::header`] for the same `with_features` flag.
    pub fn cells(&self, with_features: bool) -> Vec<String> {
        let track = &self.track;
        let mut cells = vec![
            track.id.clone(),
            track.name.clone().unwrap_or_default(),
            track.album.clone().unwrap_or_default(),
            track.release_date.clone().unwrap_or_default(),
            track.artist_names.join(LIST_SEPARATOR),
            track.artist_ids.join(LIST_SEPARATOR),
            opt_cell(track.popularity),
            opt_cell(track.duration_ms),
            opt_cell(track.explicit),
        ];

        if with_features {
            match &self.features {
                Some(features) => cells.extend(features.cells()),
                None => cells.extend(std::iter::repeat(String::new()).take(FEATURE_COLUMNS.len())),
            }
        }

        cells.push(self.primary_artist_genre.clone().unwrap_or_default());
        cells
    }
}

/// Ordered output table.
///
/// `attributes_joined == false` means the attribute phase produced nothing
/// and the table is metadata-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub rows: Vec<OutputRow>,
    pub attributes_joined: bool,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names for this dataset's mode.
    pub fn header(&self) -> Vec<&'static str> {
        let mut header: Vec<&'static str> = METADATA_COLUMNS.to_vec();
        if self.attributes_joined {
            header.extend(FEATURE_COLUMNS);
        }
        header.push(GENRE_COLUMN);
        header
    }

    /// Rows rendered as string cells in header order.
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.cells(self.attributes_joined))
    }

    /// Number of rows that received audio features.
    pub fn rows_with_attributes(&self) -> usize {
        self.rows.iter().filter(|row| row.features.is_some()).count()
    }
}

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
