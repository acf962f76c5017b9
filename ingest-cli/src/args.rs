//! Command-line arguments.

use anyhow::{Context, Result};
use clap::Parser;
use core_ingest::IngestRequest;
use core_runtime::config::IngestConfig;
use core_runtime::logging::{LogFormat, LogLevel};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the output dataset
pub const DEFAULT_OUTPUT: &str = "data/spotify_tracks.csv";

#[derive(Parser, Debug)]
#[command(
    name = "catalog-ingest",
    version,
    about = "Collect track metadata, audio features and artist genres into a CSV dataset"
)]
pub struct Cli {
    /// Playlist ids, `spotify:playlist:` URIs or open.spotify.com URLs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub playlists: Vec<String>,

    /// Artist names; each contributes its top tracks (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub artists: Vec<String>,

    /// Track ids (comma-separated)
    #[arg(long = "track-ids", value_delimiter = ',')]
    pub track_ids: Vec<String>,

    /// File with one track id per line; blank lines and `#` comments are ignored
    #[arg(long)]
    pub track_ids_file: Option<PathBuf>,

    /// Output CSV path
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    pub out: PathBuf,

    /// Cap on distinct tracks (overrides MAX_TRACKS)
    #[arg(long)]
    pub max_tracks: Option<usize>,

    /// Market for artist top tracks (overrides INGEST_MARKET)
    #[arg(long)]
    pub market: Option<String>,

    /// Concurrent batches per phase (overrides INGEST_MAX_CONCURRENT)
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Minimum log level
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Log output format: pretty, json or compact
    #[arg(long, env = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Builds the ingestion request from the reference flags and the id file.
    pub fn request(&self) -> Result<IngestRequest> {
        let mut track_ids = self.track_ids.clone();
        if let Some(path) = &self.track_ids_file {
            track_ids.extend(read_track_ids(path)?);
        }

        Ok(IngestRequest::new()
            .with_playlists(non_blank(&self.playlists))
            .with_artists(non_blank(&self.artists))
            .with_track_ids(non_blank(&track_ids)))
    }

    /// Applies flag overrides on top of the environment configuration.
    pub fn apply_overrides(&self, mut config: IngestConfig) -> Result<IngestConfig> {
        if let Some(max_tracks) = self.max_tracks {
            config.max_tracks = max_tracks;
        }
        if let Some(market) = &self.market {
            config.market = market.trim().to_string();
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.max_concurrent_batches = max_concurrent;
        }

        config.validate().context("Invalid command-line override")?;
        Ok(config)
    }
}

/// Reads one id per line.
pub fn read_track_ids(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read track id file {}", path.display()))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["catalog-ingest"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn config() -> IngestConfig {
        IngestConfig::builder()
            .client_id("id")
            .client_secret("secret")
            .build()
            .unwrap()
    }

    #[test]
    fn test_comma_separated_references() {
        let cli = parse(&[
            "--playlists",
            "pl1, spotify:playlist:pl2,,",
            "--artists",
            "Soda Stereo,Cerati",
            "--track-ids",
            "t1,t2",
        ]);

        let request = cli.request().unwrap();
        assert_eq!(request.playlists, vec!["pl1", "spotify:playlist:pl2"]);
        assert_eq!(request.artists, vec!["Soda Stereo", "Cerati"]);
        assert_eq!(request.track_ids, vec!["t1", "t2"]);
        assert_eq!(cli.out, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert!(cli.request().unwrap().is_empty());
        assert!(cli.max_tracks.is_none());
        assert!(cli.log_format.is_none());
    }

    #[test]
    fn test_log_flags_parse() {
        let cli = parse(&["--log-level", "debug", "--log-format", "json"]);
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.log_format, Some(LogFormat::Json));

        let argv = ["catalog-ingest", "--log-format", "xml"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_overrides_apply_and_validate() {
        let cli = parse(&["--max-tracks", "10", "--market", " AR ", "--max-concurrent", "2"]);
        let cfg = cli.apply_overrides(config()).unwrap();
        assert_eq!(cfg.max_tracks, 10);
        assert_eq!(cfg.market, "AR");
        assert_eq!(cfg.max_concurrent_batches, 2);

        let cli = parse(&["--max-tracks", "0"]);
        assert!(cli.apply_overrides(config()).is_err());
    }

    #[test]
    fn test_track_id_file() {
        let path = std::env::temp_dir().join(format!("catalog-ingest-ids-{}.txt", std::process::id()));
        fs::write(&path, "# seed list\nt1\n\n  t2  \n#t3\n").unwrap();

        let cli = parse(&["--track-ids", "t0", "--track-ids-file", path.to_str().unwrap()]);
        let request = cli.request().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(request.track_ids, vec!["t0", "t1", "t2"]);
    }

    #[test]
    fn test_missing_track_id_file_is_an_error() {
        let cli = parse(&["--track-ids-file", "/nonexistent/ids.txt"]);
        assert!(cli.request().is_err());
    }
}
