//! Reference expansion: playlists and artist names to track ids.

use crate::api::{ApiError, ApiErrorKind, CatalogApi};
use crate::error::{IngestError, Result};
use crate::models::TrackId;
use crate::resolver::resolve_collection_id;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Playlist page size; the listing endpoint's maximum.
pub const PLAYLIST_PAGE_SIZE: usize = 100;

pub struct CollectionFetcher {
    api: Arc<dyn CatalogApi>,
}

impl CollectionFetcher {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self { api }
    }

    /// Lists the track ids of a playlist, up to `limit`.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Resolution`] if the reference resolves to nothing
    /// - [`IngestError::NotFound`] if the first page is a 404
    /// - [`IngestError::Fetch`] for any other first-page failure
    ///
    /// A failure on a later page ends pagination and keeps what was collected.
    #[instrument(skip(self), fields(playlist_id = tracing::field::Empty))]
    pub async fn fetch(&self, reference: &str, limit: usize) -> Result<Vec<TrackId>> {
        let playlist_id = resolve_collection_id(reference);
        if playlist_id.is_empty() {
            return Err(IngestError::Resolution {
                reference: reference.to_string(),
            });
        }
        tracing::Span::current().record("playlist_id", playlist_id.as_str());

        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_number = 0usize;

        while ids.len() < limit {
            page_number += 1;
            let page = match self
                .api
                .playlist_page(&playlist_id, cursor.as_deref(), PLAYLIST_PAGE_SIZE)
                .await
            {
                Ok(page) => page,
                Err(error) if page_number == 1 => {
                    return Err(first_page_error(&playlist_id, error));
                }
                Err(error) => {
                    warn!(
                        page = page_number,
                        collected = ids.len(),
                        error = %error,
                        "Playlist pagination failed, keeping partial results"
                    );
                    break;
                }
            };

            for id in page.items.into_iter().flatten() {
                if id.is_empty() {
                    continue;
                }
                ids.push(id);
                if ids.len() >= limit {
                    break;
                }
            }

            debug!(page = page_number, collected = ids.len(), "Fetched playlist page");

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        ids.truncate(limit);
        Ok(ids)
    }

    /// Top track ids of the best artist match for `name` in `market`.
    #[instrument(skip(self))]
    pub async fn artist_top_tracks(&self, name: &str, market: &str) -> Result<Vec<TrackId>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IngestError::Resolution {
                reference: name.to_string(),
            });
        }

        let hits = self
            .api
            .search_artist(name, 1)
            .await
            .map_err(|e| lookup_error(format!("artist '{}'", name), e))?;

        let artist = hits.into_iter().next().ok_or_else(|| IngestError::NotFound {
            resource: format!("artist '{}'", name),
        })?;

        debug!(artist_id = %artist.id, "Resolved artist");

        let ids = self
            .api
            .artist_top_tracks(&artist.id, market)
            .await
            .map_err(|e| lookup_error(format!("top tracks of artist {}", artist.id), e))?;

        Ok(ids.into_iter().filter(|id| !id.is_empty()).collect())
    }
}

fn first_page_error(playlist_id: &str, error: ApiError) -> IngestError {
    lookup_error(format!("playlist {}", playlist_id), error)
}

fn lookup_error(resource: String, error: ApiError) -> IngestError {
    match error.kind {
        ApiErrorKind::NotFound => IngestError::NotFound { resource },
        _ => IngestError::Fetch(format!("{}: {}", resource, error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResult, Page};
    use crate::models::{ArtistGenres, ArtistSummary, AudioFeatures, TrackRecord};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Playlist listing backed by fixed pages keyed by cursor.
    #[derive(Default)]
    struct PagedApi {
        pages: HashMap<Option<String>, ApiResult<Page<Option<TrackId>>>>,
        artists: Vec<ArtistSummary>,
        requested: Mutex<Vec<Option<String>>>,
    }

    impl PagedApi {
        fn page(mut self, cursor: Option<&str>, result: ApiResult<Page<Option<TrackId>>>) -> Self {
            self.pages.insert(cursor.map(String::from), result);
            self
        }
    }

    fn items(ids: &[&str], next: Option<&str>) -> ApiResult<Page<Option<TrackId>>> {
        Ok(Page {
            items: ids
                .iter()
                .map(|id| if id.is_empty() { None } else { Some(id.to_string()) })
                .collect(),
            next: next.map(String::from),
        })
    }

    #[async_trait]
    impl CatalogApi for PagedApi {
        async fn playlist_page(
            &self,
            _playlist_id: &str,
            cursor: Option<&str>,
            _page_size: usize,
        ) -> ApiResult<Page<Option<TrackId>>> {
            let key = cursor.map(String::from);
            self.requested.lock().unwrap().push(key.clone());
            self.pages
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Err(ApiError::transient("no such page")))
        }

        async fn search_artist(&self, _name: &str, _limit: usize) -> ApiResult<Vec<ArtistSummary>> {
            Ok(self.artists.clone())
        }

        async fn artist_top_tracks(&self, artist_id: &str, market: &str) -> ApiResult<Vec<TrackId>> {
            Ok(vec![format!("{}-{}-top", artist_id, market)])
        }

        async fn tracks(&self, _ids: &[TrackId]) -> ApiResult<Vec<Option<TrackRecord>>> {
            unimplemented!()
        }

        async fn audio_features(&self, _ids: &[TrackId]) -> ApiResult<Vec<Option<AudioFeatures>>> {
            unimplemented!()
        }

        async fn artists(&self, _ids: &[String]) -> ApiResult<Vec<Option<ArtistGenres>>> {
            unimplemented!()
        }

        async fn refresh_credentials(&self) -> ApiResult<()> {
            Ok(())
        }

        async fn bearer_token(&self) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn test_follows_cursors_and_skips_missing_tracks() {
        let api = PagedApi::default()
            .page(None, items(&["a", "", "b"], Some("p2")))
            .page(Some("p2"), items(&["c"], None));
        let fetcher = CollectionFetcher::new(Arc::new(api));

        let ids = fetcher.fetch("spotify:playlist:abc", 1000).await.unwrap();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_stops_at_limit_without_fetching_more_pages() {
        let api = Arc::new(
            PagedApi::default()
                .page(None, items(&["a", "b", "c"], Some("p2")))
                .page(Some("p2"), items(&["d"], None)),
        );
        let fetcher = CollectionFetcher::new(api.clone());

        let ids = fetcher.fetch("abc", 2).await.unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(api.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_first_page_not_found() {
        let api = PagedApi::default().page(None, Err(ApiError::not_found("missing")));
        let fetcher = CollectionFetcher::new(Arc::new(api));

        let err = fetcher.fetch("abc", 10).await.unwrap_err();
        assert!(matches!(err, IngestError::NotFound { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_first_page_other_failure() {
        let api = PagedApi::default().page(None, Err(ApiError::from_status(500, "boom")));
        let fetcher = CollectionFetcher::new(Arc::new(api));

        assert!(matches!(
            fetcher.fetch("abc", 10).await,
            Err(IngestError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_partial_results() {
        let api = PagedApi::default()
            .page(None, items(&["a", "b"], Some("p2")))
            .page(Some("p2"), Err(ApiError::transient("reset")));
        let fetcher = CollectionFetcher::new(Arc::new(api));

        let ids = fetcher.fetch("abc", 10).await.unwrap();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_reference_is_resolution_error() {
        let fetcher = CollectionFetcher::new(Arc::new(PagedApi::default()));
        assert!(matches!(
            fetcher.fetch("   ", 10).await,
            Err(IngestError::Resolution { .. })
        ));
    }

    #[tokio::test]
    async fn test_artist_top_tracks() {
        let api = PagedApi {
            artists: vec![ArtistSummary {
                id: "art1".to_string(),
                name: "Someone".to_string(),
            }],
            ..PagedApi::default()
        };
        let fetcher = CollectionFetcher::new(Arc::new(api));

        let ids = fetcher.artist_top_tracks("Someone", "US").await.unwrap();
        assert_eq!(ids, vec!["art1-US-top"]);
    }

    #[tokio::test]
    async fn test_artist_without_hits_is_not_found() {
        let fetcher = CollectionFetcher::new(Arc::new(PagedApi::default()));
        assert!(matches!(
            fetcher.artist_top_tracks("Nobody", "US").await,
            Err(IngestError::NotFound { .. })
        ));
    }
}
