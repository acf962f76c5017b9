//! Playlist reference resolution.
//!
//! Accepts bare ids, `spotify:playlist:<id>` URIs and
//! `https://open.spotify.com/playlist/<id>` URLs (query strings allowed).

use once_cell::sync::Lazy;
use regex::Regex;

static PLAYLIST_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:playlist/|spotify:playlist:)([A-Za-z0-9]+)")
        .expect("playlist reference pattern compiles")
});

static BARE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]+$").expect("bare id pattern compiles")
});

/// Resolves a playlist reference to a collection id.
///
/// Never fails: an unrecognized reference is returned trimmed but otherwise
/// unchanged, and the API call made with it reports the problem. Empty or
/// whitespace-only input yields an empty string.
///
/// ```
/// use core_ingest::resolver::resolve_collection_id;
///
/// assert_eq!(
///     resolve_collection_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc"),
///     "37i9dQZF1DXcBWIGoYBM5M"
/// );
/// assert_eq!(resolve_collection_id("spotify:playlist:abc123"), "abc123");
/// ```
pub fn resolve_collection_id(reference: &str) -> String {
    let reference = reference.trim();
    if reference.is_empty() {
        return String::new();
    }

    if let Some(id) = PLAYLIST_REFERENCE
        .captures(reference)
        .and_then(|caps| caps.get(1))
    {
        return id.as_str().to_string();
    }

    if BARE_ID.is_match(reference) {
        return reference.to_string();
    }

    reference.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_url_with_query() {
        assert_eq!(
            resolve_collection_id("https://open.spotify.com/playlist/AbC123?si=xyz"),
            "AbC123"
        );
    }

    #[test]
    fn test_resolves_uri_and_bare_id() {
        assert_eq!(resolve_collection_id("spotify:playlist:Zz9"), "Zz9");
        assert_eq!(resolve_collection_id("  Zz9  "), "Zz9");
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(
            resolve_collection_id("spotify:playlist:first/playlist/second"),
            "first"
        );
    }

    #[test]
    fn test_unrecognized_passes_through() {
        assert_eq!(resolve_collection_id("not a playlist!"), "not a playlist!");
        assert_eq!(resolve_collection_id("   "), "");
        assert_eq!(resolve_collection_id(""), "");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let inputs = [
            "https://open.spotify.com/playlist/AbC123?si=xyz",
            "spotify:playlist:Zz9",
            "plainId42",
            "weird/input with spaces",
            "",
        ];

        for input in inputs {
            let once = resolve_collection_id(input);
            assert_eq!(resolve_collection_id(&once), once, "input: {:?}", input);
        }
    }
}
