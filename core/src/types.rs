//! DTOs for the task-list and music-database services.
//!
//! # Design
//! These mirror the JSON the services return, keeping only the fields the
//! crate reads. Everything optional on the wire gets `#[serde(default)]` so a
//! sparse payload still decodes.

use serde::{Deserialize, Serialize};

/// A task list owned by the authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub revision: u64,
}

/// A single task within a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub list_id: u64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub starred: bool,
}

/// Query for the music-database search endpoint. Unset fields are left out
/// of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub q: Option<String>,
    pub artist: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Paging block of a search response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub pages: u32,
    pub per_page: u32,
    pub items: u32,
}

/// One ranked search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub year: Option<String>,
    pub genre: Vec<String>,
    pub style: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResults {
    pub pagination: Pagination,
    pub results: Vec<SearchResult>,
}

/// A task title read as `"artist - track"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub artist: String,
    pub title: String,
}

impl Song {
    /// Split `raw` on `" - "`. Returns `None` when there is no separator.
    /// Anything after a second separator is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(" - ");
        let artist = parts.next()?;
        let title = parts.next()?;
        Some(Self {
            artist: artist.to_string(),
            title: title.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{EncodePairs, Fields};

    #[test]
    fn song_parses_artist_and_title() {
        let song = Song::parse("exium - subtoned").unwrap();
        assert_eq!(song.artist, "exium");
        assert_eq!(song.title, "subtoned");
    }

    #[test]
    fn song_without_separator_is_none() {
        assert!(Song::parse("exium subtoned").is_none());
        assert!(Song::parse("exium-subtoned").is_none());
    }

    #[test]
    fn song_ignores_extra_segments() {
        let song = Song::parse("a - b - c").unwrap();
        assert_eq!(song.artist, "a");
        assert_eq!(song.title, "b");
    }

    #[test]
    fn search_request_skips_unset_fields() {
        let request = SearchRequest {
            q: Some("exium - subtoned".to_string()),
            artist: Some("exium".to_string()),
            per_page: Some(1),
            ..SearchRequest::default()
        };
        let pairs = Fields(request).encode_pairs().unwrap();
        assert_eq!(
            pairs,
            vec![
                ("artist".to_string(), "exium".to_string()),
                ("per_page".to_string(), "1".to_string()),
                ("q".to_string(), "exium - subtoned".to_string()),
            ]
        );
    }

    #[test]
    fn search_request_encodes_all_search_keys() {
        let request = SearchRequest {
            q: Some("q".to_string()),
            artist: Some("a".to_string()),
            page: Some(2),
            per_page: Some(5),
        };
        let keys: Vec<String> = Fields(request)
            .encode_pairs()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["artist", "page", "per_page", "q"]);
    }

    #[test]
    fn search_results_decode_sparse_payload() {
        let raw = r#"{"results":[{"title":"Exium - Subtoned EP","style":["Techno"]}]}"#;
        let results: SearchResults = serde_json::from_str(raw).unwrap();
        assert_eq!(results.results.len(), 1);
        assert_eq!(results.results[0].style, vec!["Techno"]);
        assert_eq!(results.pagination, Pagination::default());
    }

    #[test]
    fn task_requires_title() {
        let result: Result<Task, _> = serde_json::from_str(r#"{"id":1,"list_id":2}"#);
        assert!(result.is_err());
    }
}
