//! Library views over the catalog: search, ordering, group summaries

use mango_common::MediaRecord;
use serde::Serialize;

use super::index::CatalogIndex;
use super::node::{ALBUMS_ID, ARTISTS_ID};

/// Ordering for the all-items listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first
    #[default]
    DateAdded,
    /// Case-insensitive title
    Title,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date_added" | "add date" => Ok(SortOrder::DateAdded),
            "title" => Ok(SortOrder::Title),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

/// Album or artist folder with aggregate figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Folder node id
    pub node_id: String,
    pub title: String,
    pub track_count: usize,
    pub total_duration_ms: u64,
}

/// All playable records in the requested order
pub fn sorted_items(index: &CatalogIndex, order: SortOrder) -> Vec<MediaRecord> {
    let mut records = index.all_records();
    match order {
        SortOrder::DateAdded => records.sort_by_key(|r| r.date_added),
        SortOrder::Title => records.sort_by_cached_key(|r| r.title.to_lowercase()),
    }
    records
}

/// Records whose title, artist or album contains `query`, ignoring case
///
/// An empty query matches everything.
pub fn search(index: &CatalogIndex, query: &str) -> Vec<MediaRecord> {
    let key = query.trim().to_lowercase();
    index
        .all_records()
        .into_iter()
        .filter(|r| {
            key.is_empty()
                || r.title.to_lowercase().contains(&key)
                || r.artist.to_lowercase().contains(&key)
                || r.album.to_lowercase().contains(&key)
        })
        .collect()
}

pub fn album_summaries(index: &CatalogIndex) -> Vec<GroupSummary> {
    group_summaries(index, ALBUMS_ID)
}

pub fn artist_summaries(index: &CatalogIndex) -> Vec<GroupSummary> {
    group_summaries(index, ARTISTS_ID)
}

fn group_summaries(index: &CatalogIndex, top_id: &str) -> Vec<GroupSummary> {
    let tree = index.snapshot();
    tree.children(top_id)
        .unwrap_or_default()
        .into_iter()
        .map(|folder| {
            let tracks = tree.children(&folder.id).unwrap_or_default();
            GroupSummary {
                total_duration_ms: tracks
                    .iter()
                    .filter_map(|t| t.record.as_ref())
                    .map(|r| r.duration_ms)
                    .sum(),
                track_count: tracks.len(),
                node_id: folder.id,
                title: folder.title,
            }
        })
        .collect()
}
