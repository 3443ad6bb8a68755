//! Catalog nodes and node identity
//!
//! Node ids are derived from natural keys with a namespace prefix, so a
//! rebuild over the same records yields the same ids.

use mango_common::MediaRecord;
use serde::Serialize;

pub const ROOT_ID: &str = "root";
pub const ALBUMS_ID: &str = "albums";
pub const ARTISTS_ID: &str = "artists";
pub const GENRES_ID: &str = "genres";
pub const ALL_ITEMS_ID: &str = "all";

const ALBUM_PREFIX: &str = "album:";
const ARTIST_PREFIX: &str = "artist:";
const GENRE_PREFIX: &str = "genre:";
const ITEM_PREFIX: &str = "item:";

/// Genre bucket for records without a genre tag
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Node id of a playable item
pub fn item_node_id(media_id: &str) -> String {
    format!("{ITEM_PREFIX}{media_id}")
}

/// Node id of the folder grouping an album
pub fn album_folder_id(album_id: &str) -> String {
    format!("{ALBUM_PREFIX}{album_id}")
}

/// Node id of the folder grouping an artist
pub fn artist_folder_id(artist_id: &str) -> String {
    format!("{ARTIST_PREFIX}{artist_id}")
}

/// Node id of the folder grouping a genre
pub fn genre_folder_id(genre: &str) -> String {
    format!("{GENRE_PREFIX}{genre}")
}

/// Media id carried by an item node id, if it is one
pub fn media_id_of(node_id: &str) -> Option<&str> {
    node_id.strip_prefix(ITEM_PREFIX)
}

/// Genre key a record is filed under
pub fn genre_key(record: &MediaRecord) -> &str {
    record.genre_tag().unwrap_or(UNKNOWN_GENRE)
}

/// What a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    /// One of the four top-level groupings
    TopFolder,
    AlbumFolder,
    ArtistFolder,
    GenreFolder,
    Item,
}

/// One node of the catalog tree
///
/// Children are held as ids into the owning tree, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogNode {
    pub id: String,
    pub kind: NodeKind,
    /// Display title (album name for album folders, artist name for artist folders)
    pub title: String,
    pub is_playable: bool,
    /// The item's record, or the first record seen for a derived folder
    pub record: Option<MediaRecord>,
    pub(crate) children: Vec<String>,
}

impl CatalogNode {
    pub(crate) fn folder(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: if id == ROOT_ID {
                NodeKind::Root
            } else {
                NodeKind::TopFolder
            },
            title: title.to_string(),
            is_playable: false,
            record: None,
            children: Vec::new(),
        }
    }

    /// Ids of the direct children, in insertion order
    pub fn child_ids(&self) -> &[String] {
        &self.children
    }

    /// Media id for item nodes
    pub fn media_id(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Item => self.record.as_ref().map(|r| r.id.as_str()),
            _ => None,
        }
    }
}

/// Wrap a record as a playable item node
pub fn item_node(record: &MediaRecord) -> CatalogNode {
    CatalogNode {
        id: item_node_id(&record.id),
        kind: NodeKind::Item,
        title: record.title.clone(),
        is_playable: true,
        record: Some(record.clone()),
        children: Vec::new(),
    }
}

/// Album folder shaped from the first record of that album
pub fn album_folder_node(record: &MediaRecord) -> CatalogNode {
    CatalogNode {
        id: album_folder_id(&record.album_id),
        kind: NodeKind::AlbumFolder,
        title: record.album.clone(),
        is_playable: false,
        record: Some(record.clone()),
        children: Vec::new(),
    }
}

/// Artist folder shaped from the first record of that artist
pub fn artist_folder_node(record: &MediaRecord) -> CatalogNode {
    CatalogNode {
        id: artist_folder_id(&record.artist_id),
        kind: NodeKind::ArtistFolder,
        title: record.artist.clone(),
        is_playable: false,
        record: Some(record.clone()),
        children: Vec::new(),
    }
}

/// Genre folder shaped from the first record of that genre
pub fn genre_folder_node(record: &MediaRecord) -> CatalogNode {
    let genre = genre_key(record);
    CatalogNode {
        id: genre_folder_id(genre),
        kind: NodeKind::GenreFolder,
        title: genre.to_string(),
        is_playable: false,
        record: Some(record.clone()),
        children: Vec::new(),
    }
}
