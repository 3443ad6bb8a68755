//! Media catalog
//!
//! Hierarchical, read-only-once-built index over discovered media with a
//! readiness state machine that notifies waiters once per rebuild.

pub mod browse;
pub mod index;
pub mod node;
pub mod ready;

pub use browse::{album_summaries, artist_summaries, search, sorted_items, GroupSummary, SortOrder};
pub use index::{CatalogIndex, CatalogTree};
pub use node::{
    album_folder_id, artist_folder_id, genre_folder_id, item_node_id, media_id_of, CatalogNode,
    NodeKind, ALBUMS_ID, ALL_ITEMS_ID, ARTISTS_ID, GENRES_ID, ROOT_ID, UNKNOWN_GENRE,
};
pub use ready::{ReadyState, Readiness};
