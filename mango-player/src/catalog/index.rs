//! Catalog index
//!
//! Builds the browsable tree (root -> albums/artists/genres/all -> items)
//! from a flat record list. Each rebuild populates a fresh `CatalogTree` and
//! publishes it with a single `Arc` swap, so readers see either the previous
//! complete tree or the next one.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use mango_common::MediaRecord;
use tracing::{debug, error, info, warn};

use super::node::{
    album_folder_node, artist_folder_node, genre_folder_node, item_node, item_node_id,
    CatalogNode, ALBUMS_ID, ALL_ITEMS_ID, ARTISTS_ID, GENRES_ID, ROOT_ID,
};
use super::ready::{ReadyState, Readiness};
use crate::error::IndexError;

/// One complete generation of the catalog
#[derive(Debug, Clone)]
pub struct CatalogTree {
    nodes: HashMap<String, CatalogNode>,
    item_count: usize,
}

impl CatalogTree {
    /// Root and the four top-level folders, nothing else
    fn skeleton() -> Self {
        let mut nodes = HashMap::new();
        let mut root = CatalogNode::folder(ROOT_ID, "Root Folder");
        for (id, title) in [
            (ALBUMS_ID, "Album Folder"),
            (ARTISTS_ID, "Artist Folder"),
            (GENRES_ID, "Genre Folder"),
            (ALL_ITEMS_ID, "All Items Folder"),
        ] {
            nodes.insert(id.to_string(), CatalogNode::folder(id, title));
            root.children.push(id.to_string());
        }
        nodes.insert(ROOT_ID.to_string(), root);

        Self {
            nodes,
            item_count: 0,
        }
    }

    /// Build a tree from records in order
    ///
    /// The first record of an album/artist/genre provides that folder's
    /// display metadata. Records repeating an already indexed id are skipped.
    pub fn build(records: &[MediaRecord]) -> Result<Self, IndexError> {
        let mut tree = Self::skeleton();

        for record in records {
            if record.id.trim().is_empty() {
                return Err(IndexError::InvalidRecord(format!(
                    "record '{}' has an empty id",
                    record.title
                )));
            }

            let item_id = item_node_id(&record.id);
            if tree.nodes.contains_key(&item_id) {
                warn!("Duplicate media id {}, keeping first record", record.id);
                continue;
            }
            tree.nodes.insert(item_id.clone(), item_node(record));

            for (top_id, folder) in [
                (ALBUMS_ID, album_folder_node(record)),
                (ARTISTS_ID, artist_folder_node(record)),
                (GENRES_ID, genre_folder_node(record)),
            ] {
                let folder_id = folder.id.clone();
                if !tree.nodes.contains_key(&folder_id) {
                    tree.nodes.insert(folder_id.clone(), folder);
                    tree.link(top_id, &folder_id);
                }
                tree.link(&folder_id, &item_id);
            }
            tree.link(ALL_ITEMS_ID, &item_id);
            tree.item_count += 1;
        }

        Ok(tree)
    }

    fn link(&mut self, parent_id: &str, child_id: &str) {
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.push(child_id.to_string());
        }
    }

    pub fn get(&self, id: &str) -> Option<&CatalogNode> {
        self.nodes.get(id)
    }

    /// Children of `id` in insertion order; `None` for unknown ids
    pub fn children(&self, id: &str) -> Option<Vec<CatalogNode>> {
        let node = self.nodes.get(id)?;
        Some(
            node.children
                .iter()
                .filter_map(|child| self.nodes.get(child).cloned())
                .collect(),
        )
    }

    pub fn root(&self) -> &CatalogNode {
        // The skeleton always inserts the root
        &self.nodes[ROOT_ID]
    }

    /// Number of playable items
    pub fn item_count(&self) -> usize {
        self.item_count
    }
}

/// Thread-safe catalog with readiness tracking
pub struct CatalogIndex {
    tree: RwLock<Arc<CatalogTree>>,
    ready: Readiness,
    build_lock: Mutex<()>,
    generation: AtomicU64,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Arc::new(CatalogTree::skeleton())),
            ready: Readiness::new(),
            build_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the catalog with one built from `records`
    ///
    /// Rebuilds are serialized. On failure (including a panic while
    /// building) the previous tree stays published and the state becomes
    /// `Error`; waiters are notified with `false`.
    pub fn rebuild(&self, records: Vec<MediaRecord>) -> Result<(), IndexError> {
        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.ready.begin();
        debug!("Rebuilding catalog from {} records", records.len());

        let built = catch_unwind(AssertUnwindSafe(|| CatalogTree::build(&records)))
            .unwrap_or_else(|_| {
                Err(IndexError::InvalidRecord(
                    "panic while building catalog".to_string(),
                ))
            });

        match built {
            Ok(tree) => {
                let item_count = tree.item_count();
                self.publish(tree);
                info!("Catalog rebuilt with {} items", item_count);
                self.ready.settle(true);
                Ok(())
            }
            Err(e) => {
                error!("Catalog rebuild failed: {}", e);
                self.ready.settle(false);
                Err(e)
            }
        }
    }

    /// Enter `Initializing` ahead of a scan
    ///
    /// Waiters registered from here on are held for the rebuild (or
    /// failure) that follows, not answered with the previous cycle's result.
    pub fn begin_rebuild(&self) {
        self.ready.begin();
        debug!("Catalog refresh started");
    }

    /// Mark the current cycle as failed without touching the tree
    ///
    /// Used when the discovery feed fails before any records exist.
    pub fn fail_rebuild(&self, error: IndexError) -> IndexError {
        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.ready.begin();
        error!("Catalog rebuild failed: {}", error);
        self.ready.settle(false);
        error
    }

    fn publish(&self, tree: CatalogTree) {
        let mut current = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(tree);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// The currently published tree
    ///
    /// Holding the snapshot keeps several lookups on one generation.
    pub fn snapshot(&self) -> Arc<CatalogTree> {
        self.tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_item(&self, node_id: &str) -> Option<CatalogNode> {
        self.snapshot().get(node_id).cloned()
    }

    pub fn get_children(&self, node_id: &str) -> Option<Vec<CatalogNode>> {
        self.snapshot().children(node_id)
    }

    pub fn get_root(&self) -> CatalogNode {
        self.snapshot().root().clone()
    }

    /// Record of a playable item by its media id
    pub fn get_record(&self, media_id: &str) -> Option<MediaRecord> {
        self.snapshot()
            .get(&item_node_id(media_id))
            .and_then(|node| node.record.clone())
    }

    /// Records of all playable items, in discovery order
    pub fn all_records(&self) -> Vec<MediaRecord> {
        self.get_children(ALL_ITEMS_ID)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|node| node.record)
            .collect()
    }

    pub fn state(&self) -> ReadyState {
        self.ready.state()
    }

    /// See [`Readiness::when_ready`]
    pub fn when_ready<F>(&self, callback: F) -> bool
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.ready.when_ready(callback)
    }

    /// Resolve once the in-flight rebuild settles
    pub async fn wait_ready(&self) -> bool {
        self.ready.wait().await
    }

    /// Number of trees published so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn item_count(&self) -> usize {
        self.snapshot().item_count()
    }
}

impl Default for CatalogIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CatalogIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogIndex")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .field("items", &self.item_count())
            .finish()
    }
}
