//! Last-played persistence
//!
//! The queue order and the current item survive restarts through a small
//! key/value store. `LastPlayedRecorder` follows the event bus and writes
//! both keys as they change; the controller reads them back on startup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mango_common::events::{EventBus, MangoEvent};
use sqlx::SqlitePool;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Id of the item that was current last
pub const LAST_PLAYED_ID: &str = "last_played_id";
/// JSON array of the queue's media ids in order
pub const LAST_PLAYED_LIST: &str = "last_played_list";

#[async_trait]
pub trait LastPlayedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Store backed by the `settings` table
#[derive(Debug, Clone)]
pub struct SqliteLastPlayedStore {
    db: SqlitePool,
}

impl SqliteLastPlayedStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LastPlayedStore for SqliteLastPlayedStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        mango_common::db::get_setting::<String>(&self.db, key)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        mango_common::db::set_setting(&self.db, key, value)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        mango_common::db::delete_setting(&self.db, key)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryLastPlayedStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryLastPlayedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LastPlayedStore for MemoryLastPlayedStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

/// Persist whatever `event` changes; returns whether anything was written
pub async fn record_event(store: &dyn LastPlayedStore, event: &MangoEvent) -> Result<bool> {
    match event {
        MangoEvent::CurrentItemChanged { item_id, .. } => {
            match item_id {
                Some(id) => store.put(LAST_PLAYED_ID, id).await?,
                None => store.remove(LAST_PLAYED_ID).await?,
            }
            Ok(true)
        }
        MangoEvent::QueueChanged { item_ids, .. } => {
            let json = serde_json::to_string(item_ids)?;
            store.put(LAST_PLAYED_LIST, &json).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Background task writing last-played state from bus events
pub struct LastPlayedRecorder {
    handle: JoinHandle<()>,
}

impl LastPlayedRecorder {
    /// Subscribe now, so no event emitted after this call is missed
    pub fn spawn(store: Arc<dyn LastPlayedStore>, events: &EventBus) -> Self {
        let mut rx = events.subscribe();
        let handle = tokio::spawn(async move {
            info!("Last-played recorder started");
            loop {
                match rx.recv().await {
                    Ok(event) => match record_event(store.as_ref(), &event).await {
                        Ok(true) => debug!("Recorded {}", event.name()),
                        Ok(false) => {}
                        Err(e) => warn!("Failed to record {}: {}", event.name(), e),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Last-played recorder lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            info!("Last-played recorder stopped");
        });
        Self { handle }
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }

    /// Wait for the task to end; it ends once every bus sender is dropped
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mango_common::events::QueueChangeTrigger;

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let db = mango_common::db::init_memory_database().await.unwrap();
        let store = SqliteLastPlayedStore::new(db);

        assert_eq!(store.get(LAST_PLAYED_ID).await.unwrap(), None);
        store.put(LAST_PLAYED_ID, "12").await.unwrap();
        store.put(LAST_PLAYED_ID, "13").await.unwrap();
        assert_eq!(store.get(LAST_PLAYED_ID).await.unwrap().as_deref(), Some("13"));
        store.remove(LAST_PLAYED_ID).await.unwrap();
        assert_eq!(store.get(LAST_PLAYED_ID).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_record_event_writes_keys() {
        let store = MemoryLastPlayedStore::new();
        let queue = MangoEvent::QueueChanged {
            item_ids: vec!["1".into(), "2".into()],
            trigger: QueueChangeTrigger::Insert,
            timestamp: chrono::Utc::now(),
        };
        let current = MangoEvent::CurrentItemChanged {
            item_id: Some("2".into()),
            index: Some(1),
            timestamp: chrono::Utc::now(),
        };
        let other = MangoEvent::CatalogRebuilt {
            ok: true,
            item_count: 0,
            timestamp: chrono::Utc::now(),
        };

        assert!(record_event(&store, &queue).await.unwrap());
        assert!(record_event(&store, &current).await.unwrap());
        assert!(!record_event(&store, &other).await.unwrap());

        assert_eq!(
            store.get(LAST_PLAYED_LIST).await.unwrap().as_deref(),
            Some(r#"["1","2"]"#)
        );
        assert_eq!(store.get(LAST_PLAYED_ID).await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_recorder_follows_bus() {
        let store = Arc::new(MemoryLastPlayedStore::new());
        let events = EventBus::new(16);
        let recorder = LastPlayedRecorder::spawn(store.clone(), &events);

        events.emit_lossy(MangoEvent::CurrentItemChanged {
            item_id: Some("9".into()),
            index: Some(0),
            timestamp: chrono::Utc::now(),
        });
        drop(events);
        recorder.join().await;

        assert_eq!(store.get(LAST_PLAYED_ID).await.unwrap().as_deref(), Some("9"));
    }
}
