//! Catalog refresher
//!
//! Background task that rescans a discovery feed and rebuilds the catalog
//! whenever a refresh is requested. Requests arriving while one is already
//! queued are coalesced into it.

use std::sync::Arc;

use mango_common::events::{EventBus, MangoEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::DiscoveryFeed;
use crate::catalog::CatalogIndex;
use crate::error::{Error, IndexError, Result};

/// Cloneable handle that asks the refresher for another rebuild
#[derive(Debug, Clone)]
pub struct RefreshTrigger {
    tx: mpsc::Sender<()>,
}

impl RefreshTrigger {
    /// Queue a refresh
    ///
    /// Safe to call from non-async threads. Returns `false` once the
    /// refresher has stopped.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            // One refresh is already pending and will pick up this change
            Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

/// Owns the refresh task
pub struct CatalogRefresher {
    trigger: RefreshTrigger,
    handle: JoinHandle<()>,
}

impl CatalogRefresher {
    /// Spawn the refresh task; nothing is scanned until the first request
    pub fn spawn(
        catalog: Arc<CatalogIndex>,
        feed: Arc<dyn DiscoveryFeed>,
        events: EventBus,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            info!("Catalog refresher started");
            while rx.recv().await.is_some() {
                if let Err(e) = refresh_catalog(&catalog, feed.as_ref(), &events).await {
                    warn!("Catalog refresh failed: {}", e);
                }
            }
            info!("Catalog refresher stopped");
        });

        Self {
            trigger: RefreshTrigger { tx },
            handle,
        }
    }

    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    pub fn request(&self) -> bool {
        self.trigger.request()
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}

/// Scan `feed` and rebuild `catalog` from the result
///
/// The catalog enters `Initializing` before the scan starts. The build runs
/// on a blocking thread. A feed failure settles the catalog
/// in the error state without replacing the published tree. Either way one
/// `CatalogRebuilt` event is emitted. Returns the new item count.
pub async fn refresh_catalog(
    catalog: &Arc<CatalogIndex>,
    feed: &dyn DiscoveryFeed,
    events: &EventBus,
) -> Result<usize> {
    catalog.begin_rebuild();
    let records = match feed.scan().await {
        Ok(records) => records,
        Err(e) => {
            let err = catalog.fail_rebuild(IndexError::Discovery(e.to_string()));
            emit_rebuilt(events, false, catalog.item_count());
            return Err(err.into());
        }
    };
    debug!("Discovery feed returned {} records", records.len());

    let build_catalog = Arc::clone(catalog);
    let built = match tokio::task::spawn_blocking(move || build_catalog.rebuild(records)).await {
        Ok(built) => built,
        Err(e) => {
            catalog.fail_rebuild(IndexError::InvalidRecord(format!(
                "catalog build task failed: {}",
                e
            )));
            emit_rebuilt(events, false, catalog.item_count());
            return Err(Error::Internal(format!("Catalog build task failed: {}", e)));
        }
    };

    let item_count = catalog.item_count();
    emit_rebuilt(events, built.is_ok(), item_count);
    built?;
    Ok(item_count)
}

fn emit_rebuilt(events: &EventBus, ok: bool, item_count: usize) {
    events.emit_lossy(MangoEvent::CatalogRebuilt {
        ok,
        item_count,
        timestamp: chrono::Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReadyState;
    use crate::discovery::StaticFeed;
    use async_trait::async_trait;
    use mango_common::MediaRecord;
    use tokio::sync::Notify;

    struct FailingFeed;

    #[async_trait]
    impl DiscoveryFeed for FailingFeed {
        async fn scan(&self) -> Result<Vec<MediaRecord>> {
            Err(Error::Discovery("storage unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_refresh_rebuilds_and_emits() {
        let catalog = Arc::new(CatalogIndex::new());
        let events = EventBus::new(10);
        let mut rx = events.subscribe();
        let feed = StaticFeed::new(vec![MediaRecord::new("1", "a"), MediaRecord::new("2", "b")]);

        let count = refresh_catalog(&catalog, &feed, &events).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(catalog.state(), ReadyState::Initialized);
        assert!(matches!(
            rx.recv().await.unwrap(),
            MangoEvent::CatalogRebuilt { ok: true, item_count: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_feed_failure_settles_error_and_keeps_tree() {
        let catalog = Arc::new(CatalogIndex::new());
        catalog.rebuild(vec![MediaRecord::new("1", "a")]).unwrap();
        let events = EventBus::new(10);
        let mut rx = events.subscribe();

        let result = refresh_catalog(&catalog, &FailingFeed, &events).await;
        assert!(matches!(result, Err(Error::Catalog(IndexError::Discovery(_)))));
        assert_eq!(catalog.state(), ReadyState::Error);
        assert_eq!(catalog.item_count(), 1);
        assert!(matches!(
            rx.recv().await.unwrap(),
            MangoEvent::CatalogRebuilt { ok: false, item_count: 1, .. }
        ));
    }

    struct GatedFeed {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl DiscoveryFeed for GatedFeed {
        async fn scan(&self) -> Result<Vec<MediaRecord>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![MediaRecord::new("1", "a"), MediaRecord::new("2", "b")])
        }
    }

    #[tokio::test]
    async fn test_waiter_during_scan_waits_for_refresh() {
        let catalog = Arc::new(CatalogIndex::new());
        catalog.rebuild(Vec::new()).unwrap();
        let events = EventBus::new(10);
        let feed = Arc::new(GatedFeed {
            entered: Notify::new(),
            release: Notify::new(),
        });

        let refresh = {
            let catalog = catalog.clone();
            let feed = feed.clone();
            let events = events.clone();
            tokio::spawn(async move { refresh_catalog(&catalog, feed.as_ref(), &events).await })
        };
        feed.entered.notified().await;
        assert_eq!(catalog.state(), ReadyState::Initializing);

        let seen = Arc::new(std::sync::Mutex::new(None));
        let seen_clone = seen.clone();
        assert!(!catalog.when_ready(move |ok| {
            *seen_clone.lock().unwrap() = Some(ok);
        }));
        assert_eq!(*seen.lock().unwrap(), None);

        feed.release.notify_one();
        assert_eq!(refresh.await.unwrap().unwrap(), 2);
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_requests_drive_the_task() {
        let catalog = Arc::new(CatalogIndex::new());
        let events = EventBus::new(10);
        let mut rx = events.subscribe();
        let feed = Arc::new(StaticFeed::new(vec![MediaRecord::new("1", "a")]));

        let refresher = CatalogRefresher::spawn(catalog.clone(), feed.clone(), events.clone());
        assert!(refresher.request());
        assert!(matches!(
            rx.recv().await.unwrap(),
            MangoEvent::CatalogRebuilt { item_count: 1, .. }
        ));

        feed.replace(vec![MediaRecord::new("1", "a"), MediaRecord::new("9", "z")]);
        assert!(refresher.trigger().request());
        assert!(matches!(
            rx.recv().await.unwrap(),
            MangoEvent::CatalogRebuilt { item_count: 2, .. }
        ));
        assert!(catalog.get_record("9").is_some());

        refresher.shutdown();
    }
}
