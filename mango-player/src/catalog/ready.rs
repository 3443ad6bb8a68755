//! Catalog readiness state machine
//!
//! `Created -> Initializing -> {Initialized | Error}`, re-entered on every
//! rebuild. Waiters registered while a cycle is in flight are drained and
//! notified exactly once when it settles; waiters registered after
//! settlement run immediately on the caller's thread.
//!
//! State and waiter list share one mutex. Settling flips the state and takes
//! the whole list under that lock, then runs callbacks after releasing it, so
//! a callback may itself call `when_ready` without deadlocking.

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

/// Readiness of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Created,
    Initializing,
    Initialized,
    Error,
}

impl ReadyState {
    /// Terminal for the current cycle
    pub fn is_settled(self) -> bool {
        matches!(self, ReadyState::Initialized | ReadyState::Error)
    }
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadyState::Created => write!(f, "created"),
            ReadyState::Initializing => write!(f, "initializing"),
            ReadyState::Initialized => write!(f, "initialized"),
            ReadyState::Error => write!(f, "error"),
        }
    }
}

type Waiter = Box<dyn FnOnce(bool) + Send>;

struct ReadyInner {
    state: ReadyState,
    waiters: Vec<Waiter>,
}

/// Mutex-protected state plus pending waiters
pub struct Readiness {
    inner: Mutex<ReadyInner>,
}

impl Readiness {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ReadyInner {
                state: ReadyState::Created,
                waiters: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReadyInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ReadyState {
        self.lock().state
    }

    /// Enter `Initializing`; pending waiters stay queued for the next settle
    pub fn begin(&self) {
        self.lock().state = ReadyState::Initializing;
    }

    /// Settle the current cycle and notify every queued waiter once
    ///
    /// Returns how many waiters were notified.
    pub fn settle(&self, ok: bool) -> usize {
        let waiters = {
            let mut inner = self.lock();
            inner.state = if ok {
                ReadyState::Initialized
            } else {
                ReadyState::Error
            };
            std::mem::take(&mut inner.waiters)
        };

        let count = waiters.len();
        for waiter in waiters {
            waiter(ok);
        }
        debug!("Catalog settled (ok={}), notified {} waiters", ok, count);
        count
    }

    /// Run `callback` once the current cycle settles
    ///
    /// Returns `true` when already settled (callback ran synchronously),
    /// `false` when queued.
    pub fn when_ready<F>(&self, callback: F) -> bool
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let mut inner = self.lock();
        if inner.state.is_settled() {
            let ok = inner.state == ReadyState::Initialized;
            drop(inner);
            callback(ok);
            true
        } else {
            inner.waiters.push(Box::new(callback));
            false
        }
    }

    /// Wait for the current cycle to settle; resolves to the `ok` flag
    pub async fn wait(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        self.when_ready(move |ok| {
            let _ = tx.send(ok);
        });
        rx.await.unwrap_or(false)
    }

    /// Number of queued waiters
    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}
