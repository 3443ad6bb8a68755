//! Playback session
//!
//! The controller and its engine live on one task. Callers on other tasks or
//! threads hold a `QueueHandle` and send `QueueCommand`s; each command
//! carries a oneshot sender for its reply, so calls are marshaled onto the
//! session task instead of racing on the engine.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::playback::{LastPlayedStore, PlaybackEngine, QueueController, QueueSnapshot};

const COMMAND_CAPACITY: usize = 32;

/// Commands accepted by the session task
#[derive(Debug)]
pub enum QueueCommand {
    LoadInitialQueue {
        reply: oneshot::Sender<bool>,
    },
    PlayByUri {
        uri: String,
        reply: oneshot::Sender<bool>,
    },
    PlayById {
        id: String,
        play_when_ready: bool,
        reply: oneshot::Sender<bool>,
    },
    AddToNext {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    RemoveById {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    RevokeRemove {
        reply: oneshot::Sender<bool>,
    },
    MoveByDelta {
        id: String,
        delta: isize,
        reply: oneshot::Sender<bool>,
    },
    TogglePlay {
        reply: oneshot::Sender<bool>,
    },
    SkipToNext {
        reply: oneshot::Sender<bool>,
    },
    /// The engine reported an item transition
    MediaItemTransition,
    /// The catalog was rebuilt; replies with the number of refreshed items
    RefreshMetadata {
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<QueueSnapshot>,
    },
    Shutdown,
}

/// Cloneable, thread-safe access to a running session
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<QueueCommand>,
}

impl QueueHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> QueueCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| Error::Internal("Playback session stopped".to_string()))?;
        rx.await
            .map_err(|_| Error::Internal("Playback session dropped the reply".to_string()))
    }

    pub async fn load_initial_queue(&self) -> Result<bool> {
        self.request(|reply| QueueCommand::LoadInitialQueue { reply })
            .await
    }

    pub async fn play_by_uri(&self, uri: impl Into<String>) -> Result<bool> {
        let uri = uri.into();
        self.request(|reply| QueueCommand::PlayByUri { uri, reply })
            .await
    }

    pub async fn play_by_id(&self, id: impl Into<String>, play_when_ready: bool) -> Result<bool> {
        let id = id.into();
        self.request(|reply| QueueCommand::PlayById {
            id,
            play_when_ready,
            reply,
        })
        .await
    }

    pub async fn add_to_next(&self, id: impl Into<String>) -> Result<bool> {
        let id = id.into();
        self.request(|reply| QueueCommand::AddToNext { id, reply })
            .await
    }

    pub async fn remove_by_id(&self, id: impl Into<String>) -> Result<bool> {
        let id = id.into();
        self.request(|reply| QueueCommand::RemoveById { id, reply })
            .await
    }

    pub async fn revoke_remove(&self) -> Result<bool> {
        self.request(|reply| QueueCommand::RevokeRemove { reply })
            .await
    }

    pub async fn move_by_delta(&self, id: impl Into<String>, delta: isize) -> Result<bool> {
        let id = id.into();
        self.request(|reply| QueueCommand::MoveByDelta { id, delta, reply })
            .await
    }

    pub async fn toggle_play(&self) -> Result<bool> {
        self.request(|reply| QueueCommand::TogglePlay { reply })
            .await
    }

    pub async fn skip_to_next(&self) -> Result<bool> {
        self.request(|reply| QueueCommand::SkipToNext { reply })
            .await
    }

    pub async fn media_item_transition(&self) -> Result<()> {
        self.tx
            .send(QueueCommand::MediaItemTransition)
            .await
            .map_err(|_| Error::Internal("Playback session stopped".to_string()))
    }

    pub async fn refresh_metadata(&self) -> Result<usize> {
        self.request(|reply| QueueCommand::RefreshMetadata { reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<QueueSnapshot> {
        self.request(|reply| QueueCommand::Snapshot { reply })
            .await
    }

    /// Ask the session to stop; pending commands sent earlier still run
    pub async fn shutdown(&self) {
        let _ = self.tx.send(QueueCommand::Shutdown).await;
    }
}

/// Owner of the queue controller
pub struct PlaybackSession<E: PlaybackEngine> {
    controller: QueueController<E>,
    store: Arc<dyn LastPlayedStore>,
    rx: mpsc::Receiver<QueueCommand>,
}

impl<E: PlaybackEngine + 'static> PlaybackSession<E> {
    /// Start the session task
    ///
    /// The task ends on `Shutdown` or when every handle is dropped, and
    /// hands the controller back through the join handle.
    pub fn spawn(
        controller: QueueController<E>,
        store: Arc<dyn LastPlayedStore>,
    ) -> (QueueHandle, JoinHandle<QueueController<E>>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let session = Self {
            controller,
            store,
            rx,
        };
        (QueueHandle { tx }, tokio::spawn(session.run()))
    }

    async fn run(mut self) -> QueueController<E> {
        info!("Playback session started");
        while let Some(command) = self.rx.recv().await {
            if !self.handle(command).await {
                break;
            }
        }
        info!("Playback session stopped");
        self.controller
    }

    /// Returns `false` to stop the session
    async fn handle(&mut self, command: QueueCommand) -> bool {
        let c = &mut self.controller;
        match command {
            QueueCommand::LoadInitialQueue { reply } => {
                let restored = c.load_initial_queue(self.store.as_ref()).await;
                let _ = reply.send(restored);
            }
            QueueCommand::PlayByUri { uri, reply } => {
                let _ = reply.send(c.play_by_uri(&uri));
            }
            QueueCommand::PlayById {
                id,
                play_when_ready,
                reply,
            } => {
                let _ = reply.send(c.play_by_id(&id, play_when_ready));
            }
            QueueCommand::AddToNext { id, reply } => {
                let _ = reply.send(c.add_to_next(&id));
            }
            QueueCommand::RemoveById { id, reply } => {
                let _ = reply.send(c.remove_by_id(&id));
            }
            QueueCommand::RevokeRemove { reply } => {
                let _ = reply.send(c.revoke_remove());
            }
            QueueCommand::MoveByDelta { id, delta, reply } => {
                let _ = reply.send(c.move_by_delta(&id, delta));
            }
            QueueCommand::TogglePlay { reply } => {
                let _ = reply.send(c.toggle_play());
            }
            QueueCommand::SkipToNext { reply } => {
                let _ = reply.send(c.skip_to_next());
            }
            QueueCommand::MediaItemTransition => c.on_media_item_transition(),
            QueueCommand::RefreshMetadata { reply } => {
                let _ = reply.send(c.refresh_metadata());
            }
            QueueCommand::Snapshot { reply } => {
                let _ = reply.send(c.snapshot());
            }
            QueueCommand::Shutdown => {
                debug!("Playback session shutdown requested");
                return false;
            }
        }
        true
    }
}
