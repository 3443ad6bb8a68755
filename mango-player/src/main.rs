//! Mango Player (mango-player) - Main entry point
//!
//! Headless driver for the catalog and queue core: builds the catalog from
//! the library manifest, restores the last played queue and prints a
//! summary. With `--watch` it keeps running, rebuilding the catalog whenever
//! the manifest changes, until Ctrl+C.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mango_common::events::{EventBus, MangoEvent};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mango_player::catalog::{album_summaries, artist_summaries, CatalogIndex};
use mango_player::config::{Config, ConfigOverrides};
use mango_player::discovery::refresh::refresh_catalog;
use mango_player::discovery::{CatalogRefresher, DiscoveryFeed, ManifestFeed, ManifestWatcher};
use mango_player::playback::{
    LastPlayedRecorder, LastPlayedStore, LocalEngine, PlaybackEngine, PlaybackSampler,
    PlaybackStateHolder, QueueController, SqliteLastPlayedStore,
};
use mango_player::session::{PlaybackSession, QueueHandle};

/// Command-line arguments for mango-player
#[derive(Parser, Debug)]
#[command(name = "mango-player")]
#[command(about = "Media catalog and playback queue for Mango")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "MANGO_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database holding last played state
    #[arg(short, long, env = "MANGO_DATABASE")]
    database: Option<PathBuf>,

    /// JSON library manifest
    #[arg(short, long, env = "MANGO_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Keep running and rebuild the catalog when the manifest changes
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(mango_common::config::default_config_path);
    let config = Config::load(
        &config_path,
        ConfigOverrides {
            database_path: args.database.clone(),
            library_manifest: args.manifest.clone(),
            log_level: None,
        },
    )
    .context("Failed to load configuration")?;

    init_tracing(&config)?;
    info!("Starting Mango Player");
    info!("Configuration: {}", config_path.display());

    let events = EventBus::new(config.event_capacity);
    let catalog = Arc::new(CatalogIndex::new());
    let feed: Arc<dyn DiscoveryFeed> = Arc::new(ManifestFeed::new(
        &config.library_manifest,
        config.scan_filter.clone(),
    ));

    if let Err(e) = refresh_catalog(&catalog, feed.as_ref(), &events).await {
        warn!("Initial catalog build failed: {}", e);
    }

    let db = config
        .open_database()
        .await
        .context("Failed to open database")?;
    let store: Arc<dyn LastPlayedStore> = Arc::new(SqliteLastPlayedStore::new(db));
    let recorder = LastPlayedRecorder::spawn(store.clone(), &events);

    let state = Arc::new(PlaybackStateHolder::new());
    let engine = LocalEngine::new();
    let mut sampler = PlaybackSampler::new(state.clone(), config.sample_interval);
    sampler.set_source(engine.probe());

    let controller = QueueController::new(engine, catalog.clone(), state.clone(), events.clone());
    let (queue, session) = PlaybackSession::spawn(controller, store);

    let restored = queue
        .load_initial_queue()
        .await
        .context("Failed to restore queue")?;
    if !restored {
        warn!("Queue not restored; the stored list is left as is");
    }
    print_summary(&catalog, &queue.snapshot().await?);

    if args.watch {
        // Subscribe before the first rebuild can land
        let follower = spawn_catalog_follower(queue.clone(), &events, restored);
        let refresher = CatalogRefresher::spawn(catalog.clone(), feed, events.clone());
        let _watcher = ManifestWatcher::start(&config.library_manifest, refresher.trigger())
            .context("Failed to watch library manifest")?;

        shutdown_signal().await;
        refresher.shutdown();
        follower.abort();
    }

    queue.shutdown().await;
    let controller = session.await.context("Playback session task failed")?;
    sampler.stop();
    drop(controller);
    drop(events);
    if tokio::time::timeout(Duration::from_secs(2), recorder.join())
        .await
        .is_err()
    {
        warn!("Last-played recorder did not finish in time");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Follow catalog rebuilds in watch mode
///
/// Until the queue has been restored, each successful rebuild retries the
/// restore. Afterwards rebuilds refresh the metadata of queued items.
fn spawn_catalog_follower(
    queue: QueueHandle,
    events: &EventBus,
    mut restored: bool,
) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(MangoEvent::CatalogRebuilt { ok: true, .. }) => {
                    let result = if restored {
                        queue.refresh_metadata().await.map(|_| ())
                    } else {
                        queue.load_initial_queue().await.map(|done| {
                            if done {
                                info!("Queue restored after catalog rebuild");
                            }
                            restored = done;
                        })
                    };
                    if let Err(e) = result {
                        warn!("Catalog follower stopped: {}", e);
                        return;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Catalog follower lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    })
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "mango_player={0},mango_common={0}",
            config.log_level
        ))
    });
    let registry = tracing_subscriber::registry().with(filter);

    match &config.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
    Ok(())
}

fn print_summary(catalog: &CatalogIndex, queue: &mango_player::playback::QueueSnapshot) {
    println!("Catalog: {} items ({})", catalog.item_count(), catalog.state());
    println!("  albums:  {}", album_summaries(catalog).len());
    println!("  artists: {}", artist_summaries(catalog).len());
    println!(
        "Queue: {} items, current {}",
        queue.item_ids.len(),
        queue
            .current_index
            .and_then(|i| queue.item_ids.get(i))
            .map(String::as_str)
            .unwrap_or("-")
    );
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
