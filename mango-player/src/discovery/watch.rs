//! Manifest change watcher
//!
//! Watches the directory holding the library manifest and requests a catalog
//! refresh whenever the manifest file is created, modified or removed. The
//! parent directory is watched rather than the file itself because scanners
//! usually replace the manifest by renaming a temporary file over it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use super::RefreshTrigger;
use crate::error::{Error, Result};

/// Keeps the underlying watcher alive; dropping it stops watching
pub struct ManifestWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ManifestWatcher {
    pub fn start(manifest: &Path, trigger: RefreshTrigger) -> Result<Self> {
        let file_name = manifest
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| {
                Error::Discovery(format!("Not a manifest file path: {}", manifest.display()))
            })?;
        let dir = match manifest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        if touches_manifest(&event, &file_name) {
                            debug!("Manifest changed: {:?}", event.kind);
                            if !trigger.request() {
                                debug!("Refresher stopped, ignoring manifest change");
                            }
                        }
                    }
                    Err(e) => warn!("Manifest watch error: {}", e),
                }
            })
            .map_err(|e| Error::Discovery(format!("Failed to create file watcher: {}", e)))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Discovery(format!("Failed to watch {}: {}", dir.display(), e)))?;

        info!("Watching manifest {}", manifest.display());
        Ok(Self {
            _watcher: watcher,
            path: manifest.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn touches_manifest(event: &Event, file_name: &OsString) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()))
}
