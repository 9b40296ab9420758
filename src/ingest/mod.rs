//! Background ingestion of train position snapshots.
//!
//! An external simulator drops one CSV snapshot per emission into a watched
//! directory. Each tick of the ingestion loop picks the oldest snapshot,
//! resolves it against the station catalog, swaps the result into the
//! registry, and clears the directory.

pub mod resolver;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::catalog::StationCatalog;
use crate::config::SnapshotConfig;
use crate::registry::TrainRegistry;

/// Notification that a new position cycle has been published.
#[derive(Debug, Clone)]
pub struct PositionUpdate {
    /// Timestamp when this cycle was published
    pub timestamp: String,
    /// Number of trains in the cycle
    pub trains: usize,
}

/// Sender for position cycle notifications
pub type PositionUpdateSender = broadcast::Sender<PositionUpdate>;

/// Drives the snapshot ingestion loop.
pub struct IngestManager {
    catalog: Arc<StationCatalog>,
    registry: Arc<TrainRegistry>,
    config: SnapshotConfig,
    updates_tx: PositionUpdateSender,
}

impl IngestManager {
    pub fn new(
        catalog: Arc<StationCatalog>,
        registry: Arc<TrainRegistry>,
        config: SnapshotConfig,
    ) -> Self {
        // Capacity 16 - consumers read the registry for actual state
        let (updates_tx, _) = broadcast::channel(16);

        Self {
            catalog,
            registry,
            config,
            updates_tx,
        }
    }

    /// Get the update sender for passing to display collaborators.
    pub fn update_sender(&self) -> PositionUpdateSender {
        self.updates_tx.clone()
    }

    /// Run the ingestion loop until the shutdown signal flips. A tick
    /// already in progress is allowed to finish.
    pub async fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            directory = %self.config.directory.display(),
            interval_secs = self.config.interval_secs,
            "Starting snapshot ingestion loop"
        );
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(self.config.interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = shutdown.changed() => {
                    info!("Stopping snapshot ingestion loop");
                    break;
                }
            }
        }
    }

    /// One ingestion cycle: select the oldest snapshot, resolve it, publish
    /// the result, then clear the directory. Failures are contained here so
    /// the next tick starts fresh.
    pub async fn tick(&self) {
        let files = match self.list_snapshots().await {
            Ok(files) => files,
            Err(e) => {
                warn!(
                    directory = %self.config.directory.display(),
                    error = %e,
                    "Cannot list snapshot directory, skipping tick"
                );
                return;
            }
        };

        let Some(selected) = select_oldest(files) else {
            return;
        };

        match resolver::resolve_snapshot(&selected, &self.catalog) {
            Ok(records) => {
                let trains = records.len();
                self.registry.replace_all(records).await;

                // Ignore send errors - they just mean no one is listening
                let _ = self.updates_tx.send(PositionUpdate {
                    timestamp: Utc::now().to_rfc3339(),
                    trains,
                });
                info!(file = %selected.display(), trains, "Published train position cycle");
            }
            Err(e) => {
                error!(
                    file = %selected.display(),
                    error = %e,
                    "Failed to resolve snapshot, no update this tick"
                );
            }
        }

        // Every matching file is consumed by this tick, including snapshots
        // that arrived after the selected one. One cycle per tick.
        self.delete_snapshots().await;
    }

    /// List matching snapshot files with their modification times.
    async fn list_snapshots(&self) -> Result<Vec<(PathBuf, SystemTime)>, std::io::Error> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.config.directory).await?;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.config.extension.as_str()) {
                continue;
            }
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "No modification time, skipping file");
                    continue;
                }
            };
            files.push((path, modified));
        }
        Ok(files)
    }

    /// Delete all matching files in the watched directory.
    async fn delete_snapshots(&self) {
        let files = match self.list_snapshots().await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Cannot list snapshot directory for cleanup");
                return;
            }
        };

        let mut removed = 0usize;
        for (path, _) in files {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(file = %path.display(), error = %e, "Failed to delete snapshot"),
            }
        }
        if removed > 0 {
            debug!(removed, "Cleared snapshot directory");
        }
    }
}

/// Oldest snapshot first, so accumulated snapshots are processed in arrival
/// order. Ties on modification time are broken by file name ascending to
/// keep the choice deterministic.
fn select_oldest(files: Vec<(PathBuf, SystemTime)>) -> Option<PathBuf> {
    files
        .into_iter()
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(path, _)| path)
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
