//! Sync engine implementation
//!
//! Fetches a batch from the remote source and upserts it into the record
//! store inside a single write batch on a blocking worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{Note, RemoteNote};
use crate::remote::{RemoteSource, TransportError};
use crate::storage::{RecordStore, StorageError, StorageResult, UpsertOutcome};

/// Default bound on a single remote fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Sync engine status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// No sync running
    Idle,
    /// Waiting for the remote batch
    Fetching,
    /// Applying the batch to the store
    Writing,
    /// The last sync failed
    Failed,
}

/// Errors that abort a sync
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote fetch failed
    #[error("Remote fetch failed: {0}")]
    Transport(#[from] TransportError),

    /// The upsert batch failed and was rolled back
    #[error("Failed to apply sync batch: {0}")]
    Storage(#[from] StorageError),

    /// Another sync is already running
    #[error("A sync is already in progress")]
    InProgress,

    /// The background writer panicked or was cancelled
    #[error("Sync worker failed: {0}")]
    Worker(String),
}

/// Outcome of one completed sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Records delivered by the remote
    pub fetched: usize,
    /// Records that did not exist locally
    pub inserted: usize,
    /// Existing records that were overwritten
    pub updated: usize,
    /// Existing records that already matched
    pub unchanged: usize,
    /// Wall time of the whole sync
    pub duration_ms: u64,
}

impl SyncReport {
    /// Number of rows written
    pub fn changed(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Tunables for the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub fetch_timeout: Duration,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Reconciles a remote note feed with the record store
pub struct SyncEngine {
    store: RecordStore,
    source: Arc<dyn RemoteSource>,
    settings: SyncSettings,
    /// Held for the duration of a sync
    in_flight: Mutex<()>,
    status: watch::Sender<SyncStatus>,
    status_rx: watch::Receiver<SyncStatus>,
}

impl SyncEngine {
    pub fn new(store: RecordStore, source: Arc<dyn RemoteSource>, settings: SyncSettings) -> Self {
        let (status, status_rx) = watch::channel(SyncStatus::Idle);
        Self {
            store,
            source,
            settings,
            in_flight: Mutex::new(()),
            status,
            status_rx,
        }
    }

    /// Get the current status
    pub fn status(&self) -> SyncStatus {
        *self.status_rx.borrow()
    }

    /// Subscribe to status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    /// Fetch `count` notes and upsert them, waiting for any running sync
    pub async fn sync(&self, count: usize) -> Result<SyncReport, SyncError> {
        let _guard = self.in_flight.lock().await;
        self.run(count).await
    }

    /// Like [`sync`](Self::sync) but fails with `InProgress` instead of waiting
    pub async fn try_sync(&self, count: usize) -> Result<SyncReport, SyncError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Rejecting sync request, another sync is running");
            return Err(SyncError::InProgress);
        };
        self.run(count).await
    }

    async fn run(&self, count: usize) -> Result<SyncReport, SyncError> {
        info!("Starting sync of {} note(s)", count);
        let started = Instant::now();

        let result = self.fetch_and_apply(count).await;

        match result {
            Ok(mut report) => {
                report.duration_ms = started.elapsed().as_millis() as u64;
                self.set_status(SyncStatus::Idle);
                info!(
                    "Sync complete: fetched={} inserted={} updated={} unchanged={}",
                    report.fetched, report.inserted, report.updated, report.unchanged
                );
                Ok(report)
            }
            Err(e) => {
                self.set_status(SyncStatus::Failed);
                warn!("Sync failed: {}", e);
                Err(e)
            }
        }
    }

    async fn fetch_and_apply(&self, count: usize) -> Result<SyncReport, SyncError> {
        self.set_status(SyncStatus::Fetching);
        let timeout = self.settings.fetch_timeout;
        let notes = match tokio::time::timeout(timeout, self.source.fetch(count)).await {
            Ok(fetched) => fetched?,
            Err(_) => return Err(TransportError::Timeout(timeout).into()),
        };
        debug!("Fetched {} note(s) from remote", notes.len());

        self.set_status(SyncStatus::Writing);
        let store = self.store.clone();
        let fetched = notes.len();
        let counts = tokio::task::spawn_blocking(move || apply_batch(&store, notes))
            .await
            .map_err(|e| SyncError::Worker(e.to_string()))??;

        Ok(SyncReport {
            fetched,
            inserted: counts.inserted,
            updated: counts.updated,
            unchanged: counts.unchanged,
            duration_ms: 0,
        })
    }

    fn set_status(&self, status: SyncStatus) {
        let _ = self.status.send(status);
    }
}

#[derive(Debug, Default)]
struct UpsertCounts {
    inserted: usize,
    updated: usize,
    unchanged: usize,
}

/// Upsert every note in order inside one write batch
///
/// A later entry with the same id overwrites an earlier one.
fn apply_batch(store: &RecordStore, notes: Vec<RemoteNote>) -> StorageResult<UpsertCounts> {
    store.write_batch(|batch| {
        let mut counts = UpsertCounts::default();
        for remote in notes {
            let note = Note::from(remote);
            match batch.upsert(&note)? {
                UpsertOutcome::Inserted => counts.inserted += 1,
                UpsertOutcome::Updated => counts.updated += 1,
                UpsertOutcome::Unchanged => counts.unchanged += 1,
            }
        }
        Ok(counts)
    })
}
