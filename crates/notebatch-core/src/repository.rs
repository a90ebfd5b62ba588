//! Repository façade
//!
//! The single interface the presentation layer uses for CRUD, sync and list
//! windows. Storage details stay behind it; reads only ever return complete
//! notes. Every successful mutation is announced on a broadcast channel so a
//! UI can decide when to redraw.
//!
//! ## Usage
//!
//! ```ignore
//! let repo = Repository::open(&config)?;
//! let mut events = repo.subscribe();
//!
//! let note = repo.create("Groceries", "milk")?;
//! repo.sync(500).await?;
//! let notes = repo.fetch_all()?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::Note;
use crate::paging::{fetch_window, NoteQuery, Window};
use crate::remote::{MockRemoteSource, RemoteSource};
use crate::storage::{RecordStore, SortOrder, StorageError};
use crate::sync::{SyncEngine, SyncError, SyncReport, SyncSettings, SyncStatus};

/// Capacity of the change event channel
const EVENT_CAPACITY: usize = 64;

/// Errors surfaced to the presentation layer
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No note with this id exists
    #[error("Note not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl RepositoryError {
    /// A short message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            RepositoryError::Storage(e) => match e.recovery_suggestion() {
                Some(hint) => format!("Failed to save or load notes: {} {}", e, hint),
                None => format!("Failed to save or load notes: {}", e),
            },
            RepositoryError::NotFound(id) => format!("The note '{}' no longer exists.", id),
            RepositoryError::Sync(SyncError::InProgress) => {
                "A sync is already running. Try again when it finishes.".to_string()
            }
            RepositoryError::Sync(e) => format!("Sync failed: {}", e),
        }
    }
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Change notifications emitted after a successful mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryEvent {
    Created(Note),
    Updated { id: String },
    Deleted { ids: Vec<String> },
    Synced(SyncReport),
}

/// Operations available to the presentation layer
#[async_trait]
pub trait NotesRepository: Send + Sync {
    /// Pull `count` notes from the remote and upsert them
    async fn sync(&self, count: usize) -> RepositoryResult<SyncReport>;

    /// All notes, newest first
    fn fetch_all(&self) -> RepositoryResult<Vec<Note>>;

    /// One note by id
    fn fetch(&self, id: &str) -> RepositoryResult<Option<Note>>;

    /// Create a local note with a fresh id
    fn create(&self, title: &str, content: &str) -> RepositoryResult<Note>;

    /// Edit title and content of an existing note
    fn update(&self, id: &str, title: &str, content: &str) -> RepositoryResult<()>;

    /// Delete notes by id; missing ids are skipped
    fn delete(&self, ids: &[String]) -> RepositoryResult<usize>;

    /// First `limit` notes matching the query
    fn window(&self, query: &NoteQuery, limit: usize) -> RepositoryResult<Window>;
}

/// Repository over a SQLite record store and a sync engine
pub struct Repository {
    store: RecordStore,
    engine: SyncEngine,
    events: broadcast::Sender<RepositoryEvent>,
}

impl Repository {
    pub fn new(store: RecordStore, source: Arc<dyn RemoteSource>, settings: SyncSettings) -> Self {
        let engine = SyncEngine::new(store.clone(), source, settings);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            engine,
            events,
        }
    }

    /// Open the configured store, syncing against the mock remote
    pub fn open(config: &Config) -> RepositoryResult<Self> {
        let store = RecordStore::open(config)?;
        let source = Arc::new(MockRemoteSource::from_config(config));
        Ok(Self::new(store, source, SyncSettings::from_config(config)))
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.events.subscribe()
    }

    /// Current sync engine status
    pub fn sync_status(&self) -> SyncStatus {
        self.engine.status()
    }

    /// Subscribe to sync engine status changes
    pub fn subscribe_sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.engine.subscribe_status()
    }

    /// Number of stored rows
    pub fn count(&self) -> RepositoryResult<usize> {
        logged("count notes", self.store.count().map_err(Into::into))
    }

    /// The underlying record store
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    fn emit(&self, event: RepositoryEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl NotesRepository for Repository {
    async fn sync(&self, count: usize) -> RepositoryResult<SyncReport> {
        let report = logged("sync", self.engine.sync(count).await.map_err(Into::into))?;
        self.emit(RepositoryEvent::Synced(report.clone()));
        Ok(report)
    }

    fn fetch_all(&self) -> RepositoryResult<Vec<Note>> {
        logged(
            "load notes",
            self.store.list_all(SortOrder::Descending).map_err(Into::into),
        )
    }

    fn fetch(&self, id: &str) -> RepositoryResult<Option<Note>> {
        logged("load note", self.store.get(id).map_err(Into::into))
    }

    fn create(&self, title: &str, content: &str) -> RepositoryResult<Note> {
        let note = Note::new(title, content);
        logged("create note", self.store.insert(&note).map_err(Into::into))?;
        debug!("Created note {}", note.id);
        self.emit(RepositoryEvent::Created(note.clone()));
        Ok(note)
    }

    fn update(&self, id: &str, title: &str, content: &str) -> RepositoryResult<()> {
        let found = logged(
            "update note",
            self.store.update(id, title, content).map_err(Into::into),
        )?;
        if !found {
            return logged("update note", Err(RepositoryError::NotFound(id.to_string())));
        }
        debug!("Updated note {}", id);
        self.emit(RepositoryEvent::Updated { id: id.to_string() });
        Ok(())
    }

    fn delete(&self, ids: &[String]) -> RepositoryResult<usize> {
        let removed = logged("delete notes", self.store.delete(ids).map_err(Into::into))?;
        debug!("Deleted {} of {} requested note(s)", removed, ids.len());
        if removed > 0 {
            self.emit(RepositoryEvent::Deleted { ids: ids.to_vec() });
        }
        Ok(removed)
    }

    fn window(&self, query: &NoteQuery, limit: usize) -> RepositoryResult<Window> {
        logged(
            "load note window",
            fetch_window(&self.store, query, limit).map_err(Into::into),
        )
    }
}

/// Log a failed operation before handing it to the caller
fn logged<T>(operation: &str, result: RepositoryResult<T>) -> RepositoryResult<T> {
    if let Err(e) = &result {
        warn!("Failed to {}: {}", operation, e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteNote;
    use crate::remote::TransportError;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn repo() -> Repository {
        let store = RecordStore::open_in_memory().unwrap();
        let anchor = Utc.with_ymd_and_hms(2026, 1, 16, 12, 0, 0).unwrap();
        let source = MockRemoteSource::new("p")
            .with_latency(Duration::ZERO)
            .with_anchor(anchor);
        Repository::new(store, Arc::new(source), SyncSettings::default())
    }

    struct DownSource;

    #[async_trait]
    impl RemoteSource for DownSource {
        async fn fetch(&self, _count: usize) -> Result<Vec<RemoteNote>, TransportError> {
            Err(TransportError::Network("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_sync_then_fetch_all_newest_first() {
        let repo = repo();
        repo.sync(3).await.unwrap();

        let ids: Vec<_> = repo.fetch_all().unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["p-0", "p-1", "p-2"]);

        repo.sync(3).await.unwrap();
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[test]
    fn test_create_then_delete_leaves_nothing() {
        let repo = repo();
        let note = repo.create("A", "B").unwrap();
        assert_eq!(repo.count().unwrap(), 1);

        let removed = repo.delete(&[note.id.clone()]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.count().unwrap(), 0);
        assert!(repo.fetch(&note.id).unwrap().is_none());
    }

    #[test]
    fn test_create_and_fetch() {
        let repo = repo();
        let note = repo.create("Title", "Content").unwrap();

        assert_eq!(repo.fetch(&note.id).unwrap(), Some(note));
    }

    #[tokio::test]
    async fn test_sync_keeps_remote_created_at_exactly() {
        let store = RecordStore::open_in_memory().unwrap();
        let source = MockRemoteSource::new("p").with_latency(Duration::ZERO);
        let remote = source.fetch(3).await.unwrap();
        let repo = Repository::new(store, Arc::new(source), SyncSettings::default());

        repo.sync(3).await.unwrap();

        for fetched in remote {
            let stored = repo.fetch(&fetched.id).unwrap().unwrap();
            assert_eq!(stored.created_at, fetched.created_at);
        }
        let report = repo.sync(3).await.unwrap();
        assert_eq!(report.unchanged, 3);
    }

    #[test]
    fn test_update_changes_title_and_content() {
        let repo = repo();
        let note = repo.create("Old", "old").unwrap();

        repo.update(&note.id, "New", "new").unwrap();

        let fetched = repo.fetch(&note.id).unwrap().unwrap();
        assert_eq!(fetched.title, "New");
        assert_eq!(fetched.content, "new");
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let repo = repo();
        let err = repo.update("ghost", "t", "c").unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(ref id) if id == "ghost"));
        assert!(err.user_message().contains("ghost"));
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let repo = repo();
        repo.create("keep", "me").unwrap();
        assert_eq!(repo.delete(&["ghost".to_string()]).unwrap(), 0);
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let repo = repo();
        let mut events = repo.subscribe();

        let note = repo.create("A", "B").unwrap();
        repo.update(&note.id, "A2", "B2").unwrap();
        repo.delete(&[note.id.clone()]).unwrap();
        let report = repo.sync(2).await.unwrap();

        assert_eq!(events.recv().await.unwrap(), RepositoryEvent::Created(note.clone()));
        assert_eq!(
            events.recv().await.unwrap(),
            RepositoryEvent::Updated { id: note.id.clone() }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            RepositoryEvent::Deleted { ids: vec![note.id] }
        );
        assert_eq!(events.recv().await.unwrap(), RepositoryEvent::Synced(report));
    }

    #[tokio::test]
    async fn test_failed_sync_keeps_state_and_reports() {
        let store = RecordStore::open_in_memory().unwrap();
        let repo = Repository::new(store, Arc::new(DownSource), SyncSettings::default());
        let note = repo.create("local", "note").unwrap();
        let mut events = repo.subscribe();

        let err = repo.sync(10).await.unwrap_err();
        assert!(err.user_message().starts_with("Sync failed"));
        assert_eq!(repo.sync_status(), SyncStatus::Failed);
        assert_eq!(repo.fetch_all().unwrap(), vec![repo.fetch(&note.id).unwrap().unwrap()]);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_window_passthrough() {
        let repo = repo();
        repo.sync(120).await.unwrap();

        let query = NoteQuery::new("note 1", SortOrder::Descending);
        let window = repo.window(&query, 5).unwrap();
        let ids: Vec<_> = window.notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["p-1", "p-10", "p-11", "p-12", "p-13"]);
        assert!(!window.exhausted);
    }

    #[test]
    fn test_open_with_config() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        let repo = Repository::open(&config).unwrap();
        repo.create("persisted", "on disk").unwrap();
        assert!(config.sqlite_path().exists());
        assert_eq!(repo.store().path(), Some(config.sqlite_path().as_path()));
    }
}
