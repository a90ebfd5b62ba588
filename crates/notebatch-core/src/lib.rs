//! Notebatch Core Library
//!
//! Offline-first note storage with a batched pull sync and windowed list
//! queries.
//!
//! # Architecture
//!
//! - **SQLite**: Local record store, the single source of truth for notes
//! - **Remote source**: Pluggable note feed (a deterministic mock by default)
//! - **Sync engine**: Pulls a batch and upserts it in one transaction
//! - **Pager**: Grows a filtered, sorted list window one page at a time
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let repo = Repository::open(&config)?;
//!
//! repo.create("Groceries", "milk, eggs")?;
//! repo.sync(config.sync_count).await?;
//!
//! let pager = Pager::new(PagerSettings::from_config(&config));
//! let window = repo.window(&NoteQuery::new("milk", SortOrder::Descending), pager.limit())?;
//! ```
//!
//! # Modules
//!
//! - `repository`: Façade used by the presentation layer (main entry point)
//! - `models`: Note and remote payload types
//! - `storage`: SQLite record store and typed queries
//! - `remote`: Remote note sources
//! - `sync`: Batched upsert sync
//! - `paging`: Windowed, debounced list queries
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod paging;
pub mod remote;
pub mod repository;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use models::{Note, RemoteNote};
pub use paging::{fetch_window, NoteQuery, Pager, PagerSettings, Window};
pub use remote::{MockRemoteSource, RemoteSource, TransportError};
pub use repository::{
    NotesRepository, Repository, RepositoryError, RepositoryEvent, RepositoryResult,
};
pub use storage::{Predicate, Query, RecordStore, SortOrder, StorageError};
pub use sync::{SyncEngine, SyncError, SyncReport, SyncSettings, SyncStatus};
