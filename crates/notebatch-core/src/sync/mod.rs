//! Sync engine
//!
//! Reconciles a remote note feed with the local record store.
//!
//! ## Protocol
//!
//! 1. Fetch a batch from the remote source (bounded by a timeout)
//! 2. Open one write batch against the record store
//! 3. For each fetched note, in order: overwrite the record with its id, or
//!    insert it
//! 4. Commit once; abort everything on the first error
//!
//! Only one sync runs at a time per engine. Sync never deletes.
//!
//! ## Usage
//!
//! ```ignore
//! let source = Arc::new(MockRemoteSource::default());
//! let engine = SyncEngine::new(store, source, SyncSettings::default());
//! let report = engine.sync(500).await?;
//! ```

mod engine;

pub use engine::{
    SyncEngine, SyncError, SyncReport, SyncSettings, SyncStatus, DEFAULT_FETCH_TIMEOUT,
};
