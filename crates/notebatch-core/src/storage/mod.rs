//! Storage layer
//!
//! Durable keyed storage of notes in SQLite.
//!
//! ## Architecture
//!
//! - **RecordStore**: single serialized writer, atomic per call or per batch
//! - **Query**: typed predicate/sort/limit builder compiled to bound SQL
//! - **Schema**: versioned table layout plus the `fold` text function

pub mod error;
pub mod query;
pub mod record_store;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use query::{fold_text, Predicate, Query, SortOrder, TextField};
pub use record_store::{Batch, RecordStore, UpsertOutcome};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
