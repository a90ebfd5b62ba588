//! SQLite-backed record store for notes
//!
//! Writes go through one connection behind a mutex, so they are serialized.
//! File-backed stores also hold a read-only connection; with WAL enabled,
//! reads on it never wait for an open write batch and always see the last
//! committed state. In-memory stores read through the writer connection.
//! Every mutating call commits its own transaction before returning;
//! `write_batch` groups several mutations into a single all-or-nothing unit.
//!
//! ## Tables
//!
//! - `notes` - Note records keyed by remote identifier
//! - `schema_info` - Schema version

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{
    params, params_from_iter, Connection, OpenFlags, OptionalExtension, TransactionBehavior,
};
use tracing::debug;

use crate::config::Config;
use crate::models::Note;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::query::{Query, SortOrder};
use crate::storage::schema::{
    decode_timestamp, encode_timestamp, init_schema, needs_init, register_functions,
};

/// What an upsert did to the stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record with this id existed
    Inserted,
    /// An existing record was overwritten
    Updated,
    /// An existing record already held identical values
    Unchanged,
}

/// Durable keyed storage of notes
#[derive(Clone)]
pub struct RecordStore {
    conn: Arc<Mutex<Connection>>,
    /// Read-only connection, present for file-backed stores
    reader: Option<Arc<Mutex<Connection>>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Open or create the database in the configured data directory
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::open_path(&config.sqlite_path())
    }

    /// Open or create the database at a specific path
    pub fn open_path(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = FULL;")?;

        let mut store = Self::from_connection(conn, Some(path.to_path_buf()))?;

        let reader = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        register_functions(&reader)?;
        store.reader = Some(Arc::new(Mutex::new(reader)));

        debug!("Opened record store at {:?}", path);
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> StorageResult<Self> {
        register_functions(&conn)?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            reader: None,
            path,
        })
    }

    /// Location of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    fn read_lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.reader
            .as_ref()
            .unwrap_or(&self.conn)
            .lock()
            .map_err(|_| StorageError::Poisoned)
    }

    /// Run several mutations as one atomic unit
    ///
    /// The unit commits when `f` returns `Ok` and at least one row changed.
    /// An `Err` from `f`, or any failure inside it, rolls everything back.
    pub fn write_batch<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Batch<'_>) -> StorageResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut batch = Batch { tx, changes: 0 };

        let value = f(&mut batch)?;

        if batch.changes > 0 {
            debug!("Committing batch with {} change(s)", batch.changes);
            batch.tx.commit()?;
        } else {
            debug!("Batch made no changes, skipping commit");
        }
        Ok(value)
    }

    // ==================== Single-call writes ====================

    /// Insert a new note; fails if the id already exists
    pub fn insert(&self, note: &Note) -> StorageResult<()> {
        self.write_batch(|batch| batch.insert(note))
    }

    /// Insert the note, or overwrite every field of the record with its id
    pub fn upsert(&self, note: &Note) -> StorageResult<UpsertOutcome> {
        self.write_batch(|batch| batch.upsert(note))
    }

    /// Change title and content; returns false when no record has this id
    pub fn update(&self, id: &str, title: &str, content: &str) -> StorageResult<bool> {
        self.write_batch(|batch| batch.update(id, title, content))
    }

    /// Delete notes by id; returns how many existed
    pub fn delete(&self, ids: &[String]) -> StorageResult<usize> {
        self.write_batch(|batch| batch.delete(ids))
    }

    // ==================== Reads ====================

    /// Get a complete note by id
    pub fn get(&self, id: &str) -> StorageResult<Option<Note>> {
        let conn = self.read_lock()?;
        Ok(find_row(&conn, id)?.and_then(NoteRow::into_note))
    }

    /// Get all complete notes sorted by creation date
    pub fn list_all(&self, order: SortOrder) -> StorageResult<Vec<Note>> {
        self.scan(&Query::new().order(order))
    }

    /// Get up to `query.limit` complete notes matching the predicate, in order
    pub fn scan(&self, query: &Query) -> StorageResult<Vec<Note>> {
        let (sql, values) = query.to_sql();
        let conn = self.read_lock()?;
        let mut stmt = conn.prepare_cached(&sql)?;

        let rows = stmt
            .query_map(params_from_iter(values), NoteRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows.into_iter().filter_map(NoteRow::into_note).collect())
    }

    /// Count all stored rows, complete or not
    pub fn count(&self) -> StorageResult<usize> {
        let conn = self.read_lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[cfg(test)]
    pub(crate) fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }
}

/// An open write transaction
///
/// Obtained from [`RecordStore::write_batch`]. Reads through the batch see
/// its own uncommitted writes.
pub struct Batch<'conn> {
    tx: rusqlite::Transaction<'conn>,
    changes: usize,
}

impl Batch<'_> {
    /// Number of rows changed so far
    pub fn changes(&self) -> usize {
        self.changes
    }

    /// Get a complete note by id
    pub fn get(&self, id: &str) -> StorageResult<Option<Note>> {
        Ok(find_row(&self.tx, id)?.and_then(NoteRow::into_note))
    }

    /// Insert a new note; fails if the id already exists
    pub fn insert(&mut self, note: &Note) -> StorageResult<()> {
        let created_at = stored_created_at(note)?;
        self.tx
            .prepare_cached(
                "INSERT INTO notes (id, title, content, created_at) VALUES (?, ?, ?, ?)",
            )?
            .execute(params![note.id, note.title, note.content, created_at])?;
        self.changes += 1;
        Ok(())
    }

    /// Find by id, then overwrite in place or insert
    pub fn upsert(&mut self, note: &Note) -> StorageResult<UpsertOutcome> {
        let Some(existing) = find_row(&self.tx, &note.id)? else {
            self.insert(note)?;
            return Ok(UpsertOutcome::Inserted);
        };

        let created_at = stored_created_at(note)?;
        if existing.matches(note, created_at) {
            return Ok(UpsertOutcome::Unchanged);
        }

        self.tx
            .prepare_cached("UPDATE notes SET title = ?, content = ?, created_at = ? WHERE id = ?")?
            .execute(params![note.title, note.content, created_at, note.id])?;
        self.changes += 1;
        Ok(UpsertOutcome::Updated)
    }

    /// Change title and content; returns false when no record has this id
    pub fn update(&mut self, id: &str, title: &str, content: &str) -> StorageResult<bool> {
        let affected = self
            .tx
            .prepare_cached("UPDATE notes SET title = ?, content = ? WHERE id = ?")?
            .execute(params![title, content, id])?;
        self.changes += affected;
        Ok(affected > 0)
    }

    /// Delete notes by id; returns how many existed
    pub fn delete(&mut self, ids: &[String]) -> StorageResult<usize> {
        let mut stmt = self.tx.prepare_cached("DELETE FROM notes WHERE id = ?")?;
        let mut removed = 0;
        for id in ids {
            removed += stmt.execute(params![id])?;
        }
        drop(stmt);
        self.changes += removed;
        Ok(removed)
    }
}

// ==================== Internal structs ====================

/// A raw row; any column other than `id` may be missing
#[derive(Debug)]
struct NoteRow {
    id: String,
    title: Option<String>,
    content: Option<String>,
    created_at: Option<i64>,
}

impl NoteRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    /// Hydrate into a note, dropping incomplete rows
    fn into_note(self) -> Option<Note> {
        let (Some(title), Some(content), Some(nanos)) = (self.title, self.content, self.created_at)
        else {
            debug!("Skipping incomplete note row {}", self.id);
            return None;
        };
        Some(Note {
            id: self.id,
            title,
            content,
            created_at: decode_timestamp(nanos),
        })
    }

    fn matches(&self, note: &Note, created_at: i64) -> bool {
        self.title.as_deref() == Some(note.title.as_str())
            && self.content.as_deref() == Some(note.content.as_str())
            && self.created_at == Some(created_at)
    }
}

fn stored_created_at(note: &Note) -> StorageResult<i64> {
    encode_timestamp(&note.created_at).ok_or_else(|| StorageError::InvalidRow {
        id: note.id.clone(),
        details: format!("created_at {} is outside the storable range", note.created_at),
    })
}

fn find_row(conn: &Connection, id: &str) -> rusqlite::Result<Option<NoteRow>> {
    conn.prepare_cached("SELECT id, title, content, created_at FROM notes WHERE id = ?")?
        .query_row(params![id], NoteRow::from_row)
        .optional()
}
