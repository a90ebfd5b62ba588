//! SQLite schema for the note record store
//!
//! Title, content and created_at are nullable. Incomplete rows are skipped
//! when hydrating.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, Result};

use crate::storage::query::fold_text;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Name of the SQL function used for case/diacritic-insensitive matching
pub const FOLD_FUNCTION: &str = "fold";

/// `created_at` on disk: nanoseconds since the Unix epoch
///
/// `None` outside roughly 1677..2262, the range an `i64` of nanoseconds covers.
pub fn encode_timestamp(at: &DateTime<Utc>) -> Option<i64> {
    at.timestamp_nanos_opt()
}

/// Inverse of [`encode_timestamp`]
pub fn decode_timestamp(nanos: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(nanos)
}

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Notes table, keyed by remote identifier
        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT,
            content TEXT,
            created_at INTEGER
        );

        -- Sorted scans by creation date
        CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes(created_at, id);
        "#,
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Register the scalar functions queries depend on
///
/// Must run on every connection; SQL functions are not persisted in the file.
pub fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| fold_text(&t)))
        },
    )
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
