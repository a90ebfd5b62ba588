//! Storage error handling
//!
//! Provides typed errors for record store operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to open the database file
    #[error("Failed to open database at '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A stored row could not be decoded
    #[error("Invalid row for note '{id}': {details}")]
    InvalidRow { id: String, details: String },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store lock was poisoned by a panicking writer
    #[error("Record store lock poisoned")]
    Poisoned,

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Check if this error is recoverable
    ///
    /// Busy/locked databases and full disks can succeed on retry; constraint
    /// violations and corrupt rows cannot.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StorageError::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::DiskFull
            ),
            StorageError::CreateDirectory { .. } | StorageError::Io(_) => true,
            _ => false,
        }
    }

    /// Check if this error is a constraint violation (e.g. duplicate id)
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::Open { .. } => {
                Some("Check that the data directory is writable and the database is not in use by another process.")
            }
            StorageError::Database(_) if self.is_recoverable() => {
                Some("The database is busy or the disk is full. Try again shortly.")
            }
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn sqlite_failure(code: i32) -> StorageError {
        StorageError::Database(rusqlite::Error::SqliteFailure(
            ffi::Error::new(code),
            Some("test".to_string()),
        ))
    }

    #[test]
    fn test_busy_is_recoverable() {
        let err = sqlite_failure(ffi::SQLITE_BUSY);
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_constraint_classification() {
        let err = sqlite_failure(ffi::SQLITE_CONSTRAINT);
        assert!(err.is_constraint_violation());
        assert!(!err.is_recoverable());
        assert!(err.recovery_suggestion().is_none());
    }

    #[test]
    fn test_invalid_row_display() {
        let err = StorageError::InvalidRow {
            id: "p-1".to_string(),
            details: "bad timestamp".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("p-1"));
        assert!(msg.contains("bad timestamp"));
    }

    #[test]
    fn test_create_directory_display() {
        let err = StorageError::CreateDirectory {
            path: PathBuf::from("/readonly/notebatch"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        let msg = err.to_string();
        assert!(msg.contains("/readonly/notebatch"));
        assert!(err.is_recoverable());
    }
}
