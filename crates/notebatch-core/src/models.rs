//! Data models for notebatch
//!
//! Defines the note record and the payload shape delivered by a remote source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored note
///
/// `id` is the remote identifier and doubles as the upsert key. Notes created
/// locally get a fresh UUID string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    /// Remote identifier
    pub id: String,
    /// Note title
    pub title: String,
    /// Note body content
    pub content: String,
    /// When this note was created (the sort key)
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Create a new local note with a fresh identifier
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a note with a specific ID and timestamp (for sync and storage)
    pub fn with_id(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            created_at,
        }
    }

    /// Replace the editable fields
    ///
    /// Local edits never touch `created_at`.
    pub fn edit(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.title = title.into();
        self.content = content.into();
    }
}

/// A note as delivered by a remote source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteNote {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<RemoteNote> for Note {
    fn from(remote: RemoteNote) -> Self {
        Note::with_id(remote.id, remote.title, remote.content, remote.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_note_new() {
        let note = Note::new("Groceries", "milk, eggs");
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "milk, eggs");
        assert!(Uuid::parse_str(&note.id).is_ok());
    }

    #[test]
    fn test_note_new_ids_are_unique() {
        let a = Note::new("a", "a");
        let b = Note::new("a", "a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_edit_keeps_created_at() {
        let mut note = Note::new("Title", "Body");
        let created = note.created_at;
        note.edit("New title", "New body");
        assert_eq!(note.title, "New title");
        assert_eq!(note.content, "New body");
        assert_eq!(note.created_at, created);
    }

    #[test]
    fn test_remote_note_into_note() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 16, 9, 30, 0).unwrap();
        let remote = RemoteNote {
            id: "mock-7".to_string(),
            title: "mock note 7".to_string(),
            content: "mock content 7".to_string(),
            created_at: ts,
        };

        let note: Note = remote.into();
        assert_eq!(note, Note::with_id("mock-7", "mock note 7", "mock content 7", ts));
    }

    #[test]
    fn test_remote_note_wire_field_name() {
        let json = r#"{"id":"p-0","title":"t","content":"c","createdAt":"2026-01-16T09:30:00Z"}"#;
        let remote: RemoteNote = serde_json::from_str(json).unwrap();
        assert_eq!(remote.id, "p-0");
        assert_eq!(
            remote.created_at,
            Utc.with_ymd_and_hms(2026, 1, 16, 9, 30, 0).unwrap()
        );
    }
}
