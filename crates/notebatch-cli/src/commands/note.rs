//! Note command handlers

use anyhow::{bail, Result};

use notebatch_core::{NotesRepository, RepositoryError};

use super::user_error;
use crate::output::{Output, OutputFormat};

/// Create a new note
pub fn add(repo: &impl NotesRepository, title: &str, content: &str, output: &Output) -> Result<()> {
    let note = repo.create(title, content).map_err(user_error)?;

    if output.format == OutputFormat::Human {
        output.success(&format!("Created note {}", note.id));
    } else {
        output.print_note(&note);
    }
    Ok(())
}

/// Edit a note, keeping any field that isn't given
pub fn edit(
    repo: &impl NotesRepository,
    id: &str,
    title: Option<String>,
    content: Option<String>,
    output: &Output,
) -> Result<()> {
    if title.is_none() && content.is_none() {
        bail!("Nothing to change. Pass --title and/or --content.");
    }

    let note = repo
        .fetch(id)
        .map_err(user_error)?
        .ok_or_else(|| user_error(RepositoryError::NotFound(id.to_string())))?;

    let title = title.unwrap_or(note.title);
    let content = content.unwrap_or(note.content);
    repo.update(id, &title, &content).map_err(user_error)?;

    output.success(&format!("Updated note {}", id));
    Ok(())
}

/// Delete notes by id
pub fn remove(repo: &impl NotesRepository, ids: &[String], output: &Output) -> Result<()> {
    let removed = repo.delete(ids).map_err(user_error)?;

    let skipped = ids.len() - removed.min(ids.len());
    if skipped > 0 {
        output.message(&format!("{} id(s) did not match any note", skipped));
    }
    output.success(&format!("Deleted {} note(s)", removed));
    Ok(())
}

/// Show one note
pub fn show(repo: &impl NotesRepository, id: &str, output: &Output) -> Result<()> {
    match repo.fetch(id).map_err(user_error)? {
        Some(note) => {
            output.print_note(&note);
            Ok(())
        }
        None => Err(user_error(RepositoryError::NotFound(id.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebatch_core::{MockRemoteSource, RecordStore, Repository, SyncSettings};
    use std::sync::Arc;

    fn repo() -> Repository {
        let store = RecordStore::open_in_memory().unwrap();
        Repository::new(
            store,
            Arc::new(MockRemoteSource::default()),
            SyncSettings::default(),
        )
    }

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_edit_keeps_missing_fields() {
        let repo = repo();
        let note = repo.create("Title", "Body").unwrap();

        edit(&repo, &note.id, None, Some("New body".to_string()), &quiet()).unwrap();

        let updated = repo.fetch(&note.id).unwrap().unwrap();
        assert_eq!(updated.title, "Title");
        assert_eq!(updated.content, "New body");
    }

    #[test]
    fn test_edit_requires_a_field() {
        let repo = repo();
        let note = repo.create("Title", "Body").unwrap();
        assert!(edit(&repo, &note.id, None, None, &quiet()).is_err());
    }

    #[test]
    fn test_edit_and_show_missing_note() {
        let repo = repo();
        let err = edit(&repo, "ghost", Some("t".to_string()), None, &quiet()).unwrap_err();
        assert!(err.to_string().contains("ghost"));
        assert!(show(&repo, "ghost", &quiet()).is_err());
    }

    #[test]
    fn test_remove_counts_only_existing() {
        let repo = repo();
        let note = repo.create("Title", "Body").unwrap();

        remove(&repo, &[note.id.clone(), "ghost".to_string()], &quiet()).unwrap();
        assert!(repo.fetch_all().unwrap().is_empty());
    }
}
