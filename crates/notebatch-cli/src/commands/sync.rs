//! Sync command handler

use anyhow::Result;
use tracing::debug;

use notebatch_core::{NotesRepository, Repository};

use super::user_error;
use crate::output::Output;

/// Pull `count` notes from the remote
pub async fn sync(repo: &Repository, count: usize, output: &Output) -> Result<()> {
    output.message(&format!("Syncing {} note(s)...", count));

    // Trace status transitions while the sync runs
    let mut status_rx = repo.subscribe_sync_status();
    let watcher = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            debug!("Sync status: {:?}", *status_rx.borrow_and_update());
        }
    });

    let result = repo.sync(count).await;
    watcher.abort();

    let report = result.map_err(user_error)?;
    output.print_sync_report(&report);
    Ok(())
}
