//! List command handler
//!
//! Renders one pager window. `--pages N` stands in for a user scrolling to
//! the bottom of the list N times.

use anyhow::{Context, Result};

use notebatch_core::{Config, NoteQuery, NotesRepository, Pager, PagerSettings, SortOrder, Window};

use super::user_error;
use crate::output::Output;

/// List notes matching `filter`
pub async fn list(
    repo: &impl NotesRepository,
    config: &Config,
    filter: String,
    asc: bool,
    pages: usize,
    output: &Output,
) -> Result<()> {
    let order = if asc {
        SortOrder::Ascending
    } else {
        SortOrder::Descending
    };
    let query = NoteQuery::new(filter, order);
    let pager = Pager::new(PagerSettings::from_config(config));

    let window = load_pages(repo, &pager, &query, pages).await?;
    output.print_window(&window);
    Ok(())
}

/// Grow the pager `pages` times, stopping early once all matches are shown
async fn load_pages(
    repo: &impl NotesRepository,
    pager: &Pager,
    query: &NoteQuery,
    pages: usize,
) -> Result<Window> {
    let mut limit_rx = pager.subscribe();
    let mut window = repo.window(query, pager.limit()).map_err(user_error)?;

    for _ in 0..pages {
        if window.exhausted {
            break;
        }

        // The previous growth may still be clearing its in-flight flag
        while !pager.reached_end() {
            tokio::task::yield_now().await;
        }
        limit_rx
            .changed()
            .await
            .context("Pager stopped before the window grew")?;

        window = repo.window(query, pager.limit()).map_err(user_error)?;
    }

    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebatch_core::{MockRemoteSource, RecordStore, Repository, SyncSettings};
    use std::sync::Arc;
    use std::time::Duration;

    async fn synced_repo(count: usize) -> Repository {
        let store = RecordStore::open_in_memory().unwrap();
        let source = MockRemoteSource::new("p").with_latency(Duration::ZERO);
        let repo = Repository::new(store, Arc::new(source), SyncSettings::default());
        repo.sync(count).await.unwrap();
        repo
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_pages_grows_window() {
        let repo = synced_repo(120).await;
        let pager = Pager::default();
        let query = NoteQuery::default();

        let window = load_pages(&repo, &pager, &query, 0).await.unwrap();
        assert_eq!(window.notes.len(), 50);

        let window = load_pages(&repo, &pager, &query, 1).await.unwrap();
        assert_eq!(window.notes.len(), 100);
        assert_eq!(window.notes[0].id, "p-0");
        assert!(!window.exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_pages_stops_when_exhausted() {
        let repo = synced_repo(120).await;
        let pager = Pager::default();

        let window = load_pages(&repo, &pager, &NoteQuery::default(), 10)
            .await
            .unwrap();
        assert_eq!(window.notes.len(), 120);
        assert!(window.exhausted);
        assert_eq!(pager.limit(), 150);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_pages_with_filter_ascending() {
        let repo = synced_repo(120).await;
        let pager = Pager::default();
        let query = NoteQuery::new(" P NOTE 11", SortOrder::Ascending);

        let window = load_pages(&repo, &pager, &query, 3).await.unwrap();
        let ids: Vec<_> = window.notes.iter().map(|n| n.id.as_str()).collect();
        let expected = vec![
            "p-119", "p-118", "p-117", "p-116", "p-115", "p-114", "p-113", "p-112", "p-111",
            "p-110", "p-11",
        ];
        assert_eq!(ids, expected);
        assert_eq!(pager.limit(), 50);
    }
}
