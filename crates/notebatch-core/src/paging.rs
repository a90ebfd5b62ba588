//! Windowed queries for incremental list rendering
//!
//! A list shows the first `limit` notes matching a filter in sort order. When
//! the consumer reaches the end of the visible window it calls
//! [`Pager::reached_end`]; the limit then grows by one page after a short
//! throttle. Signals arriving while a growth is pending are dropped, which
//! bounds how fast the window can grow no matter how quickly the list renders.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::Note;
use crate::storage::{Predicate, Query, RecordStore, SortOrder, StorageResult};

/// Notes added to the window per growth step
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Delay before a growth step is applied
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(200);

/// What the list is showing: a text filter and a sort direction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteQuery {
    /// Substring matched against title or content; blank matches all
    pub filter: String,
    pub order: SortOrder,
}

impl NoteQuery {
    pub fn new(filter: impl Into<String>, order: SortOrder) -> Self {
        Self {
            filter: filter.into(),
            order,
        }
    }

    /// Build the store query for the first `limit` matches
    pub fn to_query(&self, limit: usize) -> Query {
        Query::new()
            .filter(Predicate::text_search(&self.filter))
            .order(self.order)
            .limit(limit)
    }
}

/// The visible slice of a sorted, filtered note list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window {
    pub notes: Vec<Note>,
    pub limit: usize,
    /// No matches exist beyond this window
    pub exhausted: bool,
}

/// Fetch the first `limit` notes matching `query`
///
/// A limit larger than the number of matches returns every match.
pub fn fetch_window(store: &RecordStore, query: &NoteQuery, limit: usize) -> StorageResult<Window> {
    let mut notes = store.scan(&query.to_query(limit.saturating_add(1)))?;
    let exhausted = notes.len() <= limit;
    notes.truncate(limit);
    Ok(Window {
        notes,
        limit,
        exhausted,
    })
}

/// Page size and throttle for a [`Pager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagerSettings {
    pub page_size: usize,
    pub throttle: Duration,
}

impl PagerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            throttle: Duration::from_millis(config.throttle_ms),
        }
    }
}

impl Default for PagerSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            throttle: DEFAULT_THROTTLE,
        }
    }
}

/// Debounced window limit for one list
///
/// Cheap to clone; clones share state. Growth is scheduled on the current
/// tokio runtime.
#[derive(Clone)]
pub struct Pager {
    inner: Arc<PagerInner>,
}

struct PagerInner {
    settings: PagerSettings,
    limit: watch::Sender<usize>,
    loading: AtomicBool,
    /// Bumped by `reset` so stale growth steps are discarded
    generation: AtomicU64,
}

impl Pager {
    pub fn new(settings: PagerSettings) -> Self {
        let (limit, _) = watch::channel(settings.page_size);
        Self {
            inner: Arc::new(PagerInner {
                settings,
                limit,
                loading: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Current window limit
    pub fn limit(&self) -> usize {
        *self.inner.limit.borrow()
    }

    pub fn settings(&self) -> PagerSettings {
        self.inner.settings
    }

    /// True while a growth step is pending
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    /// Subscribe to limit changes
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.inner.limit.subscribe()
    }

    /// Signal that the end of the visible window was reached
    ///
    /// Returns true when this call scheduled a growth step, false when one
    /// was already pending or no tokio runtime is available.
    pub fn reached_end(&self) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("End-of-window signal outside a tokio runtime, window not grown");
            return false;
        };

        if self
            .inner
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Growth already pending, ignoring end-of-window signal");
            return false;
        }

        let inner = Arc::clone(&self.inner);
        let generation = inner.generation.load(Ordering::Acquire);
        debug!("Scheduling window growth in {:?}", inner.settings.throttle);

        runtime.spawn(async move {
            tokio::time::sleep(inner.settings.throttle).await;
            if inner.generation.load(Ordering::Acquire) == generation {
                let step = inner.settings.page_size;
                inner.limit.send_modify(|limit| *limit = limit.saturating_add(step));
            }
            inner.loading.store(false, Ordering::Release);
        });
        true
    }

    /// Shrink back to one page (after the filter or sort order changed)
    pub fn reset(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        let page_size = self.inner.settings.page_size;
        self.inner.limit.send_if_modified(|limit| {
            let changed = *limit != page_size;
            *limit = page_size;
            changed
        });
    }

    /// Fetch the window at the current limit
    pub fn window(&self, store: &RecordStore, query: &NoteQuery) -> StorageResult<Window> {
        fetch_window(store, query, self.limit())
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(PagerSettings::default())
    }
}
