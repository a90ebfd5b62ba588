//! Remote note source
//!
//! A remote source delivers a batch of candidate notes. Real implementations
//! talk to a server; [`MockRemoteSource`] synthesises a deterministic feed.
//!
//! ## Usage
//!
//! ```ignore
//! let source = MockRemoteSource::new("mock");
//! let notes = source.fetch(500).await?;
//! ```

mod mock;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::RemoteNote;

pub use mock::MockRemoteSource;

/// Errors a remote fetch can produce
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The fetch did not complete in time
    #[error("Remote fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The remote answered with something that is not a note batch
    #[error("Invalid payload from remote: {0}")]
    InvalidPayload(String),
}

/// A source of remote notes
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch up to `count` notes
    async fn fetch(&self, count: usize) -> Result<Vec<RemoteNote>, TransportError>;
}
