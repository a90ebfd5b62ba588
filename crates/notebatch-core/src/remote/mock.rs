//! Deterministic mock feed

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{RemoteSource, TransportError};
use crate::config::Config;
use crate::models::RemoteNote;

/// Simulated latency of one fetch
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

/// Mock remote that produces `count` synthetic notes after a delay
///
/// Note `i` has id `"{prefix}-{i}"` and `created_at = anchor - i seconds`, so
/// the feed is newest first and identical for identical counts.
#[derive(Debug, Clone)]
pub struct MockRemoteSource {
    prefix: String,
    latency: Duration,
    anchor: DateTime<Utc>,
}

impl MockRemoteSource {
    /// Create a mock anchored at the current time
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            latency: DEFAULT_LATENCY,
            anchor: Utc::now(),
        }
    }

    /// Create a mock using the configured prefix and latency
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.remote_prefix.clone())
            .with_latency(Duration::from_millis(config.remote_latency_ms))
    }

    /// Set the simulated latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Pin the timestamp of note 0
    pub fn with_anchor(mut self, anchor: DateTime<Utc>) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn note(&self, index: usize) -> RemoteNote {
        RemoteNote {
            id: format!("{}-{}", self.prefix, index),
            title: format!("{} note {}", self.prefix, index),
            content: format!("{} content {}", self.prefix, index),
            created_at: self.anchor - chrono::Duration::seconds(index as i64),
        }
    }
}

impl Default for MockRemoteSource {
    fn default() -> Self {
        Self::new("mock")
    }
}

#[async_trait]
impl RemoteSource for MockRemoteSource {
    async fn fetch(&self, count: usize) -> Result<Vec<RemoteNote>, TransportError> {
        debug!("Mock remote fetching {} note(s)", count);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok((0..count).map(|i| self.note(i)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 16, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_shape() {
        let source = MockRemoteSource::new("p")
            .with_latency(Duration::ZERO)
            .with_anchor(anchor());

        let notes = source.fetch(3).await.unwrap();
        let ids: Vec<_> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["p-0", "p-1", "p-2"]);
        assert_eq!(notes[1].title, "p note 1");
        assert_eq!(notes[1].content, "p content 1");
        assert_eq!(notes[0].created_at, anchor());
        assert_eq!(notes[2].created_at, anchor() - chrono::Duration::seconds(2));
    }

    #[tokio::test]
    async fn test_created_at_strictly_decreasing() {
        let source = MockRemoteSource::default().with_latency(Duration::ZERO);
        let notes = source.fetch(50).await.unwrap();
        assert!(notes
            .windows(2)
            .all(|pair| pair[0].created_at - pair[1].created_at == chrono::Duration::seconds(1)));
    }

    #[tokio::test]
    async fn test_fetch_is_reproducible() {
        let source = MockRemoteSource::default().with_latency(Duration::ZERO);
        assert_eq!(source.fetch(10).await.unwrap(), source.fetch(10).await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_zero() {
        let source = MockRemoteSource::default().with_latency(Duration::ZERO);
        assert!(source.fetch(0).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_waits_for_latency() {
        let source = MockRemoteSource::default().with_latency(Duration::from_millis(500));
        let started = tokio::time::Instant::now();
        source.fetch(1).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
