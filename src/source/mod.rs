//! Reading Sources
//!
//! The monitor's two external collaborators, plus the insert side used by
//! the agent simulator:
//!
//! - [`HistorySource`]: query the most recent readings, newest first
//! - [`LiveSource`]: push newly inserted readings into a channel until unsubscribed
//! - [`ReadingSink`]: insert a reading into the telemetry table
//!
//! Adapters:
//!
//! - [`MemoryTable`]: in-process table (tests, demo mode)
//! - [`RestTable`]: HTTP client for the hosted telemetry table
//! - [`PollingFeed`]: live source that polls an [`IncrementalSource`]

mod error;
mod memory;
mod polling;
mod rest;

pub use error::{SourceError, SourceResult};
pub use memory::MemoryTable;
pub use polling::PollingFeed;
pub use rest::{RestTable, TableConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::monitor::Reading;

/// Query-style access to recent readings
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch up to `limit` of the most recent readings, newest first
    async fn fetch_recent(&self, limit: usize) -> SourceResult<Vec<Reading>>;
}

/// Readings created strictly after a point in time, oldest first
#[async_trait]
pub trait IncrementalSource: Send + Sync {
    async fn fetch_since(&self, since: DateTime<Utc>) -> SourceResult<Vec<Reading>>;
}

/// Push-based delivery of newly inserted readings
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Start delivering new readings into `sink`, in arrival order
    ///
    /// Delivery stops when the returned [`Subscription`] is unsubscribed or
    /// dropped, or when the receiving side of `sink` is closed.
    async fn subscribe(&self, sink: mpsc::Sender<Reading>) -> SourceResult<Subscription>;
}

/// Insert side of the telemetry table
#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn insert(&self, reading: &Reading) -> SourceResult<()>;
}

/// Handle for an active live subscription
///
/// Owns the feed task. Dropping the handle cancels the feed.
#[derive(Debug)]
pub struct Subscription {
    name: String,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(name: impl Into<String>, task: JoinHandle<()>) -> Self {
        Self {
            name: name.into(),
            task: Some(task),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the feed task is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Cancel the feed and wait until it has been torn down
    pub async fn unsubscribe(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        tracing::debug!(subscription = %self.name, "Unsubscribed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unsubscribe_stops_task() {
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let subscription = Subscription::new("test", task);
        assert!(subscription.is_active());
        assert_eq!(subscription.name(), "test");

        subscription.unsubscribe().await;
    }

    #[tokio::test]
    async fn test_drop_aborts_task() {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(async move {
            let _tx = tx;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        drop(Subscription::new("test", task));

        // Sender is dropped once the aborted task is torn down
        assert!(rx.recv().await.is_none());
    }
}
