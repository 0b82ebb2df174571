//! In-memory telemetry table
//!
//! Holds rows in process, oldest first, and fans inserts out to live
//! subscribers through a tokio broadcast channel. Only the newest
//! 5000 rows are retained. Used by demo mode and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, RwLock};

use super::{
    HistorySource, IncrementalSource, LiveSource, ReadingSink, SourceResult, Subscription,
};
use crate::monitor::Reading;

const BROADCAST_CAPACITY: usize = 256;

/// Rows kept before the oldest are discarded
const MAX_ROWS: usize = 5000;

/// In-process telemetry table
pub struct MemoryTable {
    rows: RwLock<Vec<Reading>>,
    inserts: broadcast::Sender<Reading>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    /// Create a table pre-populated with rows (no live notifications are sent)
    pub fn with_rows(mut rows: Vec<Reading>) -> Self {
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        trim_oldest(&mut rows);

        let (inserts, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            rows: RwLock::new(rows),
            inserts,
        }
    }

    /// Insert a row and notify live subscribers
    pub async fn insert_reading(&self, reading: Reading) {
        {
            let mut rows = self.rows.write().await;
            // Usually lands at the end; rows stay ordered by timestamp
            let at = rows.partition_point(|r| r.timestamp <= reading.timestamp);
            rows.insert(at, reading.clone());
            trim_oldest(&mut rows);
        }
        // No subscribers is fine
        let _ = self.inserts.send(reading);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Number of live subscriptions currently attached
    pub fn subscriber_count(&self) -> usize {
        self.inserts.receiver_count()
    }
}

fn trim_oldest(rows: &mut Vec<Reading>) {
    if rows.len() > MAX_ROWS {
        let excess = rows.len() - MAX_ROWS;
        rows.drain(..excess);
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistorySource for MemoryTable {
    async fn fetch_recent(&self, limit: usize) -> SourceResult<Vec<Reading>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl IncrementalSource for MemoryTable {
    async fn fetch_since(&self, since: DateTime<Utc>) -> SourceResult<Vec<Reading>> {
        let rows = self.rows.read().await;
        let start = rows.partition_point(|r| r.timestamp <= since);
        Ok(rows[start..].to_vec())
    }
}

#[async_trait]
impl LiveSource for MemoryTable {
    async fn subscribe(&self, sink: mpsc::Sender<Reading>) -> SourceResult<Subscription> {
        let mut receiver = self.inserts.subscribe();

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(reading) => {
                        if sink.send(reading).await.is_err() {
                            tracing::debug!("Live sink closed, stopping memory feed");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Memory feed lagged, readings dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new("memory", task))
    }
}

#[async_trait]
impl ReadingSink for MemoryTable {
    async fn insert(&self, reading: &Reading) -> SourceResult<()> {
        self.insert_reading(reading.clone()).await;
        Ok(())
    }
}
