//! Polling live feed
//!
//! Turns any [`IncrementalSource`] into a [`LiveSource`] by asking for rows
//! newer than the last one seen on a fixed interval.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{HistorySource, IncrementalSource, LiveSource, SourceResult, Subscription};
use crate::monitor::Reading;

/// Live source backed by periodic incremental queries
pub struct PollingFeed<S> {
    source: Arc<S>,
    interval: Duration,
}

impl<S> PollingFeed<S>
where
    S: HistorySource + IncrementalSource + 'static,
{
    pub fn new(source: Arc<S>, interval: Duration) -> Self {
        Self { source, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl<S> LiveSource for PollingFeed<S>
where
    S: HistorySource + IncrementalSource + 'static,
{
    async fn subscribe(&self, sink: mpsc::Sender<Reading>) -> SourceResult<Subscription> {
        // Start from the newest existing row so only later inserts are delivered.
        // Falls back to the local clock when the table is empty or unreachable.
        let mut cursor = match self.source.fetch_recent(1).await {
            Ok(rows) => rows.first().map(|r| r.timestamp).unwrap_or_else(Utc::now),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read feed cursor, starting from now");
                Utc::now()
            }
        };

        let source = Arc::clone(&self.source);
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let rows = match source.fetch_since(cursor).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        tracing::warn!(error = %e, "Live poll failed, retrying next tick");
                        continue;
                    }
                };

                for reading in rows {
                    if reading.timestamp > cursor {
                        cursor = reading.timestamp;
                    }
                    if sink.send(reading).await.is_err() {
                        tracing::debug!("Live sink closed, stopping polling feed");
                        return;
                    }
                }
            }
        });

        Ok(Subscription::new("polling", task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryTable;
    use chrono::Duration as ChronoDuration;

    #[tokio::test(start_paused = true)]
    async fn test_polling_delivers_only_new_rows() {
        let now = Utc::now();
        let table = Arc::new(MemoryTable::with_rows(vec![Reading::with_timestamp(
            now - ChronoDuration::seconds(10),
            40.0,
            0.1,
            false,
        )]));
        let feed = PollingFeed::new(Arc::clone(&table), Duration::from_secs(1));
        assert_eq!(feed.interval(), Duration::from_secs(1));

        let (tx, mut rx) = mpsc::channel(8);
        let subscription = feed.subscribe(tx).await.unwrap();

        table
            .insert_reading(Reading::with_timestamp(now, 45.0, 0.2, false))
            .await;
        table
            .insert_reading(Reading::with_timestamp(
                now + ChronoDuration::milliseconds(1),
                46.0,
                0.2,
                true,
            ))
            .await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.temperature, 45.0);
        assert_eq!(second.temperature, 46.0);

        // Nothing new: the next polls deliver nothing
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());

        subscription.unsubscribe().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_stops_when_sink_closed() {
        let table = Arc::new(MemoryTable::new());
        let feed = PollingFeed::new(Arc::clone(&table), Duration::from_millis(100));

        let (tx, rx) = mpsc::channel(1);
        let subscription = feed.subscribe(tx).await.unwrap();
        drop(rx);

        table
            .insert_reading(Reading::with_timestamp(
                Utc::now() + ChronoDuration::seconds(1),
                45.0,
                0.2,
                false,
            ))
            .await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!subscription.is_active());
    }
}
