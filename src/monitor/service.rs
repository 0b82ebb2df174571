//! Monitor Service
//!
//! Runs a [`LivenessMonitor`] on a single task. Readings from the live source
//! are handed over through a bounded channel, the watchdog is a deadline the
//! task sleeps towards, and every change is published on a watch channel.
//!
//! ```text
//! LiveSource ──mpsc──┐
//!                    ├──► monitor task ──watch──► MonitorHandle::subscribe()
//! shutdown ──oneshot─┘        ▲
//!                             └── sleep_until(watchdog deadline)
//! ```
//!
//! Event precedence inside the task is shutdown, then readings, then the
//! watchdog. A reading that is ready at the same instant the watchdog
//! expires, or is handed over by a feed task woken at that instant, is
//! processed first and re-arms it.

use chrono::Utc;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::error::{MonitorError, MonitorResult};
use super::history::DEFAULT_HISTORY_CAPACITY;
use super::machine::LivenessMonitor;
use super::types::{LivenessState, MonitorSnapshot};
use crate::source::{HistorySource, LiveSource, Subscription};

/// Monitor tuning
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Silence after which the agent is considered offline (ms)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Readings kept in the history window
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Capacity of the live reading channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_timeout() -> u64 {
    5000 // 5 seconds
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout(),
            history_capacity: default_history_capacity(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl MonitorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Entry point for running a monitor against a pair of sources
pub struct MonitorService;

impl MonitorService {
    /// Spawn the monitor task
    ///
    /// The task subscribes to `live`, bootstraps from `history`, and then
    /// processes readings and watchdog expiries until stopped.
    pub fn start(
        config: MonitorConfig,
        history: Arc<dyn HistorySource>,
        live: Arc<dyn LiveSource>,
    ) -> MonitorHandle {
        let monitor = LivenessMonitor::new(config.timeout(), config.history_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(monitor.snapshot());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tracing::info!(
            timeout_ms = config.timeout_ms,
            history_capacity = config.history_capacity,
            "Starting liveness monitor"
        );

        let task = tokio::spawn(run(
            monitor,
            config,
            history,
            live,
            snapshot_tx,
            shutdown_rx,
        ));

        MonitorHandle {
            snapshots: snapshot_rx,
            running: Mutex::new(Some(Running {
                shutdown: shutdown_tx,
                task,
            })),
        }
    }
}

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Handle to a running monitor
///
/// Dropping the handle without calling [`MonitorHandle::stop`] aborts the task,
/// which still releases the live subscription.
pub struct MonitorHandle {
    snapshots: watch::Receiver<MonitorSnapshot>,
    running: Mutex<Option<Running>>,
}

impl MonitorHandle {
    /// Current snapshot
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Current liveness state
    pub fn state(&self) -> LivenessState {
        self.snapshots.borrow().state
    }

    /// Receiver notified after every monitor change
    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.snapshots.clone()
    }

    /// Whether the monitor task is still running
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|guard| {
                guard
                    .as_ref()
                    .map(|r| !r.task.is_finished())
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    /// Stop the monitor, release the live subscription and cancel the watchdog
    pub async fn stop(&self) -> MonitorResult<()> {
        let running = self
            .running
            .lock()
            .map_err(|_| MonitorError::Poisoned)?
            .take()
            .ok_or(MonitorError::AlreadyStopped)?;

        // The task may already have exited; a failed send is fine
        let _ = running.shutdown.send(());
        running.task.await?;

        tracing::info!("Liveness monitor stopped");
        Ok(())
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Ok(guard) = self.running.get_mut() {
            if let Some(running) = guard.take() {
                running.task.abort();
            }
        }
    }
}

/// Monitor task body
async fn run(
    mut monitor: LivenessMonitor,
    config: MonitorConfig,
    history: Arc<dyn HistorySource>,
    live: Arc<dyn LiveSource>,
    snapshots: watch::Sender<MonitorSnapshot>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let (reading_tx, mut reading_rx) = mpsc::channel(config.channel_capacity.max(1));

    // Subscribe before bootstrapping so inserts made during the history
    // fetch wait in the channel instead of being missed.
    let subscription = tokio::select! {
        biased;
        _ = &mut shutdown => {
            tracing::debug!("Shutdown before live subscription was established");
            return;
        }
        result = live.subscribe(reading_tx) => match result {
            Ok(subscription) => {
                tracing::info!(feed = %subscription.name(), "Live subscription established");
                Some(subscription)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Live subscription failed, relying on watchdog");
                None
            }
        }
    };

    let fetched = tokio::select! {
        biased;
        _ = &mut shutdown => {
            tracing::debug!("Shutdown during bootstrap");
            release(subscription).await;
            return;
        }
        result = history.fetch_recent(config.history_capacity) => result,
    };

    match fetched {
        Ok(readings) => {
            monitor.bootstrap(readings, Utc::now(), Instant::now());
        }
        Err(e) => {
            tracing::warn!(error = %e, "History fetch failed, treating as no recent data");
            monitor.bootstrap(Vec::new(), Utc::now(), Instant::now());
        }
    }
    tracing::info!(state = %monitor.state(), "Bootstrap complete");
    snapshots.send_replace(monitor.snapshot());

    let mut live_open = subscription.is_some();

    loop {
        let previous = monitor.state();
        let deadline = monitor.watchdog_deadline();

        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            reading = reading_rx.recv(), if live_open => match reading {
                Some(reading) => {
                    tracing::trace!(
                        temperature = reading.temperature,
                        vibration = reading.vibration,
                        is_anomaly = reading.is_anomaly,
                        "Reading arrived"
                    );
                    monitor.on_reading_arrived(reading, Instant::now());
                }
                None => {
                    live_open = false;
                    tracing::warn!("Live feed ended, relying on watchdog");
                    continue;
                }
            },
            _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                // Let feed tasks woken at the same instant hand over their readings
                tokio::task::yield_now().await;
                match reading_rx.try_recv() {
                    Ok(reading) => {
                        tracing::trace!("Reading arrived at the watchdog deadline");
                        monitor.on_reading_arrived(reading, Instant::now());
                    }
                    Err(_) => {
                        tracing::debug!(timeout_ms = config.timeout_ms, "Watchdog fired");
                        monitor.on_watchdog_fired();
                    }
                }
            }
        }

        if monitor.state() != previous {
            tracing::info!(from = %previous, to = %monitor.state(), "Liveness state changed");
        }
        snapshots.send_replace(monitor.snapshot());
    }

    release(subscription).await;
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn release(subscription: Option<Subscription>) {
    if let Some(subscription) = subscription {
        subscription.unsubscribe().await;
    }
}
