//! Liveness state machine
//!
//! Pure, synchronous core of the monitor. All time is passed in by the
//! caller, which keeps the transitions deterministic and testable without
//! a runtime. The async driver in [`super::service`] owns one instance.
//!
//! ```text
//! Offline|Nominal|Anomaly --(reading, !is_anomaly)--> Nominal
//! Offline|Nominal|Anomaly --(reading,  is_anomaly)--> Anomaly
//! Nominal|Anomaly         --(watchdog expiry)-------> Offline
//! ```

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

use super::history::HistoryWindow;
use super::types::{LivenessState, MonitorSnapshot, Reading};
use super::watchdog::Watchdog;

/// Derives liveness from an intermittent stream of readings
#[derive(Debug)]
pub struct LivenessMonitor {
    state: LivenessState,
    history: HistoryWindow,
    watchdog: Watchdog,
    timeout: Duration,
    last_seen: Option<DateTime<Utc>>,
    bootstrapped: bool,
}

impl LivenessMonitor {
    /// Create a monitor in the `Offline` state with no pending watchdog
    pub fn new(timeout: Duration, history_capacity: usize) -> Self {
        Self {
            state: LivenessState::Offline,
            history: HistoryWindow::new(history_capacity),
            watchdog: Watchdog::new(),
            timeout,
            last_seen: None,
            bootstrapped: false,
        }
    }

    /// Load the initial history
    ///
    /// `newest_first` is the history query result, newest reading first.
    /// Only the newest reading decides the initial state: if it is younger
    /// than the timeout, its anomaly flag is adopted and the watchdog is armed
    /// to expire `timeout` after that reading's timestamp. Otherwise the
    /// monitor is `Offline` with no watchdog. An empty history changes nothing.
    pub fn bootstrap(
        &mut self,
        newest_first: Vec<Reading>,
        wall_now: DateTime<Utc>,
        now: Instant,
    ) -> LivenessState {
        self.bootstrapped = true;

        let Some(newest) = newest_first.first() else {
            tracing::debug!("Bootstrap with empty history");
            return self.state;
        };

        let age = newest.age(wall_now);
        self.last_seen = Some(newest.timestamp);

        if age < self.timeout {
            self.state = LivenessState::from_anomaly_flag(newest.is_anomaly);
            self.watchdog.arm_at(now + (self.timeout - age));
        } else {
            self.state = LivenessState::Offline;
            self.watchdog.disarm();
        }

        tracing::debug!(
            readings = newest_first.len(),
            newest_age_ms = age.as_millis() as u64,
            state = %self.state,
            "Bootstrapped history"
        );

        self.history.replace_newest_first(newest_first);
        self.state
    }

    /// Handle a newly delivered reading
    ///
    /// Always re-arms the watchdog from `now`, adopts the reading's anomaly
    /// flag, and appends it to the history window.
    pub fn on_reading_arrived(&mut self, reading: Reading, now: Instant) -> LivenessState {
        self.watchdog.arm(now, self.timeout);
        self.state = LivenessState::from_anomaly_flag(reading.is_anomaly);
        self.last_seen = Some(reading.timestamp);

        if let Some(evicted) = self.history.push(reading) {
            tracing::trace!(evicted = %evicted.timestamp, "History window full, evicted oldest");
        }

        self.state
    }

    /// Handle watchdog expiry: no reading arrived within the timeout
    ///
    /// History is retained; only the classification changes.
    pub fn on_watchdog_fired(&mut self) -> LivenessState {
        self.watchdog.disarm();
        self.state = LivenessState::Offline;
        self.state
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    /// Pending watchdog deadline, if armed
    pub fn watchdog_deadline(&self) -> Option<Instant> {
        self.watchdog.deadline()
    }

    /// Build a snapshot for publishing
    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            state: self.state,
            latest: self.history.latest().cloned(),
            last_seen: self.last_seen,
            history: self.history.to_vec(),
            watchdog_armed: self.watchdog.is_armed(),
            bootstrapped: self.bootstrapped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn monitor() -> LivenessMonitor {
        LivenessMonitor::new(TIMEOUT, 20)
    }

    fn reading_at(timestamp: DateTime<Utc>, is_anomaly: bool) -> Reading {
        Reading::with_timestamp(timestamp, 45.0, 0.2, is_anomaly)
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    #[test]
    fn test_initial_state_offline() {
        let monitor = monitor();
        assert_eq!(monitor.state(), LivenessState::Offline);
        assert!(monitor.watchdog_deadline().is_none());
        assert!(!monitor.snapshot().bootstrapped);
    }

    #[test]
    fn test_bootstrap_empty_history() {
        let mut monitor = monitor();
        let state = monitor.bootstrap(Vec::new(), Utc::now(), Instant::now());

        assert_eq!(state, LivenessState::Offline);
        assert!(monitor.watchdog_deadline().is_none());
        assert!(monitor.history().is_empty());
        assert!(monitor.snapshot().bootstrapped);
    }

    #[test]
    fn test_bootstrap_stale_history_is_offline() {
        let wall_now = Utc::now();
        for age in [5, 6, 60, 3600] {
            let mut monitor = monitor();
            let history = vec![
                reading_at(wall_now - secs(age), false),
                reading_at(wall_now - secs(age + 2), true),
            ];

            let state = monitor.bootstrap(history, wall_now, Instant::now());

            assert_eq!(state, LivenessState::Offline, "age {}s", age);
            assert!(monitor.watchdog_deadline().is_none());
            assert_eq!(monitor.history().len(), 2);
        }
    }

    #[test]
    fn test_bootstrap_fresh_nominal() {
        let wall_now = Utc::now();
        let now = Instant::now();
        let mut monitor = monitor();

        let state = monitor.bootstrap(vec![reading_at(wall_now - secs(2), false)], wall_now, now);

        assert_eq!(state, LivenessState::Nominal);
        // Anchored at the reading's timestamp: 5s - 2s of age
        assert_eq!(monitor.watchdog_deadline(), Some(now + Duration::from_secs(3)));
    }

    #[test]
    fn test_bootstrap_fresh_anomaly() {
        let wall_now = Utc::now();
        let mut monitor = monitor();

        let state = monitor.bootstrap(
            vec![reading_at(wall_now - secs(1), true)],
            wall_now,
            Instant::now(),
        );

        assert_eq!(state, LivenessState::Anomaly);
        assert!(monitor.watchdog_deadline().is_some());
    }

    #[test]
    fn test_bootstrap_only_newest_reading_gates_state() {
        let wall_now = Utc::now();
        let mut monitor = monitor();

        // Older readings are anomalous and stale, newest is fresh and nominal
        let history = vec![
            reading_at(wall_now - secs(1), false),
            reading_at(wall_now - secs(300), true),
            reading_at(wall_now - secs(600), true),
        ];
        let state = monitor.bootstrap(history, wall_now, Instant::now());

        assert_eq!(state, LivenessState::Nominal);
        let temps: Vec<_> = monitor.history().iter().map(|r| r.timestamp).collect();
        assert_eq!(
            temps,
            vec![wall_now - secs(600), wall_now - secs(300), wall_now - secs(1)]
        );
    }

    #[test]
    fn test_bootstrap_future_timestamp_counts_as_fresh() {
        let wall_now = Utc::now();
        let now = Instant::now();
        let mut monitor = monitor();

        let state = monitor.bootstrap(vec![reading_at(wall_now + secs(30), false)], wall_now, now);

        assert_eq!(state, LivenessState::Nominal);
        assert_eq!(monitor.watchdog_deadline(), Some(now + TIMEOUT));
    }

    #[test]
    fn test_nth_arrival_decides_state() {
        let now = Instant::now();
        let mut monitor = monitor();
        let flags = [false, true, true, false, true, false, false];

        for (i, flag) in flags.iter().enumerate() {
            let state = monitor.on_reading_arrived(
                Reading::new(45.0, 0.2, *flag),
                now + Duration::from_millis(i as u64 * 100),
            );
            assert_eq!(state, LivenessState::from_anomaly_flag(*flag));
        }
    }

    #[test]
    fn test_arrival_rearms_from_receipt_time() {
        let now = Instant::now();
        let mut monitor = monitor();

        monitor.on_reading_arrived(Reading::new(45.0, 0.2, false), now);
        assert_eq!(monitor.watchdog_deadline(), Some(now + TIMEOUT));

        let later = now + Duration::from_secs(4);
        monitor.on_reading_arrived(Reading::new(45.0, 0.2, false), later);
        assert_eq!(monitor.watchdog_deadline(), Some(later + TIMEOUT));
    }

    #[test]
    fn test_arrival_at_deadline_wins() {
        let now = Instant::now();
        let mut monitor = monitor();
        monitor.on_reading_arrived(Reading::new(45.0, 0.2, false), now);

        let deadline = monitor.watchdog_deadline().unwrap();
        let state = monitor.on_reading_arrived(Reading::new(45.0, 0.2, true), deadline);

        assert_eq!(state, LivenessState::Anomaly);
        assert_eq!(monitor.watchdog_deadline(), Some(deadline + TIMEOUT));
    }

    #[test]
    fn test_watchdog_fired_goes_offline_and_keeps_history() {
        let now = Instant::now();
        let mut monitor = monitor();
        monitor.on_reading_arrived(Reading::new(45.0, 0.2, true), now);
        monitor.on_reading_arrived(Reading::new(46.0, 0.3, true), now);

        let state = monitor.on_watchdog_fired();

        assert_eq!(state, LivenessState::Offline);
        assert!(monitor.watchdog_deadline().is_none());
        assert_eq!(monitor.history().len(), 2);
        assert_eq!(monitor.snapshot().latest.unwrap().temperature, 46.0);
    }

    #[test]
    fn test_offline_until_next_arrival() {
        let now = Instant::now();
        let mut monitor = monitor();
        monitor.on_reading_arrived(Reading::new(45.0, 0.2, false), now);
        monitor.on_watchdog_fired();
        assert_eq!(monitor.state(), LivenessState::Offline);

        let state = monitor.on_reading_arrived(
            Reading::new(45.0, 0.2, false),
            now + Duration::from_secs(30),
        );
        assert_eq!(state, LivenessState::Nominal);
    }

    #[test]
    fn test_arrivals_bound_history() {
        let now = Instant::now();
        let mut monitor = monitor();
        for i in 0..25 {
            monitor.on_reading_arrived(Reading::new(i as f64, 0.2, false), now);
        }

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.history.len(), 20);
        assert_eq!(snapshot.history[0].temperature, 5.0);
        assert_eq!(snapshot.history[19].temperature, 24.0);
    }
}
