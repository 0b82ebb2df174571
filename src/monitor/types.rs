//! Core data types for the liveness monitor
//!
//! - `Reading`: A single telemetry sample as stored in the telemetry table
//! - `LivenessState`: The derived connectivity/health classification
//! - `MonitorSnapshot`: A point-in-time view of the monitor for readers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single telemetry sample produced by a field agent
///
/// Field names follow the telemetry table's row shape, so rows fetched from
/// the table service deserialize directly into this type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// When the row was created
    #[serde(rename = "created_at")]
    pub timestamp: DateTime<Utc>,
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Vibration in G
    pub vibration: f64,
    /// Whether the producing agent classified this sample as anomalous
    pub is_anomaly: bool,
    /// Anomaly score computed by the agent, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,
}

impl Reading {
    /// Create a reading stamped with the current time
    pub fn new(temperature: f64, vibration: f64, is_anomaly: bool) -> Self {
        Self::with_timestamp(Utc::now(), temperature, vibration, is_anomaly)
    }

    /// Create a reading with a specific timestamp
    pub fn with_timestamp(
        timestamp: DateTime<Utc>,
        temperature: f64,
        vibration: f64,
        is_anomaly: bool,
    ) -> Self {
        Self {
            timestamp,
            temperature,
            vibration,
            is_anomaly,
            anomaly_score: None,
        }
    }

    /// Builder method: attach an anomaly score
    pub fn score(mut self, score: f64) -> Self {
        self.anomaly_score = Some(score);
        self
    }

    /// Age of this reading relative to `now`
    ///
    /// Readings stamped in the future (clock skew between agent and host)
    /// are treated as brand new.
    pub fn age(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.timestamp).to_std().unwrap_or_default()
    }

    /// Temperature formatted for display (one decimal)
    pub fn display_temperature(&self) -> String {
        format!("{:.1}", self.temperature)
    }

    /// Vibration formatted for display (two decimals)
    pub fn display_vibration(&self) -> String {
        format!("{:.2}", self.vibration)
    }
}

/// Connectivity/health classification derived from the reading stream
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LivenessState {
    /// No reading within the timeout window
    #[default]
    Offline,
    /// Latest reading was not anomalous
    Nominal,
    /// Latest reading was flagged as an anomaly
    Anomaly,
}

impl LivenessState {
    /// State implied by a freshly received reading
    pub fn from_anomaly_flag(is_anomaly: bool) -> Self {
        if is_anomaly {
            LivenessState::Anomaly
        } else {
            LivenessState::Nominal
        }
    }

    /// Whether the agent is currently considered connected
    pub fn is_online(&self) -> bool {
        !matches!(self, LivenessState::Offline)
    }

    /// Status badge label shown on dashboards
    pub fn label(&self) -> &'static str {
        match self {
            LivenessState::Offline => "DISCONNECTED",
            LivenessState::Nominal => "NOMINAL",
            LivenessState::Anomaly => "ANOMALY",
        }
    }
}

impl std::fmt::Display for LivenessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LivenessState::Offline => write!(f, "offline"),
            LivenessState::Nominal => write!(f, "nominal"),
            LivenessState::Anomaly => write!(f, "anomaly"),
        }
    }
}

/// Point-in-time view of the monitor, published after every change
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorSnapshot {
    /// Current liveness classification
    pub state: LivenessState,
    /// Most recent reading in the history window
    pub latest: Option<Reading>,
    /// Timestamp of the last reading that affected liveness
    pub last_seen: Option<DateTime<Utc>>,
    /// History window, oldest first
    pub history: Vec<Reading>,
    /// Whether a watchdog deadline is pending
    pub watchdog_armed: bool,
    /// Whether the initial history load has completed (successfully or not)
    pub bootstrapped: bool,
}
