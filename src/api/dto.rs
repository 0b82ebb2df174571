//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monitor::{LivenessState, MonitorSnapshot, Reading};

// ============================================
// STATUS DTOs
// ============================================

/// Current liveness summary, shaped for a status card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    /// Liveness state: offline, nominal or anomaly
    pub state: LivenessState,
    /// Badge label ("DISCONNECTED" while offline)
    pub label: String,
    /// Latest temperature, one decimal; absent while offline
    pub temperature: Option<String>,
    /// Latest vibration, two decimals; absent while offline
    pub vibration: Option<String>,
    /// Timestamp of the last reading that affected liveness
    pub last_seen: Option<DateTime<Utc>>,
    /// Whether a watchdog deadline is pending
    pub watchdog_armed: bool,
    /// Whether the initial history load has completed
    pub bootstrapped: bool,
}

impl StatusResponse {
    pub fn from_snapshot(snapshot: &MonitorSnapshot) -> Self {
        let visible = snapshot
            .latest
            .as_ref()
            .filter(|_| snapshot.state.is_online());

        Self {
            state: snapshot.state,
            label: snapshot.state.label().to_string(),
            temperature: visible.map(Reading::display_temperature),
            vibration: visible.map(Reading::display_vibration),
            last_seen: snapshot.last_seen,
            watchdog_armed: snapshot.watchdog_armed,
            bootstrapped: snapshot.bootstrapped,
        }
    }
}

// ============================================
// HISTORY DTOs
// ============================================

/// History query parameters
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Return only the newest N readings (still oldest first)
    #[serde(default)]
    pub limit: Option<usize>,
}

/// History window response
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Current liveness state
    pub state: LivenessState,
    /// Number of readings returned
    pub count: usize,
    /// Readings, oldest first
    pub readings: Vec<Reading>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: healthy or degraded
    pub status: String,
    /// Whether the monitor task is running
    pub monitor_running: bool,
    /// Current liveness state
    pub liveness: LivenessState,
    /// Open WebSocket connections
    pub ws_connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Crate version
    pub version: String,
}
