//! # Sentinel
//!
//! Telemetry liveness monitor for remote IoT anomaly-detection agents.
//!
//! A field agent periodically inserts temperature/vibration readings into a
//! shared telemetry table. Sentinel watches that table and derives a
//! three-state indicator: **Offline** when nothing has arrived within the
//! timeout window, otherwise **Nominal** or **Anomaly** per the latest
//! reading's flag.
//!
//! ## Features
//!
//! - **Watchdog liveness**: silence is treated as failure, not as "no change"
//! - **Bounded history**: the most recent readings for display
//! - **Pluggable sources**: in-memory table or a hosted REST table with polling
//! - **Dashboard API**: JSON status and history endpoints plus a WebSocket feed
//! - **Agent simulator**: generates and scores readings for demos and tests
//!
//! ## Modules
//!
//! - [`monitor`]: Liveness state machine and its async driver
//! - [`source`]: Reading sources and sinks
//! - [`api`]: REST API server with Axum
//! - [`websocket`]: Snapshot streaming to dashboard clients
//! - [`agent`]: Simulated field agent
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sentinel::monitor::{MonitorConfig, MonitorService, Reading};
//! use sentinel::source::{HistorySource, LiveSource, MemoryTable};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let table = Arc::new(MemoryTable::new());
//!     let monitor = MonitorService::start(
//!         MonitorConfig::default(),
//!         Arc::clone(&table) as Arc<dyn HistorySource>,
//!         Arc::clone(&table) as Arc<dyn LiveSource>,
//!     );
//!
//!     table.insert_reading(Reading::new(45.2, 0.21, false)).await;
//!
//!     let mut snapshots = monitor.subscribe();
//!     snapshots.changed().await?;
//!     println!("state: {}", snapshots.borrow().state);
//!
//!     monitor.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod monitor;
pub mod source;
pub mod websocket;

// Re-export top-level types for convenience
pub use monitor::{
    HistoryWindow, LivenessMonitor, LivenessState, MonitorConfig, MonitorError, MonitorHandle,
    MonitorResult, MonitorService, MonitorSnapshot, Reading, Watchdog,
};

pub use source::{
    HistorySource, IncrementalSource, LiveSource, MemoryTable, PollingFeed, ReadingSink,
    RestTable, SourceError, SourceResult, Subscription, TableConfig,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use websocket::{websocket_handler, ClientMessage, ServerMessage};

pub use agent::{Agent, AgentConfig, AgentError, AgentStats};

pub use config::{Config, ConfigError, LoggingConfig};
