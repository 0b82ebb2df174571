//! Telemetry Liveness Monitor
//!
//! Derives a three-state health indicator from an intermittent stream of
//! readings:
//!
//! - **Offline**: no reading within the timeout window ("no news is bad news")
//! - **Nominal**: latest reading was healthy
//! - **Anomaly**: latest reading was flagged by the agent
//!
//! # Components
//!
//! - **types**: `Reading`, `LivenessState`, `MonitorSnapshot`
//! - **history**: Bounded FIFO of recent readings for display
//! - **watchdog**: Re-armable deadline
//! - **machine**: Pure state machine (`bootstrap`, `on_reading_arrived`, `on_watchdog_fired`)
//! - **service**: Single-task async driver with start/stop lifecycle
//!
//! # Example
//!
//! ```rust,no_run
//! use sentinel::monitor::{MonitorConfig, MonitorService};
//! use sentinel::source::{HistorySource, LiveSource, MemoryTable};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let table = Arc::new(MemoryTable::new());
//!     let handle = MonitorService::start(
//!         MonitorConfig::default(),
//!         Arc::clone(&table) as Arc<dyn HistorySource>,
//!         Arc::clone(&table) as Arc<dyn LiveSource>,
//!     );
//!
//!     println!("state: {}", handle.state());
//!     handle.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod history;
pub mod machine;
pub mod service;
pub mod types;
pub mod watchdog;

pub use error::{MonitorError, MonitorResult};
pub use history::{HistoryWindow, DEFAULT_HISTORY_CAPACITY};
pub use machine::LivenessMonitor;
pub use service::{MonitorConfig, MonitorHandle, MonitorService};
pub use types::{LivenessState, MonitorSnapshot, Reading};
pub use watchdog::Watchdog;
