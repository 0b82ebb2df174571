//! Monitor error types

use thiserror::Error;

/// Errors surfaced by the monitor handle
///
/// Source failures never appear here: they are absorbed by the monitor task
/// and show up as an `Offline` state instead.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// `stop` was called on a monitor that is not running
    #[error("Monitor already stopped")]
    AlreadyStopped,

    /// Monitor task panicked or was cancelled
    #[error("Monitor task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Internal lock poisoned
    #[error("Monitor handle lock poisoned")]
    Poisoned,
}

/// Result type alias for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;
