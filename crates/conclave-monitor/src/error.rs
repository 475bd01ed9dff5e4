//! Error types for the Integrity Monitor.

use thiserror::Error;

/// Errors raised when constructing a monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Divergence ceiling outside [0, 1].
    #[error("Divergence ceiling {0} must be in [0, 1]")]
    InvalidCeiling(f64),
}
