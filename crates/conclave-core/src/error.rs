//! Error types for council construction and control operations.

use thiserror::Error;

use conclave_monitor::MonitorError;
use conclave_registry::RegistryError;

/// Errors from building or controlling a council.
///
/// Cycle-level failures (rejected input, failed roles, integrity
/// violations) are NOT errors - they are [`crate::CycleOutcome`]
/// variants, because a cycle that ends that way still ran to a
/// well-defined terminal state.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// The role set failed validation.
    #[error("invalid role configuration: {0}")]
    InvalidRoles(#[from] RegistryError),

    /// The integrity monitor configuration was out of range.
    #[error("invalid monitor configuration: {0}")]
    InvalidMonitor(#[from] MonitorError),
}
