//! Error types for consensus reduction.

use thiserror::Error;

/// Errors raised by the consensus engine.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// The collector holds no successful responses; the cycle should
    /// have been terminated as all-roles-failed before reaching the
    /// engine.
    #[error("No viable responses to reduce")]
    NoViableResponses,
}
