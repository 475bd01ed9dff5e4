//! # Conclave Core
//!
//! The Council Invocation State Machine: several independent AI roles
//! answer the same query in parallel and their answers are reduced to
//! one governed output through a deterministic lifecycle.
//!
//! ## Lifecycle
//!
//! ```text
//!  IDLE ──▶ ASSEMBLING ──▶ DELIBERATING ──▶ CONSENSUS ──▶ OUTPUT ──▶ LOGGED ──▶ IDLE
//!                │              │ ▲              │
//!                │              ▼ │ (deliberative│ loop, depth-capped)
//!                │              ───              │
//!                └──────────────┴────────────────┴───▶ LOGGED (terminal rejection)
//! ```
//!
//! Transitions are monotonic forward except the bounded
//! DELIBERATING loop. Every path, including every fault, passes
//! through LOGGED - the machine never stalls in a non-terminal state
//! and [`Council::submit`] never raises: terminal conditions come back
//! as a populated [`CycleOutcome`] on the [`CouncilResult`].
//!
//! ## Components
//!
//! | Stage | Component | Crate |
//! |-------|-----------|-------|
//! | Input/output screening | Security Gate | `conclave-gate` |
//! | Role snapshot | Role Registry | `conclave-registry` |
//! | Fan-out / join barrier | Dispatcher | `conclave-consensus` |
//! | Divergence, recursion cap | Integrity Monitor | `conclave-monitor` |
//! | Reduction | Consensus Engine | `conclave-consensus` |
//! | Lifecycle | [`Council`] | this crate |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conclave_core::{Council, CouncilConfig};
//! use std::sync::Arc;
//!
//! let config = CouncilConfig::standard_council();
//! let council = Council::new(config, Arc::new(backend))?;
//!
//! let result = council.submit("What is the capital of France?").await;
//! if let Some(answer) = &result.final_response {
//!     println!("{answer}");
//! }
//! assert!(result.state_trace.ends_logged());
//! ```

mod config;
mod council;
mod error;
mod result;
mod state;

pub use config::{CouncilConfig, RoleConfig, SecurityConfig};
pub use council::Council;
pub use error::CouncilError;
pub use result::{CouncilResult, CouncilStatus, CycleOutcome, CycleSink, CycleSummary, LogRecord};
pub use state::{CouncilState, StateTrace, TraceEntry};

// Re-export the seam types callers need to drive a council.
pub use conclave_consensus::{
    AgentBackend, BackendError, BackendReply, ConsensusMode, RoleOutcome, RoleResponse,
};
pub use conclave_registry::Role;

/// Result type for council construction and reconfiguration.
pub type Result<T> = std::result::Result<T, CouncilError>;
