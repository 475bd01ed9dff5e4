//! # Consensus
//!
//! Parallel role invocation and reduction of heterogeneous responses to
//! one governed output.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`AgentBackend`] | Opaque seam to the model side: role + prompt in, text + confidence out |
//! | [`Dispatcher`] | Fans a query out to every enabled role, joins when all are terminal |
//! | [`ResponseCollector`] | Per-cycle table of role outcomes |
//! | [`ConsensusEngine`] | Five deterministic reduction strategies |
//!
//! ## Concurrency Model
//!
//! Each role invocation is an independent task on the shared tokio
//! runtime; the runtime's worker threads persist across cycles, so no
//! threads are spawned per call. There is deliberately **no per-call
//! timeout** - roles may think arbitrarily long. The only blocking
//! point is the dispatcher's join barrier, and the only cancellation is
//! council-wide: an abort signal discards the whole round.
//!
//! ## Determinism
//!
//! Every strategy is a pure function of the collector and the registry
//! snapshot. Ties break on aggregate priority weight, then on earliest
//! completion, so identical inputs always reduce to identical outputs.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conclave_consensus::{ConsensusEngine, ConsensusMode, Dispatcher};
//!
//! let dispatcher = Dispatcher::new(backend);
//! let outcome = dispatcher.dispatch(&registry, "ping", abort_rx).await;
//!
//! let engine = ConsensusEngine::new();
//! let result = engine.resolve(ConsensusMode::WeightedRoles, &outcome.collector, &registry)?;
//! println!("{}", result.final_response);
//! ```

mod backend;
mod collector;
mod dispatcher;
mod engine;
mod error;

pub use backend::{extract_confidence, AgentBackend, BackendError, BackendReply, DEFAULT_CONFIDENCE};
pub use collector::{ResponseCollector, RoleOutcome, RoleResponse};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use engine::{synthesis_prompt, ConsensusEngine, ConsensusMode, ConsensusOutcome};
pub use error::ConsensusError;

/// Result type for consensus operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;
