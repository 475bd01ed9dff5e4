//! # Integrity Monitor
//!
//! Measures how much successful role responses disagree and decides
//! whether a cycle may spend another deliberative round on it.
//!
//! ## Divergence
//!
//! Divergence is `1 - mean pairwise similarity` over the successful
//! response texts, clamped to [0, 1]. Fewer than two responses cannot
//! disagree, so their divergence is 0. The similarity measure is a
//! closed, configurable choice ([`SimilarityMetric`]) so the behavior
//! stays deterministic and testable.
//!
//! ## Recursion Governance
//!
//! When divergence exceeds the configured ceiling the monitor either
//! requests one more deliberative round (only if the active consensus
//! algorithm supports iterative refinement and the recursion budget is
//! not exhausted) or forces the cycle into consensus with the result
//! flagged low-confidence. It never lets a cycle loop past
//! `max_recursion_depth`.
//!
//! ## Usage
//!
//! ```rust
//! use conclave_monitor::{IntegrityMonitor, IntegrityAction};
//!
//! let monitor = IntegrityMonitor::new(0.5, 3)?;
//!
//! let texts = ["pong", "pong"];
//! let assessment = monitor.assess(&texts, 0, false);
//! assert_eq!(assessment.divergence, 0.0);
//! assert_eq!(assessment.action, IntegrityAction::Proceed);
//! # Ok::<(), conclave_monitor::MonitorError>(())
//! ```

mod divergence;
mod error;
mod monitor;
mod similarity;

pub use divergence::divergence;
pub use error::MonitorError;
pub use monitor::{Assessment, IntegrityAction, IntegrityMonitor};
pub use similarity::SimilarityMetric;

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
