//! Monitor facade: divergence assessment and recursion governance.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::divergence::divergence;
use crate::error::MonitorError;
use crate::similarity::SimilarityMetric;

/// What the cycle should do after an integrity assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityAction {
    /// Divergence within the ceiling; continue normally.
    Proceed,
    /// Divergence over the ceiling with recursion budget left and an
    /// iterative consensus algorithm active: run one more round.
    RequestRound,
    /// Divergence over the ceiling with no budget (or a non-iterative
    /// algorithm): resolve now, flagging the result low-confidence.
    ForceConsensus,
}

/// One integrity assessment for a deliberation round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Assessment {
    /// Divergence of the assessed responses, in [0, 1].
    pub divergence: f64,
    /// The resulting action.
    pub action: IntegrityAction,
}

/// Tracks divergence against a configured ceiling and enforces the
/// recursion-depth cap on deliberative loops.
#[derive(Debug, Clone)]
pub struct IntegrityMonitor {
    divergence_ceiling: f64,
    max_recursion_depth: u32,
    metric: SimilarityMetric,
}

impl IntegrityMonitor {
    /// Creates a monitor.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidCeiling`] when the ceiling is
    /// outside [0, 1].
    pub fn new(divergence_ceiling: f64, max_recursion_depth: u32) -> Result<Self, MonitorError> {
        Self::with_metric(
            divergence_ceiling,
            max_recursion_depth,
            SimilarityMetric::default(),
        )
    }

    /// Creates a monitor with an explicit similarity metric.
    pub fn with_metric(
        divergence_ceiling: f64,
        max_recursion_depth: u32,
        metric: SimilarityMetric,
    ) -> Result<Self, MonitorError> {
        if !(0.0..=1.0).contains(&divergence_ceiling) {
            return Err(MonitorError::InvalidCeiling(divergence_ceiling));
        }
        Ok(Self {
            divergence_ceiling,
            max_recursion_depth,
            metric,
        })
    }

    /// Assesses one round of successful response texts.
    ///
    /// `recursion_depth` is the number of deliberative loops already
    /// taken this cycle; `iterative` is whether the active consensus
    /// algorithm supports another round.
    pub fn assess(&self, texts: &[&str], recursion_depth: u32, iterative: bool) -> Assessment {
        let divergence = divergence(texts, self.metric);
        let action = if divergence <= self.divergence_ceiling {
            IntegrityAction::Proceed
        } else if iterative && recursion_depth < self.max_recursion_depth {
            IntegrityAction::RequestRound
        } else {
            IntegrityAction::ForceConsensus
        };
        debug!(
            divergence,
            recursion_depth,
            iterative,
            ?action,
            "integrity assessment"
        );
        Assessment { divergence, action }
    }

    /// The configured divergence ceiling.
    pub fn divergence_ceiling(&self) -> f64 {
        self.divergence_ceiling
    }

    /// The configured recursion cap.
    pub fn max_recursion_depth(&self) -> u32 {
        self.max_recursion_depth
    }
}
