//! Cycle results, status reporting, and the external log record.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use conclave_consensus::{ConsensusMode, RoleResponse};

use crate::state::{CouncilState, StateTrace};

/// Terminal outcome of a council cycle.
///
/// Per-role failures are not represented here - they live inside the
/// individual [`RoleResponse`] entries and never fail the cycle alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The cycle produced a released final response.
    Completed,
    /// The query failed sanitization or was empty.
    InputRejected {
        /// Why the query was rejected.
        reason: String,
    },
    /// The registry held no enabled roles at cycle start.
    NoRolesAvailable,
    /// Every role invocation failed; consensus was skipped.
    AllRolesFailed,
    /// Output screening flagged the synthesized response.
    IntegrityViolation {
        /// What the screening found.
        reason: String,
    },
    /// The cycle was cancelled council-wide; in-flight results were
    /// discarded.
    Aborted,
}

impl CycleOutcome {
    /// True for [`CycleOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed)
    }

    /// Short stable label for logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Completed => "completed",
            CycleOutcome::InputRejected { .. } => "input_rejected",
            CycleOutcome::NoRolesAvailable => "no_roles_available",
            CycleOutcome::AllRolesFailed => "all_roles_failed",
            CycleOutcome::IntegrityViolation { .. } => "integrity_violation",
            CycleOutcome::Aborted => "aborted",
        }
    }
}

/// Everything a caller gets back from one council cycle.
///
/// `submit` always returns one of these; even rejected or failed
/// cycles describe which roles failed and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilResult {
    /// Unique cycle id.
    pub cycle_id: String,
    /// Terminal outcome.
    pub outcome: CycleOutcome,
    /// The released answer; `None` for every non-completed outcome.
    pub final_response: Option<String>,
    /// The strategy that produced the answer, when one ran.
    pub chosen_algorithm: Option<ConsensusMode>,
    /// Per-role outcomes from the final round, in role-name order.
    pub responses: Vec<RoleResponse>,
    /// The cycle's state transitions; always ends in `logged`.
    pub state_trace: StateTrace,
    /// Divergence of the final round's successes.
    pub divergence_score: f64,
    /// Deliberative rounds taken beyond the first dispatch.
    pub recursion_depth: u32,
    /// Set when the divergence ceiling was breached with no recursion
    /// budget left.
    pub low_confidence: bool,
    /// Screening findings and integrity events, in order.
    pub security_events: Vec<String>,
    /// Total wall-clock duration of the cycle.
    pub elapsed: Duration,
}

impl CouncilResult {
    /// True when a final response was released.
    pub fn is_completed(&self) -> bool {
        self.outcome.is_completed()
    }
}

/// Compact summary of the most recent cycle, for status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSummary {
    /// The cycle id.
    pub cycle_id: String,
    /// Terminal outcome.
    pub outcome: CycleOutcome,
    /// Strategy used, when one ran.
    pub chosen_algorithm: Option<ConsensusMode>,
    /// Divergence of the final round.
    pub divergence_score: f64,
    /// Cycle duration.
    pub elapsed: Duration,
    /// When the cycle finished.
    pub finished_at: SystemTime,
}

/// Read-only, side-effect-free status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilStatus {
    /// The machine's current state.
    pub state: CouncilState,
    /// Names of all registered roles.
    pub registered_roles: Vec<String>,
    /// The last completed cycle, if any.
    pub last_cycle_summary: Option<CycleSummary>,
}

/// One record per completed cycle, handed to the external log sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// The cycle id.
    pub cycle_id: String,
    /// The sanitized query (never the raw input).
    pub sanitized_query: String,
    /// Terminal outcome.
    pub outcome: CycleOutcome,
    /// Strategy used, when one ran.
    pub chosen_algorithm: Option<ConsensusMode>,
    /// The released answer, when one was.
    pub final_response: Option<String>,
    /// Transitions with timestamps.
    pub state_trace: StateTrace,
    /// Per-role outcomes.
    pub role_outcomes: Vec<RoleResponse>,
    /// Divergence of the final round.
    pub divergence_score: f64,
    /// Deliberative rounds taken.
    pub recursion_depth: u32,
    /// Screening and integrity events.
    pub security_events: Vec<String>,
    /// When the cycle finished.
    pub finished_at: SystemTime,
}

impl LogRecord {
    /// Builds the record for a finished cycle.
    pub fn from_result(result: &CouncilResult, sanitized_query: &str) -> Self {
        Self {
            cycle_id: result.cycle_id.clone(),
            sanitized_query: sanitized_query.to_string(),
            outcome: result.outcome.clone(),
            chosen_algorithm: result.chosen_algorithm,
            final_response: result.final_response.clone(),
            state_trace: result.state_trace.clone(),
            role_outcomes: result.responses.clone(),
            divergence_score: result.divergence_score,
            recursion_depth: result.recursion_depth,
            security_events: result.security_events.clone(),
            finished_at: SystemTime::now(),
        }
    }
}

/// Destination for cycle records. The sink itself (file, socket,
/// database) is external to this core.
pub trait CycleSink: Send + Sync {
    /// Receives one record per completed cycle.
    fn record(&self, record: &LogRecord);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CouncilState;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(CycleOutcome::Completed.label(), "completed");
        assert_eq!(
            CycleOutcome::InputRejected {
                reason: "empty".to_string()
            }
            .label(),
            "input_rejected"
        );
        assert_eq!(CycleOutcome::AllRolesFailed.label(), "all_roles_failed");
    }

    #[test]
    fn test_outcome_serde_tagging() {
        let outcome = CycleOutcome::IntegrityViolation {
            reason: "screening hit".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("integrity_violation"));
        let parsed: CycleOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, outcome);
    }

    #[test]
    fn test_log_record_from_result() {
        let mut trace = StateTrace::new();
        trace.push(CouncilState::Idle);
        trace.push(CouncilState::Logged);
        let result = CouncilResult {
            cycle_id: "cycle-1".to_string(),
            outcome: CycleOutcome::Completed,
            final_response: Some("pong".to_string()),
            chosen_algorithm: Some(ConsensusMode::WeightedRoles),
            responses: Vec::new(),
            state_trace: trace,
            divergence_score: 0.0,
            recursion_depth: 0,
            low_confidence: false,
            security_events: Vec::new(),
            elapsed: Duration::from_millis(10),
        };
        let record = LogRecord::from_result(&result, "ping");
        assert_eq!(record.sanitized_query, "ping");
        assert_eq!(record.final_response.as_deref(), Some("pong"));
        assert!(record.state_trace.ends_logged());
    }
}
