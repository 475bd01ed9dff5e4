//! The per-cycle response table.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;

/// Terminal outcome of one role invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleOutcome {
    /// The backend produced a usable response.
    Success,
    /// The backend call failed; the reason is recorded, the cycle
    /// continues.
    Failed(String),
    /// The backend reported its own timeout.
    TimedOut,
}

impl RoleOutcome {
    /// True for [`RoleOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, RoleOutcome::Success)
    }
}

/// One role's outcome for one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleResponse {
    /// The responding role.
    pub role_name: String,
    /// Response text (or the failure reason echo for failed roles).
    pub text: String,
    /// Confidence in [0, 1], backend-reported or extracted from the
    /// text; `None` when neither was available.
    pub confidence: Option<f64>,
    /// Wall-clock time the invocation took.
    pub elapsed: Duration,
    /// Terminal outcome.
    pub outcome: RoleOutcome,
    /// Order in which this response completed within its round,
    /// starting at 0. Used for deterministic tie-breaking.
    pub completion_seq: u64,
    /// First 16 hex chars of the sha256 of the text, for integrity
    /// checking in the cycle ledger.
    pub response_hash: String,
}

impl RoleResponse {
    /// Builds a successful response. The completion sequence is
    /// assigned by the collector.
    pub fn success(
        role_name: impl Into<String>,
        text: impl Into<String>,
        confidence: Option<f64>,
        elapsed: Duration,
    ) -> Self {
        let text = text.into();
        let response_hash = short_hash(&text);
        Self {
            role_name: role_name.into(),
            text,
            confidence,
            elapsed,
            outcome: RoleOutcome::Success,
            completion_seq: 0,
            response_hash,
        }
    }

    /// Builds a failed response.
    pub fn failed(role_name: impl Into<String>, reason: impl Into<String>, elapsed: Duration) -> Self {
        let reason = reason.into();
        Self {
            role_name: role_name.into(),
            text: reason.clone(),
            confidence: None,
            elapsed,
            outcome: RoleOutcome::Failed(reason),
            completion_seq: 0,
            response_hash: String::new(),
        }
    }

    /// Builds a timed-out response.
    pub fn timed_out(role_name: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            role_name: role_name.into(),
            text: String::new(),
            confidence: None,
            elapsed,
            outcome: RoleOutcome::TimedOut,
            completion_seq: 0,
            response_hash: String::new(),
        }
    }
}

fn short_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

/// In-flight table of per-role outcomes for one deliberation round.
///
/// Each invocation writes only its own entry (insert-once per role),
/// and the table is read by the monitor and the consensus engine only
/// after the dispatcher's join barrier. Keyed and iterated in role-name
/// order for determinism.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseCollector {
    entries: BTreeMap<String, RoleResponse>,
    next_seq: u64,
}

impl ResponseCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a role's terminal outcome, assigning its completion
    /// sequence. A second write for the same role is ignored; each
    /// invocation owns exactly one entry.
    pub fn record(&mut self, mut response: RoleResponse) {
        if self.entries.contains_key(&response.role_name) {
            return;
        }
        response.completion_seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(response.role_name.clone(), response);
    }

    /// Looks up one role's entry.
    pub fn get(&self, role_name: &str) -> Option<&RoleResponse> {
        self.entries.get(role_name)
    }

    /// All entries, in role-name order.
    pub fn responses(&self) -> impl Iterator<Item = &RoleResponse> {
        self.entries.values()
    }

    /// Successful entries, sorted by completion order.
    pub fn successes(&self) -> Vec<&RoleResponse> {
        let mut successes: Vec<&RoleResponse> = self
            .entries
            .values()
            .filter(|r| r.outcome.is_success())
            .collect();
        successes.sort_by_key(|r| r.completion_seq);
        successes
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful entries.
    pub fn success_count(&self) -> usize {
        self.entries.values().filter(|r| r.outcome.is_success()).count()
    }

    /// A round with at least one success is viable for consensus.
    pub fn is_viable(&self) -> bool {
        self.success_count() > 0
    }

    /// Consumes the collector into a name-ordered list.
    pub fn into_responses(self) -> Vec<RoleResponse> {
        self.entries.into_values().collect()
    }
}
