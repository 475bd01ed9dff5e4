//! Cycle states and the append-only state trace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// The states of the Council Invocation State Machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouncilState {
    /// Waiting for a query.
    Idle,
    /// Query received; input screening and registry snapshot.
    Assembling,
    /// Roles are thinking. Re-entered on deliberative rounds.
    Deliberating,
    /// Reduction in progress.
    Consensus,
    /// Final response screened and released.
    Output,
    /// Cycle outcome recorded. Every cycle ends here.
    Logged,
}

impl fmt::Display for CouncilState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CouncilState::Idle => "idle",
            CouncilState::Assembling => "assembling",
            CouncilState::Deliberating => "deliberating",
            CouncilState::Consensus => "consensus",
            CouncilState::Output => "output",
            CouncilState::Logged => "logged",
        };
        f.write_str(name)
    }
}

/// One trace entry: a state and when it was entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// The state entered.
    pub state: CouncilState,
    /// Wall-clock entry time.
    pub at: SystemTime,
}

/// Append-only record of a cycle's transitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateTrace {
    entries: Vec<TraceEntry>,
}

impl StateTrace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a state with the current time.
    pub fn push(&mut self, state: CouncilState) {
        self.entries.push(TraceEntry {
            state,
            at: SystemTime::now(),
        });
    }

    /// The visited states, in order.
    pub fn states(&self) -> Vec<CouncilState> {
        self.entries.iter().map(|e| e.state).collect()
    }

    /// The most recently entered state.
    pub fn last(&self) -> Option<CouncilState> {
        self.entries.last().map(|e| e.state)
    }

    /// True when the trace terminates in [`CouncilState::Logged`].
    pub fn ends_logged(&self) -> bool {
        self.last() == Some(CouncilState::Logged)
    }

    /// All entries with timestamps.
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Number of recorded transitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
