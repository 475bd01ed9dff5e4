//! Screening result types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the gate does with content matching a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternAction {
    /// The matched fragment is removed from the text.
    Strip,
    /// The whole query is rejected.
    Reject,
}

/// One pattern hit, reported alongside the sanitized text so the caller
/// can always see what was flagged or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Stable pattern name, e.g. `instruction-override`.
    pub pattern: String,
    /// The matched fragment (capped at 80 characters).
    pub excerpt: String,
    /// What happened to the match.
    pub action: PatternAction,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}): {:?}", self.pattern, self.action, self.excerpt)
    }
}

/// Why an input was rejected outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The query was empty, or empty after sanitization.
    EmptyQuery,
    /// A reject-class injection pattern matched.
    InjectionDetected,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyQuery => write!(f, "empty query"),
            RejectReason::InjectionDetected => write!(f, "prompt injection detected"),
        }
    }
}

/// Result of screening a submitted query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputScreening {
    /// The sanitized text, safe to dispatch when not rejected.
    pub sanitized: String,
    /// Every pattern hit, stripped or rejecting.
    pub findings: Vec<Finding>,
    /// True when the input exceeded the length limit and was cut.
    pub truncated: bool,
    /// Set when the query must not be dispatched.
    pub rejection: Option<RejectReason>,
}

impl InputScreening {
    /// True when the query must not be dispatched.
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_display() {
        let finding = Finding {
            pattern: "instruction-override".to_string(),
            excerpt: "ignore previous instructions".to_string(),
            action: PatternAction::Reject,
        };
        let text = finding.to_string();
        assert!(text.contains("instruction-override"));
        assert!(text.contains("Reject"));
    }

    #[test]
    fn test_screening_serialization() {
        let screening = InputScreening {
            sanitized: "hello".to_string(),
            findings: vec![],
            truncated: false,
            rejection: Some(RejectReason::EmptyQuery),
        };
        let json = serde_json::to_string(&screening).unwrap();
        let parsed: InputScreening = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_rejected());
    }
}
