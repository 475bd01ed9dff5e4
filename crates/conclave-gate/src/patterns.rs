//! Known prompt-injection patterns.

use regex::Regex;

use crate::models::PatternAction;

/// A compiled injection pattern.
pub(crate) struct GatePattern {
    pub name: &'static str,
    pub regex: Regex,
    pub action: PatternAction,
}

/// Builds the pattern set.
///
/// Reject-class patterns cover instruction-override and role
/// impersonation phrasing; strip-class patterns cover embedded control
/// sequences and fenced system blocks, which can be removed without
/// altering the surrounding text.
pub(crate) fn build_patterns() -> Vec<GatePattern> {
    vec![
        GatePattern {
            name: "instruction-override",
            regex: Regex::new(r"(?i)ignore\s+(all\s+)?(previous|prior|above)\s+instructions?")
                .unwrap(),
            action: PatternAction::Reject,
        },
        GatePattern {
            name: "forget-everything",
            regex: Regex::new(r"(?i)forget\s+everything").unwrap(),
            action: PatternAction::Reject,
        },
        GatePattern {
            name: "new-instructions",
            regex: Regex::new(r"(?i)new\s+instructions?\s*:").unwrap(),
            action: PatternAction::Reject,
        },
        GatePattern {
            name: "system-impersonation",
            regex: Regex::new(r"(?i)system\s*:\s*you\s+are").unwrap(),
            action: PatternAction::Reject,
        },
        GatePattern {
            name: "act-as-if",
            regex: Regex::new(r"(?i)act\s+as\s+if\s+you\s+are").unwrap(),
            action: PatternAction::Reject,
        },
        GatePattern {
            name: "pretend-to-be",
            regex: Regex::new(r"(?i)pretend\s+to\s+be").unwrap(),
            action: PatternAction::Reject,
        },
        GatePattern {
            name: "control-sequence",
            regex: Regex::new(r"<\|.*?\|>").unwrap(),
            action: PatternAction::Strip,
        },
        GatePattern {
            name: "fenced-system-block",
            regex: Regex::new(r"(?is)```\s*system.*?```").unwrap(),
            action: PatternAction::Strip,
        },
    ]
}
