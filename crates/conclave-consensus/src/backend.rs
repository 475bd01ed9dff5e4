//! The Agent Backend seam.
//!
//! A backend turns a role and a prompt into a response string with an
//! optional self-reported confidence. Model selection, prompt
//! templating, and transport all live behind this trait.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use conclave_registry::Role;

/// Confidence assumed when a backend reports none and the response
/// text carries no confidence trailer.
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// A successful backend reply.
#[derive(Debug, Clone)]
pub struct BackendReply {
    /// The response text.
    pub text: String,
    /// Backend-reported confidence in [0, 1], when available.
    pub confidence: Option<f64>,
}

impl BackendReply {
    /// Creates a reply without a reported confidence.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    /// Attaches a reported confidence.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}

/// Backend invocation failures.
///
/// These are recovered locally by the dispatcher: one role failing
/// never aborts its siblings.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend reported a timeout of its own. The dispatcher
    /// imposes none.
    #[error("Backend timed out: {0}")]
    Timeout(String),

    /// The backend produced a response this core cannot parse.
    #[error("Malformed backend response: {0}")]
    Malformed(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Other(String),
}

/// Opaque call into the model side.
///
/// Implementations must be safely callable concurrently for distinct
/// roles; the dispatcher runs one invocation per enabled role in
/// parallel.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Produces a response for `role` to `prompt`.
    ///
    /// May run arbitrarily long; the dispatcher imposes no deadline.
    async fn invoke(&self, role: &Role, prompt: &str) -> std::result::Result<BackendReply, BackendError>;
}

/// Extracts a `Confidence: 0.8` style trailer from response text.
///
/// Roles are conventionally prompted to end their answer with such a
/// trailer; backends that do not report confidence structurally still
/// get a usable score this way. The value is clamped to [0, 1].
pub fn extract_confidence(text: &str) -> Option<f64> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:confidence|certainty)\s*[:=]\s*(\d+(?:\.\d+)?)").unwrap()
    });
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 1.0))
}
