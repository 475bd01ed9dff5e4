//! Role data model and registry errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two roles share the same name.
    #[error("Duplicate role name: '{0}'")]
    DuplicateRole(String),

    /// A role's priority weight is not a positive finite number.
    #[error("Role '{0}' has invalid priority weight {1} (must be positive and finite)")]
    InvalidWeight(String, f64),

    /// A role's confidence threshold is outside [0, 1].
    #[error("Role '{0}' has invalid confidence threshold {1} (must be in [0, 1])")]
    InvalidThreshold(String, f64),
}

/// A configured council participant.
///
/// Immutable for the lifetime of a registry snapshot. Reconfiguration
/// replaces the whole registry, never individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique role name (registry key).
    pub name: String,
    /// Opaque backend binding, e.g. a model identifier.
    pub model_binding: String,
    /// Persona prompt prepended to every invocation of this role.
    pub system_prompt: String,
    /// Weight used for tie-breaking and weighted consensus.
    pub priority_weight: f64,
    /// Minimum reported confidence for this role's response to qualify
    /// under confidence scoring.
    pub confidence_threshold: f64,
    /// Disabled roles are skipped by the dispatcher.
    pub enabled: bool,
}

impl Role {
    /// Creates a role with default weight 1.0 and threshold 0.7.
    pub fn new(name: impl Into<String>, model_binding: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_binding: model_binding.into(),
            system_prompt: String::new(),
            priority_weight: 1.0,
            confidence_threshold: 0.7,
            enabled: true,
        }
    }

    /// Sets the priority weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.priority_weight = weight;
        self
    }

    /// Sets the confidence threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Sets the persona prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Enables or disables the role.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Validates weight and threshold ranges.
    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        if !self.priority_weight.is_finite() || self.priority_weight <= 0.0 {
            return Err(RegistryError::InvalidWeight(
                self.name.clone(),
                self.priority_weight,
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(RegistryError::InvalidThreshold(
                self.name.clone(),
                self.confidence_threshold,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_defaults() {
        let role = Role::new("strategist", "llama3.2:latest");
        assert_eq!(role.name, "strategist");
        assert!((role.priority_weight - 1.0).abs() < f64::EPSILON);
        assert!((role.confidence_threshold - 0.7).abs() < f64::EPSILON);
        assert!(role.enabled);
    }

    #[test]
    fn test_role_builder() {
        let role = Role::new("arbiter", "llama3.2:latest")
            .with_weight(1.3)
            .with_threshold(0.8)
            .with_system_prompt("You are the Arbiter.")
            .with_enabled(false);
        assert!((role.priority_weight - 1.3).abs() < f64::EPSILON);
        assert!((role.confidence_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(role.system_prompt, "You are the Arbiter.");
        assert!(!role.enabled);
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let role = Role::new("bad", "m").with_weight(-1.0);
        assert!(matches!(
            role.validate(),
            Err(RegistryError::InvalidWeight(_, _))
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let role = Role::new("bad", "m").with_threshold(1.5);
        assert!(matches!(
            role.validate(),
            Err(RegistryError::InvalidThreshold(_, _))
        ));
    }

    #[test]
    fn test_role_serialization_round_trip() {
        let role = Role::new("guardian", "llama3.2:latest").with_weight(1.0);
        let json = serde_json::to_string(&role).unwrap();
        let parsed: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "guardian");
    }
}
