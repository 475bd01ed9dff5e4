//! Configuration surface.
//!
//! Loaded by an external component (the CLI ships a JSON loader) and
//! consumed read-only. Every knob has a default so a minimal config
//! only needs its roles.

use serde::{Deserialize, Serialize};

use conclave_consensus::ConsensusMode;
use conclave_monitor::SimilarityMetric;
use conclave_registry::Role;

/// Security gate options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Disables pattern screening entirely (length limits remain).
    pub enable_injection_detection: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_injection_detection: true,
        }
    }
}

/// One configured role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Unique role name.
    pub name: String,
    /// Opaque backend binding, e.g. a model identifier.
    pub model_binding: String,
    /// Persona prompt for the role.
    #[serde(default)]
    pub system_prompt: String,
    /// Priority weight, positive.
    #[serde(default = "default_weight")]
    pub priority_weight: f64,
    /// Confidence threshold in [0, 1].
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    /// Disabled roles stay registered but are never dispatched.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl RoleConfig {
    /// Converts into the registry's role type.
    pub fn into_role(self) -> Role {
        Role::new(self.name, self.model_binding)
            .with_system_prompt(self.system_prompt)
            .with_weight(self.priority_weight)
            .with_threshold(self.confidence_threshold)
            .with_enabled(self.enabled)
    }
}

fn default_weight() -> f64 {
    1.0
}

fn default_threshold() -> f64 {
    0.7
}

fn default_true() -> bool {
    true
}

/// Full council configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    /// The roles to register.
    pub roles: Vec<RoleConfig>,
    /// Cap on deliberative re-dispatch rounds per cycle.
    pub max_recursion_depth: u32,
    /// Divergence above this triggers integrity handling.
    pub divergence_ceiling: f64,
    /// Maximum query length in characters.
    pub max_input_length: usize,
    /// Default reduction strategy.
    pub consensus_mode: ConsensusMode,
    /// Similarity metric for divergence and clustering.
    pub similarity_metric: SimilarityMetric,
    /// Security gate options.
    pub security: SecurityConfig,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            roles: Vec::new(),
            max_recursion_depth: 3,
            divergence_ceiling: 0.5,
            max_input_length: 4000,
            consensus_mode: ConsensusMode::WeightedRoles,
            similarity_metric: SimilarityMetric::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl CouncilConfig {
    /// The classic four-seat council: strategist, analyst, arbiter,
    /// guardian, each prompted to end with a confidence trailer.
    pub fn standard_council() -> Self {
        let trailer = "Always end your response with 'Confidence: X.X' where X.X is your \
                       confidence level from 0.0 to 1.0.";
        let role = |name: &str, persona: &str, weight: f64, threshold: f64| RoleConfig {
            name: name.to_string(),
            model_binding: "llama3.2:latest".to_string(),
            system_prompt: format!("{persona} {trailer}"),
            priority_weight: weight,
            confidence_threshold: threshold,
            enabled: true,
        };
        Self {
            roles: vec![
                role(
                    "strategist",
                    "You are the Strategist. Focus on long-term planning and strategic analysis.",
                    1.2,
                    0.8,
                ),
                role(
                    "analyst",
                    "You are the Analyst. Provide detailed technical breakdowns and data analysis.",
                    1.1,
                    0.7,
                ),
                role(
                    "arbiter",
                    "You are the Arbiter. Resolve conflicts and provide balanced judgment; \
                     you hold the highest authority in the council.",
                    1.3,
                    0.8,
                ),
                role(
                    "guardian",
                    "You are the Guardian. Focus on risk assessment and protective measures.",
                    1.0,
                    0.6,
                ),
            ],
            ..Self::default()
        }
    }

    /// Materializes the configured roles.
    pub fn build_roles(&self) -> Vec<Role> {
        self.roles.iter().cloned().map(RoleConfig::into_role).collect()
    }
}
