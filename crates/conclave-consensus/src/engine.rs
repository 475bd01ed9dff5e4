//! The pluggable consensus reduction strategies.
//!
//! The strategy set is a closed enumeration: five named algorithms,
//! selected explicitly per cycle, each deterministic given identical
//! inputs. Tie-breaking is always the same chain: aggregate priority
//! weight, then earliest completion.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use conclave_monitor::SimilarityMetric;
use conclave_registry::RoleRegistry;

use crate::backend::DEFAULT_CONFIDENCE;
use crate::collector::{ResponseCollector, RoleResponse};
use crate::error::ConsensusError;

/// Similarity at or above which two responses fall into one cluster.
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.7;

/// The five reduction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMode {
    /// Largest similarity cluster wins.
    MajorityVote,
    /// Highest qualifying reported confidence wins; falls back to
    /// majority vote when every response is disqualified.
    ConfidenceScoring,
    /// Highest confidence x priority weight wins.
    WeightedRoles,
    /// Redispatches under divergence, final round resolved as
    /// weighted roles.
    DeliberativeLoop,
    /// No single winner; all successful responses presented for
    /// external selection.
    Hybrid,
}

impl ConsensusMode {
    /// All strategies, for CLI listings and exhaustive tests.
    pub const ALL: [ConsensusMode; 5] = [
        ConsensusMode::MajorityVote,
        ConsensusMode::ConfidenceScoring,
        ConsensusMode::WeightedRoles,
        ConsensusMode::DeliberativeLoop,
        ConsensusMode::Hybrid,
    ];

    /// The configuration-surface name of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusMode::MajorityVote => "majority_vote",
            ConsensusMode::ConfidenceScoring => "confidence_scoring",
            ConsensusMode::WeightedRoles => "weighted_roles",
            ConsensusMode::DeliberativeLoop => "deliberative_loop",
            ConsensusMode::Hybrid => "hybrid",
        }
    }

    /// True for strategies that support another deliberative round.
    pub fn is_iterative(&self) -> bool {
        matches!(self, ConsensusMode::DeliberativeLoop)
    }
}

impl fmt::Display for ConsensusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsensusMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "majority_vote" => Ok(ConsensusMode::MajorityVote),
            "confidence_scoring" => Ok(ConsensusMode::ConfidenceScoring),
            "weighted_roles" => Ok(ConsensusMode::WeightedRoles),
            "deliberative_loop" => Ok(ConsensusMode::DeliberativeLoop),
            "hybrid" => Ok(ConsensusMode::Hybrid),
            other => Err(format!("unknown consensus mode '{other}'")),
        }
    }
}

/// The reduction result: one governed output plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusOutcome {
    /// The final answer (or, for hybrid, the structured presentation).
    pub final_response: String,
    /// The strategy that actually produced the answer.
    pub chosen_algorithm: ConsensusMode,
    /// Aggregate confidence of the contributing responses.
    pub confidence: f64,
    /// Roles whose responses contributed to the final answer.
    pub participants: Vec<String>,
    /// Strategy-specific provenance.
    pub metadata: serde_json::Value,
}

/// Builds the re-dispatch prompt for a deliberative round.
///
/// Each role sees the original query plus every sibling's previous
/// answer, in completion order, and is asked to refine its own.
pub fn synthesis_prompt(original_query: &str, previous: &[&RoleResponse]) -> String {
    let mut prompt = format!("Original query:\n{original_query}\n\nPrevious council responses:\n");
    for response in previous {
        prompt.push_str(&format!("[{}] {}\n", response.role_name, response.text));
    }
    prompt.push_str(
        "\nReconsider the query in light of the other responses and give your refined answer.",
    );
    prompt
}

/// The consensus engine.
///
/// Holds the clustering threshold and similarity metric; everything
/// else comes in per call so the engine itself carries no cycle state.
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    cluster_threshold: f64,
    metric: SimilarityMetric,
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsensusEngine {
    /// Creates an engine with the default threshold and metric.
    pub fn new() -> Self {
        Self {
            cluster_threshold: DEFAULT_CLUSTER_THRESHOLD,
            metric: SimilarityMetric::default(),
        }
    }

    /// Creates an engine with an explicit similarity metric.
    pub fn with_metric(metric: SimilarityMetric) -> Self {
        Self {
            cluster_threshold: DEFAULT_CLUSTER_THRESHOLD,
            metric,
        }
    }

    /// Reduces a completed round to one outcome.
    ///
    /// # Errors
    ///
    /// [`ConsensusError::NoViableResponses`] when the collector holds
    /// no successes; the controller terminates such cycles before the
    /// engine runs, so hitting this means a sequencing bug upstream.
    pub fn resolve(
        &self,
        mode: ConsensusMode,
        collector: &ResponseCollector,
        registry: &RoleRegistry,
    ) -> Result<ConsensusOutcome, ConsensusError> {
        let successes = collector.successes();
        if successes.is_empty() {
            return Err(ConsensusError::NoViableResponses);
        }
        Ok(match mode {
            ConsensusMode::MajorityVote => self.majority_vote(&successes, registry),
            ConsensusMode::ConfidenceScoring => self.confidence_scoring(&successes, registry),
            ConsensusMode::WeightedRoles => {
                self.weighted_roles(&successes, registry, ConsensusMode::WeightedRoles)
            }
            // The redispatch loop lives in the controller; by the time
            // the engine sees a deliberative cycle only the final round
            // remains, resolved as weighted roles.
            ConsensusMode::DeliberativeLoop => {
                self.weighted_roles(&successes, registry, ConsensusMode::DeliberativeLoop)
            }
            ConsensusMode::Hybrid => self.hybrid(&successes),
        })
    }

    fn majority_vote(
        &self,
        successes: &[&RoleResponse],
        registry: &RoleRegistry,
    ) -> ConsensusOutcome {
        let clusters = self.cluster(successes, registry);
        let winner = clusters
            .iter()
            .max_by(|a, b| compare_clusters(a, b))
            .expect("at least one cluster from a non-empty round");

        ConsensusOutcome {
            final_response: winner.members[0].text.clone(),
            chosen_algorithm: ConsensusMode::MajorityVote,
            confidence: mean_confidence(&winner.members),
            participants: winner.members.iter().map(|r| r.role_name.clone()).collect(),
            metadata: json!({
                "clusters": clusters.len(),
                "winning_cluster_size": winner.members.len(),
                "winning_weight": winner.weight,
            }),
        }
    }

    fn confidence_scoring(
        &self,
        successes: &[&RoleResponse],
        registry: &RoleRegistry,
    ) -> ConsensusOutcome {
        let qualified: Vec<&RoleResponse> = successes
            .iter()
            .copied()
            .filter(|r| {
                let threshold = registry
                    .get(&r.role_name)
                    .map(|role| role.confidence_threshold)
                    .unwrap_or(DEFAULT_CONFIDENCE);
                effective_confidence(r) >= threshold
            })
            .collect();

        if qualified.is_empty() {
            // Every response fell below its role's threshold.
            let mut outcome = self.majority_vote(successes, registry);
            outcome.metadata = json!({
                "fallback_from": ConsensusMode::ConfidenceScoring.as_str(),
                "disqualified": successes.len(),
            });
            return outcome;
        }

        let winner = qualified
            .iter()
            .max_by(|a, b| {
                effective_confidence(a)
                    .partial_cmp(&effective_confidence(b))
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| compare_weight_then_earliest(a, b, registry))
            })
            .expect("qualified is non-empty");

        ConsensusOutcome {
            final_response: winner.text.clone(),
            chosen_algorithm: ConsensusMode::ConfidenceScoring,
            confidence: effective_confidence(winner),
            participants: vec![winner.role_name.clone()],
            metadata: json!({ "qualified": qualified.len() }),
        }
    }

    fn weighted_roles(
        &self,
        successes: &[&RoleResponse],
        registry: &RoleRegistry,
        chosen: ConsensusMode,
    ) -> ConsensusOutcome {
        let winner = successes
            .iter()
            .max_by(|a, b| {
                weighted_score(a, registry)
                    .partial_cmp(&weighted_score(b, registry))
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| compare_weight_then_earliest(a, b, registry))
            })
            .expect("successes is non-empty");

        ConsensusOutcome {
            final_response: winner.text.clone(),
            chosen_algorithm: chosen,
            confidence: effective_confidence(winner),
            participants: vec![winner.role_name.clone()],
            metadata: json!({
                "winning_score": weighted_score(winner, registry),
                "winning_weight": weight_of(winner, registry),
            }),
        }
    }

    fn hybrid(&self, successes: &[&RoleResponse]) -> ConsensusOutcome {
        let entries: Vec<serde_json::Value> = successes
            .iter()
            .map(|r| {
                json!({
                    "role": r.role_name,
                    "confidence": effective_confidence(r),
                    "response_hash": r.response_hash,
                })
            })
            .collect();

        let mut distinct: Vec<&str> = successes.iter().map(|r| r.text.trim()).collect();
        distinct.sort_unstable();
        distinct.dedup();

        // Unanimous rounds need no presentation scaffolding.
        let final_response = if distinct.len() == 1 {
            successes[0].text.clone()
        } else {
            let mut text = format!(
                "MULTIPLE PERSPECTIVES ({} responses) - external selection required\n",
                successes.len()
            );
            for (i, response) in successes.iter().enumerate() {
                text.push_str(&format!(
                    "\n[{}] {} (confidence {:.2}):\n{}\n",
                    i + 1,
                    response.role_name,
                    effective_confidence(response),
                    response.text
                ));
            }
            text
        };

        ConsensusOutcome {
            final_response,
            chosen_algorithm: ConsensusMode::Hybrid,
            confidence: mean_confidence(successes),
            participants: successes.iter().map(|r| r.role_name.clone()).collect(),
            metadata: json!({ "entries": entries }),
        }
    }

    /// Greedy clustering in completion order: a response joins the
    /// first cluster whose representative it resembles, else starts
    /// its own. Completion order and a fixed threshold keep the
    /// grouping deterministic.
    fn cluster<'a>(
        &self,
        successes: &[&'a RoleResponse],
        registry: &RoleRegistry,
    ) -> Vec<Cluster<'a>> {
        let mut clusters: Vec<Cluster<'a>> = Vec::new();
        for response in successes {
            match clusters.iter_mut().find(|c| {
                self.metric.similarity(&c.members[0].text, &response.text)
                    >= self.cluster_threshold
            }) {
                Some(cluster) => {
                    cluster.members.push(response);
                    cluster.weight += weight_of(response, registry);
                }
                None => clusters.push(Cluster {
                    members: vec![response],
                    weight: weight_of(response, registry),
                }),
            }
        }
        clusters
    }
}

struct Cluster<'a> {
    /// Members in completion order; the first is the representative.
    members: Vec<&'a RoleResponse>,
    /// Aggregate priority weight.
    weight: f64,
}

impl Cluster<'_> {
    fn earliest(&self) -> u64 {
        self.members[0].completion_seq
    }
}

fn compare_clusters(a: &Cluster<'_>, b: &Cluster<'_>) -> Ordering {
    a.members
        .len()
        .cmp(&b.members.len())
        .then_with(|| a.weight.partial_cmp(&b.weight).unwrap_or(Ordering::Equal))
        // Smaller completion sequence must win under max_by.
        .then_with(|| b.earliest().cmp(&a.earliest()))
}

fn compare_weight_then_earliest(
    a: &RoleResponse,
    b: &RoleResponse,
    registry: &RoleRegistry,
) -> Ordering {
    weight_of(a, registry)
        .partial_cmp(&weight_of(b, registry))
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.completion_seq.cmp(&a.completion_seq))
}

fn effective_confidence(response: &RoleResponse) -> f64 {
    response.confidence.unwrap_or(DEFAULT_CONFIDENCE)
}

fn weighted_score(response: &RoleResponse, registry: &RoleRegistry) -> f64 {
    effective_confidence(response) * weight_of(response, registry)
}

fn weight_of(response: &RoleResponse, registry: &RoleRegistry) -> f64 {
    registry
        .get(&response.role_name)
        .map(|role| role.priority_weight)
        .unwrap_or(1.0)
}

fn mean_confidence(responses: &[&RoleResponse]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }
    responses.iter().map(|r| effective_confidence(r)).sum::<f64>() / responses.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_registry::Role;
    use std::time::Duration;

    fn registry() -> RoleRegistry {
        RoleRegistry::from_roles(vec![
            Role::new("strategist", "m").with_weight(1.2).with_threshold(0.8),
            Role::new("architect", "m").with_weight(1.0).with_threshold(0.7),
            Role::new("guardian", "m").with_weight(1.0).with_threshold(0.6),
        ])
        .unwrap()
    }

    fn collect(entries: &[(&str, &str, Option<f64>)]) -> ResponseCollector {
        let mut collector = ResponseCollector::new();
        for (role, text, confidence) in entries {
            collector.record(RoleResponse::success(
                *role,
                *text,
                *confidence,
                Duration::from_millis(1),
            ));
        }
        collector
    }

    #[test]
    fn test_unanimous_round_all_modes_return_the_text() {
        let collector = collect(&[
            ("strategist", "pong", Some(0.9)),
            ("architect", "pong", Some(0.9)),
            ("guardian", "pong", Some(0.9)),
        ]);
        let registry = registry();
        let engine = ConsensusEngine::new();

        for mode in ConsensusMode::ALL {
            let outcome = engine.resolve(mode, &collector, &registry).unwrap();
            assert_eq!(outcome.final_response, "pong", "mode {mode}");
        }
    }

    #[test]
    fn test_single_success_wins_everywhere() {
        let collector = collect(&[("guardian", "the only answer", Some(0.9))]);
        let registry = registry();
        let engine = ConsensusEngine::new();

        for mode in [
            ConsensusMode::MajorityVote,
            ConsensusMode::ConfidenceScoring,
            ConsensusMode::WeightedRoles,
        ] {
            let outcome = engine.resolve(mode, &collector, &registry).unwrap();
            assert_eq!(outcome.final_response, "the only answer", "mode {mode}");
        }

        let hybrid = engine
            .resolve(ConsensusMode::Hybrid, &collector, &registry)
            .unwrap();
        assert_eq!(hybrid.final_response, "the only answer");
        assert_eq!(hybrid.metadata["entries"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_weighted_roles_ping_pong_example() {
        let collector = collect(&[
            ("strategist", "pong", Some(0.9)),
            ("architect", "pong", Some(0.9)),
        ]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::WeightedRoles, &collector, &registry())
            .unwrap();
        assert_eq!(outcome.final_response, "pong");
        assert_eq!(outcome.chosen_algorithm, ConsensusMode::WeightedRoles);
        // Strategist's 1.2 weight outranks architect at equal confidence.
        assert_eq!(outcome.participants, vec!["strategist".to_string()]);
    }

    #[test]
    fn test_majority_vote_largest_cluster_wins() {
        let collector = collect(&[
            ("strategist", "use a mutex for the shared table", Some(0.8)),
            ("architect", "use a mutex for the shared table", Some(0.7)),
            ("guardian", "rewrite everything in assembly", Some(0.9)),
        ]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::MajorityVote, &collector, &registry())
            .unwrap();
        assert_eq!(outcome.final_response, "use a mutex for the shared table");
        assert_eq!(outcome.participants.len(), 2);
        assert_eq!(outcome.metadata["clusters"], 2);
    }

    #[test]
    fn test_majority_tie_broken_by_weight() {
        // Two singleton clusters; strategist's weight 1.2 wins.
        let collector = collect(&[
            ("architect", "aaaaaaaaaaaa", Some(0.9)),
            ("strategist", "zzzzzzzzzzzz", Some(0.9)),
        ]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::MajorityVote, &collector, &registry())
            .unwrap();
        assert_eq!(outcome.participants, vec!["strategist".to_string()]);
    }

    #[test]
    fn test_majority_tie_broken_by_earliest_completion() {
        // Equal sizes, equal weights: earliest completion wins.
        let collector = collect(&[
            ("architect", "aaaaaaaaaaaa", Some(0.9)),
            ("guardian", "zzzzzzzzzzzz", Some(0.9)),
        ]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::MajorityVote, &collector, &registry())
            .unwrap();
        assert_eq!(outcome.participants, vec!["architect".to_string()]);
    }

    #[test]
    fn test_confidence_scoring_picks_highest_qualifying() {
        let collector = collect(&[
            ("strategist", "strategic answer", Some(0.85)),
            ("guardian", "cautious answer", Some(0.95)),
        ]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::ConfidenceScoring, &collector, &registry())
            .unwrap();
        assert_eq!(outcome.final_response, "cautious answer");
        assert!((outcome.confidence - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_scoring_threshold_disqualifies() {
        // Strategist's threshold is 0.8; 0.75 disqualifies it even
        // though it is the highest confidence.
        let collector = collect(&[
            ("strategist", "strategic answer", Some(0.75)),
            ("guardian", "cautious answer", Some(0.65)),
        ]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::ConfidenceScoring, &collector, &registry())
            .unwrap();
        assert_eq!(outcome.final_response, "cautious answer");
    }

    #[test]
    fn test_confidence_scoring_all_disqualified_falls_back() {
        let collector = collect(&[
            ("strategist", "aaaaaaaaaaaa", Some(0.2)),
            ("guardian", "aaaaaaaaaaaa", Some(0.2)),
        ]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::ConfidenceScoring, &collector, &registry())
            .unwrap();
        assert_eq!(outcome.chosen_algorithm, ConsensusMode::MajorityVote);
        assert_eq!(outcome.metadata["fallback_from"], "confidence_scoring");
        assert_eq!(outcome.final_response, "aaaaaaaaaaaa");
    }

    #[test]
    fn test_weighted_roles_score_beats_raw_confidence() {
        // guardian: 0.9 * 1.0 = 0.90; strategist: 0.8 * 1.2 = 0.96.
        let collector = collect(&[
            ("guardian", "confident answer", Some(0.9)),
            ("strategist", "weighted answer", Some(0.8)),
        ]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::WeightedRoles, &collector, &registry())
            .unwrap();
        assert_eq!(outcome.final_response, "weighted answer");
    }

    #[test]
    fn test_missing_confidence_uses_default() {
        let collector = collect(&[("architect", "answer", None)]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::WeightedRoles, &collector, &registry())
            .unwrap();
        assert!((outcome.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hybrid_presents_divergent_responses() {
        let collector = collect(&[
            ("strategist", "plan carefully", Some(0.9)),
            ("guardian", "lock it down", Some(0.6)),
        ]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::Hybrid, &collector, &registry())
            .unwrap();
        assert!(outcome.final_response.contains("MULTIPLE PERSPECTIVES"));
        assert!(outcome.final_response.contains("plan carefully"));
        assert!(outcome.final_response.contains("lock it down"));
        assert_eq!(outcome.participants.len(), 2);
    }

    #[test]
    fn test_deliberative_resolves_via_weighted() {
        let collector = collect(&[
            ("strategist", "refined answer", Some(0.9)),
            ("architect", "other refined answer", Some(0.5)),
        ]);
        let outcome = ConsensusEngine::new()
            .resolve(ConsensusMode::DeliberativeLoop, &collector, &registry())
            .unwrap();
        assert_eq!(outcome.chosen_algorithm, ConsensusMode::DeliberativeLoop);
        assert_eq!(outcome.final_response, "refined answer");
    }

    #[test]
    fn test_empty_collector_is_an_error() {
        let collector = ResponseCollector::new();
        let result = ConsensusEngine::new().resolve(
            ConsensusMode::MajorityVote,
            &collector,
            &registry(),
        );
        assert!(matches!(result, Err(ConsensusError::NoViableResponses)));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let collector = collect(&[
            ("strategist", "alpha beta gamma", Some(0.81)),
            ("architect", "alpha beta delta", Some(0.82)),
            ("guardian", "omega", Some(0.83)),
        ]);
        let registry = registry();
        let engine = ConsensusEngine::new();
        for mode in ConsensusMode::ALL {
            let first = engine.resolve(mode, &collector, &registry).unwrap();
            let second = engine.resolve(mode, &collector, &registry).unwrap();
            assert_eq!(first.final_response, second.final_response);
            assert_eq!(first.participants, second.participants);
        }
    }

    #[test]
    fn test_synthesis_prompt_carries_previous_round() {
        let collector = collect(&[
            ("strategist", "first take", Some(0.9)),
            ("guardian", "second take", Some(0.8)),
        ]);
        let successes = collector.successes();
        let prompt = synthesis_prompt("original question", &successes);
        assert!(prompt.contains("original question"));
        assert!(prompt.contains("[strategist] first take"));
        assert!(prompt.contains("[guardian] second take"));
        assert!(prompt.contains("refined answer"));
    }

    #[test]
    fn test_mode_round_trips_config_names() {
        for mode in ConsensusMode::ALL {
            assert_eq!(mode.as_str().parse::<ConsensusMode>().unwrap(), mode);
        }
        assert!("galactic_senate".parse::<ConsensusMode>().is_err());
    }
}
