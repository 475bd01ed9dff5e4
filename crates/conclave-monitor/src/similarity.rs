//! Text similarity metrics.
//!
//! Both metrics return a value in [0, 1] where 1 means identical.
//! They are pure functions of their inputs - no randomness, no state -
//! so divergence scores are reproducible across runs.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The similarity measure used for divergence and response clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Sorensen-Dice coefficient over character bigrams. Sensitive to
    /// phrasing, tolerant of word order.
    #[default]
    DiceBigram,
    /// Jaccard index over lowercased word sets. Coarser, cheaper.
    TokenJaccard,
}

impl SimilarityMetric {
    /// Computes similarity between two texts.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        match self {
            SimilarityMetric::DiceBigram => dice_bigram(a, b),
            SimilarityMetric::TokenJaccard => token_jaccard(a, b),
        }
    }
}

fn bigram_counts(text: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = text.trim().to_lowercase().chars().collect();
    let mut counts = HashMap::new();
    for pair in chars.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

fn dice_bigram(a: &str, b: &str) -> f64 {
    if a.trim().eq_ignore_ascii_case(b.trim()) {
        return 1.0;
    }
    let counts_a = bigram_counts(a);
    let counts_b = bigram_counts(b);
    let total = counts_a.values().sum::<usize>() + counts_b.values().sum::<usize>();
    if total == 0 {
        // Both texts are shorter than one bigram and not equal.
        return 0.0;
    }
    let overlap: usize = counts_a
        .iter()
        .map(|(bigram, count)| count.min(counts_b.get(bigram).unwrap_or(&0)))
        .sum();
    2.0 * overlap as f64 / total as f64
}

fn token_jaccard(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let tokens_b: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_are_similar() {
        for metric in [SimilarityMetric::DiceBigram, SimilarityMetric::TokenJaccard] {
            assert!((metric.similarity("pong", "pong") - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_disjoint_texts_are_dissimilar() {
        let sim = SimilarityMetric::DiceBigram.similarity("aaaa", "zzzz");
        assert!(sim < 0.01);
        let sim = SimilarityMetric::TokenJaccard.similarity("red green", "blue yellow");
        assert!(sim < f64::EPSILON);
    }

    #[test]
    fn test_dice_partial_overlap() {
        let sim = SimilarityMetric::DiceBigram.similarity("night", "nacht");
        assert!(sim > 0.0 && sim < 1.0);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let sim = SimilarityMetric::DiceBigram.similarity("  PONG ", "pong");
        assert!((sim - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_symmetry() {
        for metric in [SimilarityMetric::DiceBigram, SimilarityMetric::TokenJaccard] {
            let ab = metric.similarity("the quick brown fox", "the slow brown dog");
            let ba = metric.similarity("the slow brown dog", "the quick brown fox");
            assert!((ab - ba).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_single_char_texts() {
        // Too short for bigrams: equal is 1, unequal is 0.
        assert!((dice_bigram("a", "a") - 1.0).abs() < f64::EPSILON);
        assert!(dice_bigram("a", "b") < f64::EPSILON);
    }

    #[test]
    fn test_metric_serde_names() {
        let json = serde_json::to_string(&SimilarityMetric::DiceBigram).unwrap();
        assert_eq!(json, "\"dice_bigram\"");
    }
}
