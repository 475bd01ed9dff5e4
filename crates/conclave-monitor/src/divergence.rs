//! Divergence: normalized disagreement among responses.

use crate::similarity::SimilarityMetric;

/// Computes the divergence score for a set of response texts.
///
/// Divergence is `1 - mean pairwise similarity`, clamped to [0, 1].
/// Fewer than two texts yield 0: a lone response cannot disagree with
/// anything.
pub fn divergence(texts: &[&str], metric: SimilarityMetric) -> f64 {
    if texts.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..texts.len() {
        for j in (i + 1)..texts.len() {
            total += metric.similarity(texts[i], texts[j]);
            pairs += 1;
        }
    }
    let mean_similarity = total / pairs as f64;
    (1.0 - mean_similarity).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_single_are_zero() {
        assert_eq!(divergence(&[], SimilarityMetric::DiceBigram), 0.0);
        assert_eq!(divergence(&["only one"], SimilarityMetric::DiceBigram), 0.0);
    }

    #[test]
    fn test_identical_responses_zero_divergence() {
        let texts = ["pong", "pong", "pong"];
        assert_eq!(divergence(&texts, SimilarityMetric::DiceBigram), 0.0);
    }

    #[test]
    fn test_disjoint_responses_high_divergence() {
        let texts = ["aaaaaaaa", "zzzzzzzz"];
        assert!(divergence(&texts, SimilarityMetric::DiceBigram) > 0.95);
    }

    #[test]
    fn test_mixed_responses_between_extremes() {
        let texts = ["use a mutex here", "use a mutex here", "rewrite it in assembly"];
        let score = divergence(&texts, SimilarityMetric::DiceBigram);
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn test_deterministic() {
        let texts = ["alpha beta", "beta gamma", "gamma delta"];
        let a = divergence(&texts, SimilarityMetric::TokenJaccard);
        let b = divergence(&texts, SimilarityMetric::TokenJaccard);
        assert_eq!(a, b);
    }
}
