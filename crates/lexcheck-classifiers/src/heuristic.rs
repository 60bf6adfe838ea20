//! Similarity-threshold classifier
//!
//! Deterministic secondary strategy. The retrieval similarity alone decides the
//! verdict:
//! - `sim >= 0.85`: YES
//! - `0.70 <= sim < 0.85`: PARTIAL
//! - `sim < 0.70`: NO
//!
//! Confidence is `round(sim * 100)`, clamped to `[0, 100]`.

use crate::classifier::{Verdict, VerdictClassifier};
use crate::config::HeuristicThresholds;
use async_trait::async_trait;
use lexcheck_core::{Decision, ProvisionCandidate, Result, Sentence, StrategyKind};

/// Classifier that maps retrieval similarity onto a decision
#[derive(Debug, Clone, Default)]
pub struct HeuristicVerdictClassifier {
    thresholds: HeuristicThresholds,
}

impl HeuristicVerdictClassifier {
    /// Create a classifier with the default 0.85 / 0.70 thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with custom thresholds
    pub fn with_thresholds(thresholds: HeuristicThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify a bare similarity score
    pub fn verdict_for(&self, similarity: f64) -> Verdict {
        let similarity = if similarity.is_nan() { 0.0 } else { similarity };

        let decision = if similarity >= self.thresholds.yes {
            Decision::Yes
        } else if similarity >= self.thresholds.partial {
            Decision::Partial
        } else {
            Decision::No
        };

        let confidence = (similarity * 100.0).round().clamp(0.0, 100.0) as u8;
        Verdict::new(decision, confidence, StrategyKind::Heuristic)
    }
}

#[async_trait]
impl VerdictClassifier for HeuristicVerdictClassifier {
    async fn classify(
        &self,
        _sentence: &Sentence,
        candidate: &ProvisionCandidate,
    ) -> Result<Verdict> {
        Ok(self.verdict_for(candidate.similarity))
    }

    fn name(&self) -> &str {
        "similarity-heuristic"
    }

    fn strategy(&self) -> StrategyKind {
        StrategyKind::Heuristic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_threshold_boundaries() {
        let classifier = HeuristicVerdictClassifier::new();

        assert_eq!(classifier.verdict_for(0.69).decision, Decision::No);
        assert_eq!(classifier.verdict_for(0.70).decision, Decision::Partial);
        assert_eq!(classifier.verdict_for(0.84).decision, Decision::Partial);
        assert_eq!(classifier.verdict_for(0.85).decision, Decision::Yes);
    }

    #[test]
    fn test_confidence_rounds_similarity() {
        let classifier = HeuristicVerdictClassifier::new();

        assert_eq!(classifier.verdict_for(0.90).confidence, 90);
        assert_eq!(classifier.verdict_for(0.755).confidence, 76);
        assert_eq!(classifier.verdict_for(1.5).confidence, 100);
        assert_eq!(classifier.verdict_for(-0.2).confidence, 0);
        assert_eq!(classifier.verdict_for(f64::NAN).decision, Decision::No);
    }

    #[test]
    fn test_strategy_is_heuristic() {
        let verdict = HeuristicVerdictClassifier::new().verdict_for(0.5);
        assert_eq!(verdict.strategy, StrategyKind::Heuristic);
    }

    proptest! {
        #[test]
        fn prop_confidence_in_range(sim in -1.0f64..2.0) {
            let verdict = HeuristicVerdictClassifier::new().verdict_for(sim);
            prop_assert!(verdict.confidence <= 100);
        }

        #[test]
        fn prop_decision_monotonic(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let classifier = HeuristicVerdictClassifier::new();
            let rank = |d: Decision| match d {
                Decision::No => 0,
                Decision::Partial => 1,
                Decision::Yes => 2,
            };
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                rank(classifier.verdict_for(lo).decision)
                    <= rank(classifier.verdict_for(hi).decision)
            );
        }

        #[test]
        fn prop_deterministic(sim in 0.0f64..1.0) {
            let classifier = HeuristicVerdictClassifier::new();
            prop_assert_eq!(classifier.verdict_for(sim), classifier.verdict_for(sim));
        }
    }
}
