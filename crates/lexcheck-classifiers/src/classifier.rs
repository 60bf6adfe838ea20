//! Verdict classifier trait and common types

use async_trait::async_trait;
use lexcheck_core::{Decision, ProvisionCandidate, Result, Sentence, StrategyKind};
use serde::{Deserialize, Serialize};

/// Trait for all verdict classifiers
#[async_trait]
pub trait VerdictClassifier: Send + Sync {
    /// Decide how `sentence` relates to the candidate provision
    async fn classify(
        &self,
        sentence: &Sentence,
        candidate: &ProvisionCandidate,
    ) -> Result<Verdict>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Strategy that produces this classifier's verdicts
    fn strategy(&self) -> StrategyKind;
}

/// Result of classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Compliance decision
    pub decision: Decision,

    /// Confidence in `[0, 100]`
    pub confidence: u8,

    /// Strategy that produced the verdict
    pub strategy: StrategyKind,
}

impl Verdict {
    /// Create a new verdict, clamping confidence to 100
    pub fn new(decision: Decision, confidence: u8, strategy: StrategyKind) -> Self {
        Self {
            decision,
            confidence: confidence.min(100),
            strategy,
        }
    }

    /// Check if confidence reaches `threshold`
    pub fn is_confident(&self, threshold: u8) -> bool {
        self.confidence >= threshold
    }
}
