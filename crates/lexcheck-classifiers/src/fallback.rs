//! Primary/secondary verdict composition
//!
//! The primary strategy (normally the LLM) runs under a per-call deadline.
//! Any failure, whether timeout, transport error, malformed JSON or invalid
//! decision, is logged and the heuristic answers instead. Callers always
//! get a verdict.

use crate::classifier::{Verdict, VerdictClassifier};
use crate::config::ClassifierConfig;
use crate::heuristic::HeuristicVerdictClassifier;
use crate::llm::LlmVerdictClassifier;
use async_trait::async_trait;
use lexcheck_core::retry::with_timeout;
use lexcheck_core::{CompletionClient, ProvisionCandidate, Result, Sentence, StrategyKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Verdict classifier with deterministic fallback
pub struct FallbackVerdictClassifier {
    primary: Option<Arc<dyn VerdictClassifier>>,
    secondary: HeuristicVerdictClassifier,
    timeout: Duration,
}

impl FallbackVerdictClassifier {
    /// Create a fallback classifier
    pub fn new(
        primary: Option<Arc<dyn VerdictClassifier>>,
        secondary: HeuristicVerdictClassifier,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            timeout,
        }
    }

    /// Heuristic only
    pub fn heuristic_only(secondary: HeuristicVerdictClassifier) -> Self {
        Self::new(None, secondary, Duration::from_secs(1))
    }

    /// Build from configuration; the LLM primary is used only when enabled
    /// and a completion client is available
    pub fn from_config(
        config: &ClassifierConfig,
        client: Option<Arc<dyn CompletionClient>>,
    ) -> Self {
        let primary = client
            .filter(|_| config.llm_enabled)
            .map(|c| Arc::new(LlmVerdictClassifier::new(c)) as Arc<dyn VerdictClassifier>);

        Self::new(
            primary,
            HeuristicVerdictClassifier::with_thresholds(config.heuristic),
            Duration::from_millis(config.classify_timeout_ms),
        )
    }

    /// Whether a primary strategy is configured
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Classify, falling back to the heuristic on any primary failure
    pub async fn decide(&self, sentence: &Sentence, candidate: &ProvisionCandidate) -> Verdict {
        if let Some(primary) = &self.primary {
            match with_timeout(self.timeout, primary.classify(sentence, candidate)).await {
                Ok(verdict) => return verdict,
                Err(e) => {
                    warn!(
                        sentence = %sentence.id,
                        provision = %candidate.provision.id,
                        classifier = %primary.name(),
                        error = %e,
                        "Primary classification failed, using heuristic"
                    );
                    metrics::counter!("lexcheck_fallbacks_total", "stage" => "classification")
                        .increment(1);
                }
            }
        }

        self.secondary.verdict_for(candidate.similarity)
    }
}

#[async_trait]
impl VerdictClassifier for FallbackVerdictClassifier {
    async fn classify(
        &self,
        sentence: &Sentence,
        candidate: &ProvisionCandidate,
    ) -> Result<Verdict> {
        Ok(self.decide(sentence, candidate).await)
    }

    fn name(&self) -> &str {
        "fallback"
    }

    fn strategy(&self) -> StrategyKind {
        self.primary
            .as_ref()
            .map_or(StrategyKind::Heuristic, |p| p.strategy())
    }
}
