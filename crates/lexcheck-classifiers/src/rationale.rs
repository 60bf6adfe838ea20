//! Rationale generation
//!
//! A rationale explains an already-fixed verdict. Generators never see a
//! chance to revise the decision: the verdict is an input, only text comes
//! back.

use crate::classifier::Verdict;
use crate::config::ClassifierConfig;
use async_trait::async_trait;
use lexcheck_core::retry::with_timeout;
use lexcheck_core::{
    CompletionClient, CompletionRequest, Error, ProvisionCandidate, Result, Sentence, StrategyKind,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Explanation text plus the strategy that wrote it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rationale {
    pub text: String,
    pub strategy: StrategyKind,
}

/// Trait for rationale generators
#[async_trait]
pub trait RationaleGenerator: Send + Sync {
    /// Explain `verdict` for the sentence/provision pair
    async fn explain(
        &self,
        sentence: &Sentence,
        candidate: &ProvisionCandidate,
        verdict: &Verdict,
    ) -> Result<Rationale>;

    /// Generator name (for logging)
    fn name(&self) -> &str;

    /// Strategy that writes this generator's rationales
    fn strategy(&self) -> StrategyKind;
}

// =============================================================================
// Template
// =============================================================================

/// Fixed-sentence rationale:
/// `The document text shows {alignment-word} with {provision-id}.`
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRationaleGenerator;

impl TemplateRationaleGenerator {
    /// Render the template
    pub fn render(&self, candidate: &ProvisionCandidate, verdict: &Verdict) -> Rationale {
        Rationale {
            text: format!(
                "The document text shows {} with {}.",
                verdict.decision.alignment_word(),
                candidate.provision.id
            ),
            strategy: StrategyKind::Template,
        }
    }
}

#[async_trait]
impl RationaleGenerator for TemplateRationaleGenerator {
    async fn explain(
        &self,
        _sentence: &Sentence,
        candidate: &ProvisionCandidate,
        verdict: &Verdict,
    ) -> Result<Rationale> {
        Ok(self.render(candidate, verdict))
    }

    fn name(&self) -> &str {
        "template"
    }

    fn strategy(&self) -> StrategyKind {
        StrategyKind::Template
    }
}

// =============================================================================
// LLM
// =============================================================================

/// Asks a completion model for a short explanation
pub struct LlmRationaleGenerator {
    client: Arc<dyn CompletionClient>,
    max_tokens: u32,
}

impl LlmRationaleGenerator {
    /// Create a new generator
    pub fn new(client: Arc<dyn CompletionClient>, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    fn build_request(
        &self,
        sentence: &Sentence,
        candidate: &ProvisionCandidate,
        verdict: &Verdict,
    ) -> CompletionRequest {
        let provision = &candidate.provision;
        let user = format!(
            "Document sentence:\n\"{}\"\n\nProvision {}:\n\"{}\"\n\n\
             The sentence was classified as {} (confidence {}). \
             In 2-3 sentences, explain why. Do not change the classification.",
            sentence.text,
            provision.reference(),
            provision.text,
            verdict.decision,
            verdict.confidence
        );

        CompletionRequest::new()
            .system("You are a legal compliance analyst writing concise, factual explanations.")
            .user(user)
            .with_max_tokens(self.max_tokens)
    }
}

#[async_trait]
impl RationaleGenerator for LlmRationaleGenerator {
    async fn explain(
        &self,
        sentence: &Sentence,
        candidate: &ProvisionCandidate,
        verdict: &Verdict,
    ) -> Result<Rationale> {
        let request = self.build_request(sentence, candidate, verdict);
        let response = self
            .client
            .complete(&request)
            .await
            .map_err(|e| Error::rationale(format!("completion failed: {}", e)))?;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(Error::rationale("model returned an empty rationale"));
        }

        Ok(Rationale {
            text: text.to_string(),
            strategy: StrategyKind::Llm,
        })
    }

    fn name(&self) -> &str {
        self.client.name()
    }

    fn strategy(&self) -> StrategyKind {
        StrategyKind::Llm
    }
}

// =============================================================================
// Fallback
// =============================================================================

/// Primary generator with the template as safety net
pub struct FallbackRationaleGenerator {
    primary: Option<Arc<dyn RationaleGenerator>>,
    template: TemplateRationaleGenerator,
    timeout: Duration,
}

impl FallbackRationaleGenerator {
    /// Create a fallback generator
    pub fn new(primary: Option<Arc<dyn RationaleGenerator>>, timeout: Duration) -> Self {
        Self {
            primary,
            template: TemplateRationaleGenerator,
            timeout,
        }
    }

    /// Template only
    pub fn template_only() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    /// Build from configuration
    pub fn from_config(
        config: &ClassifierConfig,
        client: Option<Arc<dyn CompletionClient>>,
    ) -> Self {
        let primary = client.filter(|_| config.llm_enabled).map(|c| {
            Arc::new(LlmRationaleGenerator::new(c, config.rationale_max_tokens))
                as Arc<dyn RationaleGenerator>
        });
        Self::new(primary, Duration::from_millis(config.rationale_timeout_ms))
    }

    /// Explain the verdict, falling back to the template on any failure
    pub async fn describe(
        &self,
        sentence: &Sentence,
        candidate: &ProvisionCandidate,
        verdict: &Verdict,
    ) -> Rationale {
        if let Some(primary) = &self.primary {
            match with_timeout(self.timeout, primary.explain(sentence, candidate, verdict)).await {
                Ok(rationale) => return rationale,
                Err(e) => {
                    warn!(
                        sentence = %sentence.id,
                        provision = %candidate.provision.id,
                        generator = %primary.name(),
                        error = %e,
                        "Rationale generation failed, using template"
                    );
                    metrics::counter!("lexcheck_fallbacks_total", "stage" => "rationale")
                        .increment(1);
                }
            }
        }

        self.template.render(candidate, verdict)
    }
}

#[async_trait]
impl RationaleGenerator for FallbackRationaleGenerator {
    async fn explain(
        &self,
        sentence: &Sentence,
        candidate: &ProvisionCandidate,
        verdict: &Verdict,
    ) -> Result<Rationale> {
        Ok(self.describe(sentence, candidate, verdict).await)
    }

    fn name(&self) -> &str {
        "fallback"
    }

    fn strategy(&self) -> StrategyKind {
        self.primary
            .as_ref()
            .map_or(StrategyKind::Template, |p| p.strategy())
    }
}
