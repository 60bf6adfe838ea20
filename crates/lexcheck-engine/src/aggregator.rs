//! Per-sentence mapping
//!
//! Retrieve, classify, explain, assemble. One sentence yields at most one
//! [`ComplianceMapping`]; a sentence with no candidate is an explicit
//! omission, not a failure.

use chrono::Utc;
use lexcheck_classifiers::{RationaleGenerator, TemplateRationaleGenerator, VerdictClassifier};
use lexcheck_core::{
    AlternateMatch, ComplianceMapping, Error, Provenance, Result, Sentence, SentenceRef,
    SnippetLocation, StrategyKind,
};
use lexcheck_retrieval::Retriever;
use std::sync::Arc;
use tracing::{debug, warn};

/// What happened to one sentence
#[derive(Debug)]
pub enum MappingOutcome {
    /// A mapping was produced
    Mapped(ComplianceMapping),

    /// Retrieval returned no candidate
    Unmatched,

    /// The sentence could not be processed
    Failed(Error),
}

impl MappingOutcome {
    /// Mapping, if one was produced
    pub fn mapping(&self) -> Option<&ComplianceMapping> {
        match self {
            Self::Mapped(mapping) => Some(mapping),
            _ => None,
        }
    }
}

/// Links sentences to provisions
pub struct MappingAggregator {
    retriever: Arc<dyn Retriever>,
    classifier: Arc<dyn VerdictClassifier>,
    rationale: Arc<dyn RationaleGenerator>,
    template: TemplateRationaleGenerator,
    top_k: usize,
}

impl MappingAggregator {
    /// Create an aggregator
    pub fn new(
        retriever: Arc<dyn Retriever>,
        classifier: Arc<dyn VerdictClassifier>,
        rationale: Arc<dyn RationaleGenerator>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            classifier,
            rationale,
            template: TemplateRationaleGenerator,
            top_k,
        }
    }

    /// Strategy the classifier uses when its primary path succeeds
    pub fn classification_strategy(&self) -> StrategyKind {
        self.classifier.strategy()
    }

    /// Strategy the rationale generator uses when its primary path succeeds
    pub fn rationale_strategy(&self) -> StrategyKind {
        self.rationale.strategy()
    }

    /// Namespace searched by the retriever
    pub fn namespace(&self) -> &str {
        self.retriever.namespace()
    }

    /// Map one sentence.
    ///
    /// `Ok(None)` means no candidate was found. Retrieval and classification
    /// errors are returned; a rationale error falls back to the template.
    pub async fn map_sentence(&self, sentence: &Sentence) -> Result<Option<ComplianceMapping>> {
        let mut candidates = self.retriever.retrieve(&sentence.text, self.top_k).await?;
        if candidates.is_empty() {
            debug!(sentence = %sentence.id, "No candidate provision");
            return Ok(None);
        }

        let primary = candidates.remove(0);
        let verdict = self.classifier.classify(sentence, &primary).await?;

        let rationale = match self.rationale.explain(sentence, &primary, &verdict).await {
            Ok(rationale) => rationale,
            Err(e) => {
                warn!(
                    sentence = %sentence.id,
                    provision = %primary.provision.id,
                    error = %e,
                    "Rationale failed, using template"
                );
                self.template.render(&primary, &verdict)
            }
        };

        let provenance = Provenance {
            retrieval_score: primary.similarity,
            query_used: sentence.text.clone(),
            timestamp: Utc::now(),
            vector_id: primary.vector_id.clone(),
            namespace: self.retriever.namespace().to_string(),
        };

        let alternate_matches = candidates
            .into_iter()
            .map(|c| AlternateMatch {
                provision: c.provision,
                similarity: c.similarity,
            })
            .collect();

        debug!(
            sentence = %sentence.id,
            provision = %primary.provision.id,
            decision = %verdict.decision,
            confidence = verdict.confidence,
            "Sentence mapped"
        );

        Ok(Some(ComplianceMapping {
            mapping_id: ComplianceMapping::id_for(sentence.sequence),
            sentence_ref: SentenceRef {
                sentence_id: sentence.id.clone(),
                sequence: sentence.sequence,
                text: sentence.text.clone(),
            },
            snippet_location: SnippetLocation::from(sentence),
            similarity_score: primary.similarity,
            provision_match: primary.provision,
            decision: verdict.decision,
            confidence: verdict.confidence,
            rationale: rationale.text,
            provenance,
            alternate_matches,
            classification_strategy: verdict.strategy,
            rationale_strategy: rationale.strategy,
        }))
    }

    /// Map one sentence, folding every result into a [`MappingOutcome`]
    pub async fn outcome(&self, sentence: &Sentence) -> MappingOutcome {
        match self.map_sentence(sentence).await {
            Ok(Some(mapping)) => MappingOutcome::Mapped(mapping),
            Ok(None) => MappingOutcome::Unmatched,
            Err(e) => MappingOutcome::Failed(e),
        }
    }
}
