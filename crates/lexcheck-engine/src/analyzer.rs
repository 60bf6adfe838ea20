//! End-to-end compliance analysis
//!
//! ```text
//! text ─> Segmenter ─> BatchOrchestrator ─> ReportBuilder ─> Report
//!                        └─ MappingAggregator (retrieve, classify, explain)
//! ```

use crate::aggregator::MappingAggregator;
use crate::config::AnalysisConfig;
use crate::orchestrator::BatchOrchestrator;
use lexcheck_classifiers::{
    FallbackRationaleGenerator, FallbackVerdictClassifier, RationaleGenerator, VerdictClassifier,
};
use lexcheck_core::{CompletionClient, DocumentMeta, Error, OpenAiClient, Result, Segmenter};
use lexcheck_report::{
    FallbackSummarizer, LlmSummarizer, Report, ReportBuilder, ReportInput, ReportMetadata,
    Summarizer,
};
use lexcheck_retrieval::{ProvisionCorpus, Retriever, SemanticRetriever};
use lexcheck_telemetry::{AuditEvent, AuditEventKind, AuditTrail, MetricsSnapshot, PipelineMetrics};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Output of one analysis run
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: Report,

    /// Hash-chained provenance events of the run
    pub audit_trail: AuditTrail,

    /// Counters collected during the run
    pub metrics: MetricsSnapshot,
}

/// Runs the whole pipeline for one document at a time
pub struct ComplianceAnalyzer {
    config: AnalysisConfig,
    segmenter: Segmenter,
    orchestrator: BatchOrchestrator,
    report_builder: ReportBuilder,
    model: Option<String>,
}

impl ComplianceAnalyzer {
    /// Start building an analyzer
    pub fn builder(config: AnalysisConfig) -> ComplianceAnalyzerBuilder {
        ComplianceAnalyzerBuilder::new(config)
    }

    /// Build an analyzer over a provision corpus.
    ///
    /// The corpus is embedded with the configured provider into an in-memory
    /// index. An LLM client is only created when `classifier.llm_enabled` is
    /// set and an API key is available.
    pub async fn from_corpus(
        config: AnalysisConfig,
        corpus: &ProvisionCorpus,
        api_key: Option<String>,
    ) -> Result<Self> {
        config.validate()?;
        corpus.validate()?;
        if corpus.namespace != config.retrieval.namespace {
            return Err(Error::config(format!(
                "corpus namespace '{}' does not match retrieval.namespace '{}'",
                corpus.namespace, config.retrieval.namespace
            )));
        }

        let embedder = config.embedding.build(api_key.clone())?;
        let index = corpus
            .into_index(embedder.as_ref(), config.retrieval.min_score)
            .await?;
        info!(
            namespace = %corpus.namespace,
            provisions = corpus.provisions.len(),
            embedder = %embedder.name(),
            "Provision index built"
        );
        let retriever = SemanticRetriever::new(embedder, Arc::new(index), corpus.namespace.clone());

        let mut builder = Self::builder(config.clone()).with_retriever(Arc::new(retriever));

        if config.classifier.llm_enabled {
            let mut llm = config.llm.clone();
            if llm.api_key.is_none() {
                llm.api_key = api_key;
            }
            if llm.api_key.is_some() {
                builder = builder.with_completion_client(Arc::new(OpenAiClient::new(llm)?));
            } else {
                warn!("LLM enabled but no API key available, using deterministic strategies");
            }
        }

        builder.build()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse a document
    pub async fn analyze(&self, text: &str, meta: DocumentMeta) -> Result<Analysis> {
        self.analyze_with_cancel(text, meta, CancellationToken::new()).await
    }

    /// Analyse a document, stopping early when `cancel` fires.
    ///
    /// A cancelled run still produces a report over the mappings collected so
    /// far, flagged with `metadata.cancelled`.
    pub async fn analyze_with_cancel(
        &self,
        text: &str,
        meta: DocumentMeta,
        cancel: CancellationToken,
    ) -> Result<Analysis> {
        let started = Instant::now();
        let metrics = PipelineMetrics::new();
        let mut audit = AuditTrail::new();
        let aggregator = self.orchestrator.aggregator();

        audit.add_event(
            AuditEvent::new(AuditEventKind::AnalysisStarted, &meta.name).with_data(json!({
                "namespace": aggregator.namespace(),
                "characters": text.chars().count(),
            })),
        );

        let sentences = self.segmenter.segment(text);
        info!(document = %meta.name, sentences = sentences.len(), "Document segmented");

        let run = self.orchestrator.run(&sentences, &cancel, &metrics).await;

        for mapping in &run.mappings {
            audit.record_mapping(mapping);
        }
        for failure in &run.failed {
            audit.add_event(
                AuditEvent::new(AuditEventKind::SentenceFailed, &failure.sentence_id)
                    .with_data(json!({ "error": failure.error })),
            );
        }

        let metadata = ReportMetadata {
            pipeline_version: env!("CARGO_PKG_VERSION").to_string(),
            classification_strategy: aggregator.classification_strategy().to_string(),
            model: self.model.clone(),
            namespace: aggregator.namespace().to_string(),
            sentences_analyzed: run.analyzed,
            sentences_truncated: run.truncated,
            sentences_unmatched: run.unmatched,
            sentences_failed: run.failed.len(),
            classification_fallbacks: run.classification_fallbacks,
            rationale_fallbacks: run.rationale_fallbacks,
            summary_fallback: false,
            cancelled: run.cancelled,
            chars_per_page: self.config.segmenter.chars_per_page,
            pagination_note: format!(
                "Page numbers are estimates derived from {} characters per page.",
                self.config.segmenter.chars_per_page
            ),
            duration_ms: 0,
            audit_head_hash: None,
        };

        let mut report = self
            .report_builder
            .build(ReportInput {
                document_meta: meta,
                document_text: text.to_string(),
                total_sentences: sentences.len(),
                mappings: run.mappings,
                metadata,
            })
            .await?;

        let built = json!({
            "overallCompliance": report.summary.overall_compliance,
            "mappings": report.summary.total_snippets,
            "violations": report.violations.len(),
        });
        audit.add_event(
            AuditEvent::new(AuditEventKind::ReportBuilt, report.report_id.to_string())
                .with_data(built),
        );
        report.metadata.audit_head_hash = audit.head_hash().map(str::to_string);
        report.metadata.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            document = %report.document_meta.name,
            overall = %report.summary.overall_compliance,
            mappings = report.summary.total_snippets,
            cancelled = report.metadata.cancelled,
            duration_ms = report.metadata.duration_ms,
            "Analysis complete"
        );

        Ok(Analysis {
            report,
            audit_trail: audit,
            metrics: metrics.snapshot(),
        })
    }
}

/// Builder for [`ComplianceAnalyzer`]
pub struct ComplianceAnalyzerBuilder {
    config: AnalysisConfig,
    retriever: Option<Arc<dyn Retriever>>,
    client: Option<Arc<dyn CompletionClient>>,
    classifier: Option<Arc<dyn VerdictClassifier>>,
    rationale: Option<Arc<dyn RationaleGenerator>>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl ComplianceAnalyzerBuilder {
    /// Create a new builder
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            retriever: None,
            client: None,
            classifier: None,
            rationale: None,
            summarizer: None,
        }
    }

    /// Set the retriever (required)
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Completion client shared by every LLM-backed stage
    pub fn with_completion_client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Replace the verdict classifier; errors it returns drop the sentence
    pub fn with_classifier(mut self, classifier: Arc<dyn VerdictClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Replace the rationale generator
    pub fn with_rationale(mut self, rationale: Arc<dyn RationaleGenerator>) -> Self {
        self.rationale = Some(rationale);
        self
    }

    /// Primary summarizer, wrapped with the template fallback
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Build the analyzer
    pub fn build(self) -> Result<ComplianceAnalyzer> {
        let config = self.config;
        config.validate()?;

        let retriever = self
            .retriever
            .ok_or_else(|| Error::config("a retriever is required"))?;
        let client = self.client.filter(|_| config.classifier.llm_enabled);

        let classifier = self.classifier.unwrap_or_else(|| {
            Arc::new(FallbackVerdictClassifier::from_config(&config.classifier, client.clone()))
        });
        let rationale = self.rationale.unwrap_or_else(|| {
            Arc::new(FallbackRationaleGenerator::from_config(&config.classifier, client.clone()))
        });
        let summarizer = self.summarizer.or_else(|| {
            client
                .clone()
                .map(|c| Arc::new(LlmSummarizer::new(c)) as Arc<dyn Summarizer>)
        });

        let aggregator =
            MappingAggregator::new(retriever, classifier, rationale, config.retrieval.top_k);
        let orchestrator = BatchOrchestrator::new(aggregator, config.batch.clone())?;
        let report_builder = ReportBuilder::new(FallbackSummarizer::new(
            summarizer,
            Duration::from_millis(config.report.summary_timeout_ms),
        ));
        let segmenter = Segmenter::new(config.segmenter.clone())?;

        info!(
            namespace = %config.retrieval.namespace,
            classification = %orchestrator.aggregator().classification_strategy(),
            rationale = %orchestrator.aggregator().rationale_strategy(),
            batch_size = config.batch.batch_size,
            max_sentences = config.batch.max_sentences,
            "Compliance analyzer ready"
        );

        Ok(ComplianceAnalyzer {
            model: client.map(|c| c.model().to_string()),
            config,
            segmenter,
            orchestrator,
            report_builder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriever_required() {
        let result = ComplianceAnalyzer::builder(AnalysisConfig::default()).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_corpus_namespace_must_match() {
        let corpus = ProvisionCorpus::from_json(concat!(
            r#"{"namespace":"labour-code","provisions":["#,
            r#"{"id":"s-1","articleNumber":"1","text":"Workers shall be paid weekly."}]}"#
        ))
        .unwrap();
        let result =
            ComplianceAnalyzer::from_corpus(AnalysisConfig::default(), &corpus, None).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
