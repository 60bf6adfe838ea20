//! End-to-end pipeline tests
//!
//! A scripted retriever returns fixed similarities per sentence so the
//! deterministic strategies produce known decisions.

use async_trait::async_trait;
use lexcheck_core::{
    CompletionClient, CompletionRequest, CompletionResponse, Decision, DocumentMeta, Error,
    Provision, ProvisionCandidate, ResponseFormat, Result, StrategyKind,
};
use lexcheck_engine::{AnalysisConfig, CancellationToken, ComplianceAnalyzer};
use lexcheck_report::OverallCompliance;
use lexcheck_retrieval::{ProvisionCorpus, Retriever};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DOCUMENT: &str = "Employees may express opinions through free speech at work. \
Hiring decisions respect equality of opportunity for every applicant. \
Staff may be required to perform forced labour without pay.";

// ============================================================================
// Mocks
// ============================================================================

fn provision(id: &str, heading: &str) -> Provision {
    Provision {
        id: id.to_string(),
        article_number: id.trim_start_matches("article-").to_string(),
        heading: heading.to_string(),
        part: "III".to_string(),
        part_name: "Fundamental Rights".to_string(),
        text: format!("{} is guaranteed.", heading),
        start_char: 0,
        end_char: 0,
    }
}

/// Retriever keyed on words in the sentence
struct ScriptedRetriever {
    rules: Vec<(&'static str, &'static str, f64)>,
    call_count: AtomicU32,
    queries: Mutex<Vec<String>>,
    cancel_on_first_call: Option<CancellationToken>,
}

impl ScriptedRetriever {
    fn new() -> Self {
        Self {
            rules: vec![
                ("speech", "article-19", 0.90),
                ("equality", "article-14", 0.75),
                ("forced labour", "article-23", 0.40),
            ],
            call_count: AtomicU32::new(0),
            queries: Mutex::new(Vec::new()),
            cancel_on_first_call: None,
        }
    }

    fn cancelling(token: CancellationToken) -> Self {
        Self {
            cancel_on_first_call: Some(token),
            ..Self::new()
        }
    }

    fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for ScriptedRetriever {
    async fn retrieve(&self, text: &str, k: usize) -> Result<Vec<ProvisionCandidate>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(text.to_string());
        if let Some(token) = &self.cancel_on_first_call {
            token.cancel();
        }

        Ok(self
            .rules
            .iter()
            .filter(|(word, _, _)| text.contains(word))
            .take(k)
            .map(|(_, id, sim)| {
                ProvisionCandidate::new(provision(id, id), *sim, format!("constitution/{}", id))
            })
            .collect())
    }

    fn namespace(&self) -> &str {
        "constitution"
    }
}

/// Retriever that fails for sentences mentioning `poison`
struct PartlyFailingRetriever {
    inner: ScriptedRetriever,
    poison: &'static str,
}

#[async_trait]
impl Retriever for PartlyFailingRetriever {
    async fn retrieve(&self, text: &str, k: usize) -> Result<Vec<ProvisionCandidate>> {
        if text.contains(self.poison) {
            return Err(Error::retrieval("index unavailable"));
        }
        self.inner.retrieve(text, k).await
    }

    fn namespace(&self) -> &str {
        "constitution"
    }
}

/// Completion client answering each pipeline stage
struct RoutingClient {
    call_count: AtomicU32,
}

#[async_trait]
impl CompletionClient for RoutingClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let content = if prompt.contains("executive summary") {
            concat!(
                r#"{"executiveSummary":"The handbook conflicts with Article 23.","#,
                r#""keyFindings":["Forced labour clause"]}"#
            )
        } else if request.response_format == ResponseFormat::Json {
            r#"{"decision":"NO","confidence":88}"#
        } else {
            "The clause contradicts the provision."
        };
        Ok(CompletionResponse::text(content))
    }

    fn name(&self) -> &str {
        "routing"
    }

    fn model(&self) -> &str {
        "routing-model"
    }
}

fn offline_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.classifier.llm_enabled = false;
    config.batch.inter_batch_delay_ms = 0;
    config
}

fn analyzer(config: AnalysisConfig, retriever: Arc<dyn Retriever>) -> ComplianceAnalyzer {
    ComplianceAnalyzer::builder(config)
        .with_retriever(retriever)
        .build()
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_similarity_drives_decisions() {
    let analyzer = analyzer(offline_config(), Arc::new(ScriptedRetriever::new()));
    let analysis = analyzer.analyze(DOCUMENT, DocumentMeta::new("handbook.txt")).await.unwrap();
    let report = &analysis.report;

    let decisions: Vec<Decision> = report.mappings.iter().map(|m| m.decision).collect();
    assert_eq!(decisions, vec![Decision::Yes, Decision::Partial, Decision::No]);
    assert_eq!(report.summary.overall_compliance, OverallCompliance::PartiallyCompliant);
    assert_eq!(report.summary.total_sentences, 3);
    assert_eq!(report.summary.total_snippets, 3);

    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].provision_id, "article-23");
    assert_eq!(report.violations[0].decision_source, Decision::No);

    assert!(report
        .mappings
        .iter()
        .all(|m| m.classification_strategy == StrategyKind::Heuristic));
    assert_eq!(report.metadata.classification_strategy, "heuristic");
    assert_eq!(report.metadata.classification_fallbacks, 0);
    assert!(report.metadata.summary_fallback);
}

#[tokio::test]
async fn test_empty_document_is_no_data() {
    let retriever = Arc::new(ScriptedRetriever::new());
    let analyzer = analyzer(offline_config(), retriever.clone());
    let analysis = analyzer.analyze("", DocumentMeta::new("empty.txt")).await.unwrap();
    let report = &analysis.report;

    assert_eq!(report.summary.total_sentences, 0);
    assert_eq!(report.summary.total_snippets, 0);
    assert!(report.mappings.is_empty());
    assert_eq!(report.summary.overall_compliance, OverallCompliance::NoData);
    assert_eq!(retriever.call_count(), 0);
}

#[tokio::test]
async fn test_failed_sentence_is_dropped() {
    let retriever = Arc::new(PartlyFailingRetriever {
        inner: ScriptedRetriever::new(),
        poison: "equality",
    });
    let analyzer = analyzer(offline_config(), retriever);
    let analysis = analyzer.analyze(DOCUMENT, DocumentMeta::new("handbook.txt")).await.unwrap();
    let report = &analysis.report;

    assert_eq!(report.mappings.len(), 2);
    assert_eq!(report.metadata.sentences_failed, 1);
    assert_eq!(report.metadata.sentences_analyzed, 3);
    assert_eq!(analysis.metrics.failures, 1);
    assert!(report.mappings.iter().all(|m| m.provision_match.id != "article-14"));
}

#[tokio::test]
async fn test_coverage_bound() {
    let text = format!("{} The canteen opens at nine every morning.", DOCUMENT);
    let analyzer = analyzer(offline_config(), Arc::new(ScriptedRetriever::new()));

    let partial = analyzer.analyze(&text, DocumentMeta::new("a.txt")).await.unwrap();
    assert_eq!(partial.report.summary.total_sentences, 4);
    assert_eq!(partial.report.mappings.len(), 3);
    assert_eq!(partial.report.metadata.sentences_unmatched, 1);

    let full = analyzer.analyze(DOCUMENT, DocumentMeta::new("b.txt")).await.unwrap();
    assert_eq!(full.report.mappings.len(), full.report.summary.total_sentences);
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let analyzer = analyzer(offline_config(), Arc::new(ScriptedRetriever::new()));
    let first = analyzer.analyze(DOCUMENT, DocumentMeta::new("a.txt")).await.unwrap().report;
    let second = analyzer.analyze(DOCUMENT, DocumentMeta::new("a.txt")).await.unwrap().report;

    let key = |r: &lexcheck_report::Report| {
        r.mappings
            .iter()
            .map(|m| {
                (
                    m.mapping_id.clone(),
                    m.provision_match.id.clone(),
                    m.decision,
                    m.confidence,
                    m.rationale.clone(),
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(key(&first), key(&second));
    assert_eq!(first.summary.overall_compliance, second.summary.overall_compliance);
    assert_eq!(first.violations.len(), second.violations.len());
}

#[tokio::test]
async fn test_sentence_cap_truncates() {
    let mut config = offline_config();
    config.batch.max_sentences = 2;
    let retriever = Arc::new(ScriptedRetriever::new());
    let analyzer = analyzer(config, retriever.clone());

    let analysis = analyzer.analyze(DOCUMENT, DocumentMeta::new("a.txt")).await.unwrap();
    assert_eq!(analysis.report.mappings.len(), 2);
    assert_eq!(analysis.report.metadata.sentences_truncated, 1);
    assert_eq!(analysis.report.metadata.sentences_analyzed, 2);
    assert_eq!(retriever.call_count(), 2);
}

#[tokio::test]
async fn test_mappings_follow_sentence_order() {
    let mut config = offline_config();
    config.batch.batch_size = 2;
    let analyzer = analyzer(config, Arc::new(ScriptedRetriever::new()));

    let analysis = analyzer.analyze(DOCUMENT, DocumentMeta::new("a.txt")).await.unwrap();
    let ids: Vec<&str> = analysis.report.mappings.iter().map(|m| m.mapping_id.as_str()).collect();
    assert_eq!(ids, vec!["map-0001", "map-0002", "map-0003"]);
    assert_eq!(analysis.metrics.batches, 2);
}

#[tokio::test]
async fn test_cancellation_keeps_partial_results() {
    let mut config = offline_config();
    config.batch.batch_size = 1;
    config.batch.inter_batch_delay_ms = 60_000;

    let token = CancellationToken::new();
    let retriever = Arc::new(ScriptedRetriever::cancelling(token.clone()));
    let analyzer = analyzer(config, retriever.clone());

    let analysis = tokio::time::timeout(
        Duration::from_secs(5),
        analyzer.analyze_with_cancel(DOCUMENT, DocumentMeta::new("a.txt"), token),
    )
    .await
    .expect("cancellation should interrupt the inter-batch delay")
    .unwrap();

    assert!(analysis.report.metadata.cancelled);
    assert_eq!(analysis.report.mappings.len(), 1);
    assert_eq!(analysis.report.metadata.sentences_analyzed, 1);
    assert_eq!(retriever.call_count(), 1);
}

#[tokio::test]
async fn test_provenance_and_audit_trail() {
    let retriever = Arc::new(ScriptedRetriever::new());
    let analyzer = analyzer(offline_config(), retriever.clone());
    let analysis = analyzer.analyze(DOCUMENT, DocumentMeta::new("a.txt")).await.unwrap();

    let queries = retriever.queries.lock().unwrap().clone();
    for mapping in &analysis.report.mappings {
        assert!(queries.contains(&mapping.provenance.query_used));
        assert_eq!(mapping.provenance.namespace, "constitution");
        assert_eq!(
            mapping.provenance.vector_id,
            format!("constitution/{}", mapping.provision_match.id)
        );
        let located: String = DOCUMENT
            .chars()
            .skip(mapping.snippet_location.start_char)
            .take(mapping.snippet_location.end_char - mapping.snippet_location.start_char)
            .collect();
        assert_eq!(located, mapping.sentence_ref.text);
    }

    // started + 3 mappings + report
    assert_eq!(analysis.audit_trail.len(), 5);
    assert!(analysis.audit_trail.verify());
    assert_eq!(
        analysis.report.metadata.audit_head_hash.as_deref(),
        analysis.audit_trail.head_hash()
    );
}

#[tokio::test]
async fn test_llm_strategies_when_enabled() {
    let mut config = offline_config();
    config.classifier.llm_enabled = true;

    let client = Arc::new(RoutingClient {
        call_count: AtomicU32::new(0),
    });
    let analyzer = ComplianceAnalyzer::builder(config)
        .with_retriever(Arc::new(ScriptedRetriever::new()))
        .with_completion_client(client.clone() as Arc<dyn CompletionClient>)
        .build()
        .unwrap();

    let analysis = analyzer.analyze(DOCUMENT, DocumentMeta::new("a.txt")).await.unwrap();
    let report = &analysis.report;

    assert!(report.mappings.iter().all(|m| m.decision == Decision::No && m.confidence == 88));
    assert!(report.mappings.iter().all(|m| m.classification_strategy == StrategyKind::Llm));
    assert!(report.mappings.iter().all(|m| m.rationale_strategy == StrategyKind::Llm));
    assert_eq!(report.summary.overall_compliance, OverallCompliance::NonCompliant);
    assert_eq!(report.summary.executive_summary, "The handbook conflicts with Article 23.");
    assert!(!report.metadata.summary_fallback);
    assert_eq!(report.metadata.model.as_deref(), Some("routing-model"));

    // classify + explain per sentence, one summary
    assert_eq!(client.call_count.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn test_from_corpus_with_hashing_embedder() {
    let corpus = ProvisionCorpus::from_json(
        r#"{
            "namespace": "constitution",
            "provisions": [
                {"id": "article-19", "articleNumber": "19", "heading": "Freedom of speech",
                 "text": "All citizens shall have the right to freedom of speech and expression."},
                {"id": "article-23", "articleNumber": "23",
                 "heading": "Prohibition of forced labour",
                 "text": "Traffic in human beings and forced labour are prohibited."}
            ]
        }"#,
    )
    .unwrap();

    let analyzer = ComplianceAnalyzer::from_corpus(offline_config(), &corpus, None)
        .await
        .unwrap();
    let analysis = analyzer
        .analyze(
            "Workers have the right to freedom of speech and expression.",
            DocumentMeta::new("memo.txt"),
        )
        .await
        .unwrap();

    assert_eq!(analysis.report.mappings.len(), 1);
    let mapping = &analysis.report.mappings[0];
    assert_eq!(mapping.provision_match.id, "article-19");
    assert!(mapping.similarity_score > 0.5);
}
