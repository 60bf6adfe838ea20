//! Executive summary generation
//!
//! One summarization call per report. When it fails the report still gets a
//! summary: a template naming the document and stating "(summary
//! unavailable)", with key findings derived from the statistics.

use crate::types::OverallCompliance;
use async_trait::async_trait;
use lexcheck_core::retry::with_timeout;
use lexcheck_core::{CompletionClient, CompletionRequest, Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Maximum document characters sent to the summarizer
pub const MAX_EXCERPT_CHARS: usize = 6000;

/// Statistics handed to the summarizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_sentences: usize,
    pub total_snippets: usize,
    pub yes_count: usize,
    pub no_count: usize,
    pub partial_count: usize,
    pub high_severity_violations: usize,
    pub provisions_referenced: usize,
    pub overall_compliance: OverallCompliance,
}

/// Summarizer input
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub document_name: String,
    /// Leading part of the document, at most [`MAX_EXCERPT_CHARS`] chars
    pub excerpt: String,
    pub stats: SummaryStats,
}

impl SummaryRequest {
    /// Build a request, truncating the document text on a char boundary
    pub fn new(document_name: impl Into<String>, document_text: &str, stats: SummaryStats) -> Self {
        Self {
            document_name: document_name.into(),
            excerpt: document_text.chars().take(MAX_EXCERPT_CHARS).collect(),
            stats,
        }
    }
}

/// Executive summary plus key findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub executive_summary: String,
    pub key_findings: Vec<String>,
}

/// Trait for summary backends
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize the analysis
    async fn summarize(&self, request: &SummaryRequest) -> Result<Summary>;

    /// Summarizer name (for logging)
    fn name(&self) -> &str;
}

/// Summary via a completion model in JSON mode
pub struct LlmSummarizer {
    client: Arc<dyn CompletionClient>,
}

impl LlmSummarizer {
    /// Create a new summarizer
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<Summary> {
        let stats = serde_json::to_string(&request.stats)?;
        let prompt = format!(
            "Document: {}\n\nStatistics: {}\n\nDocument text (excerpt):\n{}\n\n\
             Write an executive summary of the document's compliance in 3-5 sentences and \
             list 3-5 key findings. Respond with JSON: \
             {{\"executiveSummary\": string, \"keyFindings\": [string]}}",
            request.document_name, stats, request.excerpt
        );

        let response = self
            .client
            .complete(
                &CompletionRequest::new()
                    .system("You are a legal compliance analyst summarizing an automated review.")
                    .user(prompt)
                    .json(),
            )
            .await?;

        let summary: Summary = response
            .json()
            .map_err(|e| Error::summarization(format!("malformed summary: {}", e)))?;

        if summary.executive_summary.trim().is_empty() {
            return Err(Error::summarization("empty executive summary"));
        }
        Ok(summary)
    }

    fn name(&self) -> &str {
        self.client.name()
    }
}

/// Summary with template fallback
pub struct FallbackSummarizer {
    primary: Option<Arc<dyn Summarizer>>,
    timeout: Duration,
}

impl FallbackSummarizer {
    /// Create a fallback summarizer
    pub fn new(primary: Option<Arc<dyn Summarizer>>, timeout: Duration) -> Self {
        Self { primary, timeout }
    }

    /// Template only
    pub fn template_only() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    /// Summarize; the boolean is true when the template was used
    pub async fn summarize_or_template(&self, request: &SummaryRequest) -> (Summary, bool) {
        if let Some(primary) = &self.primary {
            match with_timeout(self.timeout, primary.summarize(request)).await {
                Ok(summary) => return (summary, false),
                Err(e) => {
                    warn!(
                        document = %request.document_name,
                        summarizer = %primary.name(),
                        error = %e,
                        "Summarization failed, using template"
                    );
                    metrics::counter!("lexcheck_fallbacks_total", "stage" => "summarization")
                        .increment(1);
                }
            }
        }

        (template_summary(request), true)
    }
}

/// Template summary and statistics-derived key findings
pub fn template_summary(request: &SummaryRequest) -> Summary {
    let stats = &request.stats;
    let executive_summary = format!(
        "Compliance analysis of {} (summary unavailable). {} of {} sentences were mapped to \
         provisions; overall status: {}.",
        request.document_name,
        stats.total_snippets,
        stats.total_sentences,
        stats.overall_compliance
    );

    let mut key_findings = Vec::new();
    if stats.total_snippets == 0 {
        key_findings.push("No sentences could be mapped to a provision.".to_string());
    } else {
        key_findings.push(format!(
            "{} of {} mapped sentences align with the referenced provisions.",
            stats.yes_count, stats.total_snippets
        ));
        if stats.no_count > 0 {
            key_findings.push(format!(
                "{} sentence(s) contradict a provision, {} of them high severity.",
                stats.no_count, stats.high_severity_violations
            ));
        }
        if stats.partial_count > 0 {
            key_findings.push(format!(
                "{} sentence(s) only partially align.",
                stats.partial_count
            ));
        }
        key_findings.push(format!(
            "{} distinct provision(s) were referenced.",
            stats.provisions_referenced
        ));
    }

    let unmapped = stats.total_sentences.saturating_sub(stats.total_snippets);
    if unmapped > 0 {
        key_findings.push(format!("{} sentence(s) were not mapped.", unmapped));
    }

    Summary {
        executive_summary,
        key_findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexcheck_core::CompletionResponse;

    struct Canned(String);

    #[async_trait]
    impl CompletionClient for Canned {
        async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse> {
            Ok(CompletionResponse::text(self.0.clone()))
        }
        fn name(&self) -> &str {
            "canned"
        }
        fn model(&self) -> &str {
            "canned"
        }
    }

    fn stats() -> SummaryStats {
        SummaryStats {
            total_sentences: 4,
            total_snippets: 3,
            yes_count: 1,
            no_count: 1,
            partial_count: 1,
            high_severity_violations: 1,
            provisions_referenced: 2,
            overall_compliance: OverallCompliance::PartiallyCompliant,
        }
    }

    fn llm(content: &str) -> FallbackSummarizer {
        let client: Arc<dyn CompletionClient> = Arc::new(Canned(content.to_string()));
        FallbackSummarizer::new(Some(Arc::new(LlmSummarizer::new(client))), Duration::from_secs(1))
    }

    #[test]
    fn test_excerpt_truncated_on_chars() {
        let text = "é".repeat(MAX_EXCERPT_CHARS + 10);
        let request = SummaryRequest::new("doc", &text, stats());
        assert_eq!(request.excerpt.chars().count(), MAX_EXCERPT_CHARS);
    }

    #[test]
    fn test_template_names_document() {
        let summary = template_summary(&SummaryRequest::new("lease.txt", "", stats()));
        assert!(summary.executive_summary.contains("lease.txt"));
        assert!(summary.executive_summary.contains("(summary unavailable)"));
        assert!(summary.key_findings.iter().any(|f| f.contains("contradict")));
        assert!(summary.key_findings.iter().any(|f| f.contains("1 sentence(s) were not mapped")));
    }

    #[tokio::test]
    async fn test_llm_summary_used() {
        let summarizer =
            llm(r#"{"executiveSummary": "Mostly aligned.", "keyFindings": ["One conflict"]}"#);
        let (summary, fallback) = summarizer
            .summarize_or_template(&SummaryRequest::new("doc", "text", stats()))
            .await;

        assert!(!fallback);
        assert_eq!(summary.executive_summary, "Mostly aligned.");
        assert_eq!(summary.key_findings, vec!["One conflict"]);
    }

    #[tokio::test]
    async fn test_malformed_summary_falls_back() {
        let summarizer = llm("Here is your summary: all good");
        let (summary, fallback) = summarizer
            .summarize_or_template(&SummaryRequest::new("contract.pdf", "text", stats()))
            .await;

        assert!(fallback);
        assert!(summary.executive_summary.contains("contract.pdf"));
        assert!(summary.executive_summary.contains("(summary unavailable)"));
    }

    #[tokio::test]
    async fn test_template_only() {
        let (summary, fallback) = FallbackSummarizer::template_only()
            .summarize_or_template(&SummaryRequest::new("doc", "", stats()))
            .await;
        assert!(fallback);
        assert!(!summary.key_findings.is_empty());
    }
}
