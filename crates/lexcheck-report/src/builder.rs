//! Report assembly

use crate::analysis::{
    article_analysis, confidence_summary, suggested_actions, validate_mappings, violations,
    DecisionCounts,
};
use crate::summarizer::{FallbackSummarizer, SummaryRequest, SummaryStats};
use crate::types::{Report, ReportMetadata, ReportSummary, Severity};
use chrono::Utc;
use lexcheck_core::{ComplianceMapping, DocumentMeta, Result};
use tracing::info;
use uuid::Uuid;

/// Everything the builder needs from one analysis run
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub document_meta: DocumentMeta,

    /// Raw document text, used only for the summary excerpt
    pub document_text: String,

    /// Sentences produced by segmentation
    pub total_sentences: usize,

    /// Mappings in sentence order
    pub mappings: Vec<ComplianceMapping>,

    /// Run facts collected by the engine
    pub metadata: ReportMetadata,
}

/// Builds [`Report`]s from mappings
pub struct ReportBuilder {
    summarizer: FallbackSummarizer,
}

impl ReportBuilder {
    /// Create a builder
    pub fn new(summarizer: FallbackSummarizer) -> Self {
        Self { summarizer }
    }

    /// Builder that never calls a summarization model
    pub fn template_only() -> Self {
        Self::new(FallbackSummarizer::template_only())
    }

    /// Validate the mappings and assemble the report.
    ///
    /// Structural faults are returned as [`lexcheck_core::Error::Aggregation`];
    /// no partial report is produced in that case.
    pub async fn build(&self, input: ReportInput) -> Result<Report> {
        validate_mappings(&input.mappings, input.total_sentences)?;

        let counts = DecisionCounts::from_mappings(&input.mappings);
        let overall = counts.overall();
        let confidence = confidence_summary(&input.mappings);
        let articles = article_analysis(&input.mappings);
        let violations = violations(&input.mappings);
        let actions = suggested_actions(&input.mappings, &violations);

        let stats = SummaryStats {
            total_sentences: input.total_sentences,
            total_snippets: input.mappings.len(),
            yes_count: counts.yes,
            no_count: counts.no,
            partial_count: counts.partial,
            high_severity_violations: violations
                .iter()
                .filter(|v| v.severity == Severity::High)
                .count(),
            provisions_referenced: articles.statistics.total_provisions_referenced,
            overall_compliance: overall,
        };
        let request = SummaryRequest::new(&input.document_meta.name, &input.document_text, stats);
        let (summary, summary_fallback) = self.summarizer.summarize_or_template(&request).await;

        let mut metadata = input.metadata;
        metadata.summary_fallback = summary_fallback;

        info!(
            document = %input.document_meta.name,
            mappings = input.mappings.len(),
            violations = violations.len(),
            overall = %overall,
            "Report built"
        );

        Ok(Report {
            report_id: Uuid::new_v4(),
            document_meta: input.document_meta,
            timestamp: Utc::now(),
            summary: ReportSummary {
                executive_summary: summary.executive_summary,
                key_findings: summary.key_findings,
                overall_compliance: overall,
                total_sentences: input.total_sentences,
                total_snippets: input.mappings.len(),
                yes_count: counts.yes,
                no_count: counts.no,
                partial_count: counts.partial,
                compliance_rate: counts.compliance_rate(),
            },
            article_analysis: articles,
            mappings: input.mappings,
            violations,
            confidence_summary: confidence,
            suggested_actions: actions,
            metadata,
        })
    }
}
