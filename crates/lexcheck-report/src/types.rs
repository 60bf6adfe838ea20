//! Report data model
//!
//! Everything here serializes to camelCase JSON and is write-once: a
//! [`Report`] is assembled by the builder and only read afterwards.

use chrono::{DateTime, Utc};
use lexcheck_core::{ComplianceMapping, Decision, DocumentMeta, Provision, SnippetLocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Document-level compliance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallCompliance {
    /// Every mapping is YES
    FullyCompliant,
    /// Neither fully compliant nor majority NO
    PartiallyCompliant,
    /// At least half of the mappings are NO
    NonCompliant,
    /// No mappings were produced
    NoData,
}

impl OverallCompliance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullyCompliant => "FULLY_COMPLIANT",
            Self::PartiallyCompliant => "PARTIALLY_COMPLIANT",
            Self::NonCompliant => "NON_COMPLIANT",
            Self::NoData => "NO_DATA",
        }
    }
}

impl fmt::Display for OverallCompliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compliance status of one provision across its mappings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisionStatus {
    Compliant,
    NonCompliant,
    PartiallyCompliant,
}

/// Violation severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Severity for a NO mapping.
    ///
    /// Deliberately inverted: low confidence in a contradiction is treated
    /// as the highest risk because it needs human review.
    pub fn from_confidence(confidence: u8) -> Self {
        match confidence {
            0..=59 => Self::High,
            60..=79 => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority of a suggested action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "URGENT",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headline numbers and narrative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub executive_summary: String,

    pub key_findings: Vec<String>,

    pub overall_compliance: OverallCompliance,

    /// Sentences produced by segmentation
    pub total_sentences: usize,

    /// Number of mappings
    pub total_snippets: usize,

    pub yes_count: usize,

    pub no_count: usize,

    pub partial_count: usize,

    /// Share of YES mappings in percent; 0 when there are no mappings
    pub compliance_rate: f64,
}

/// Confidence distribution across mappings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceSummary {
    /// Confidence >= 85
    pub high: usize,

    /// Confidence 70-84
    pub medium: usize,

    /// Confidence < 70
    pub low: usize,

    /// Mean confidence; 0 when there are no mappings
    pub average: f64,
}

/// One snippet inside a provision group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSnippet {
    pub mapping_id: String,
    pub sentence_id: String,
    pub text: String,
    pub decision: Decision,
    pub confidence: u8,
    pub location: SnippetLocation,
}

/// All mappings that reference one provision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionGroup {
    pub provision: Provision,

    pub status: ProvisionStatus,

    pub mapping_count: usize,

    pub average_confidence: f64,

    pub snippets: Vec<GroupSnippet>,
}

/// Provision counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleStatistics {
    pub total_provisions_referenced: usize,
    pub compliant: usize,
    pub non_compliant: usize,
    pub partially_compliant: usize,
}

/// Article-level breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleAnalysis {
    pub compliant_provisions: Vec<ProvisionGroup>,
    pub non_compliant_provisions: Vec<ProvisionGroup>,
    pub partially_compliant_provisions: Vec<ProvisionGroup>,
    pub statistics: ArticleStatistics,
}

/// A NO mapping presented as a violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub violation_id: String,

    /// Mapping this violation is derived from
    pub mapping_id: String,

    /// Always [`Decision::No`]
    pub decision_source: Decision,

    pub severity: Severity,

    pub description: String,

    pub offending_snippet: String,

    pub snippet_location: SnippetLocation,

    /// e.g. `Article 21 (Protection of life)`
    pub provision_reference: String,

    pub provision_id: String,

    pub why_violates: String,

    pub suggested_fix: String,

    pub next_steps: Vec<String>,

    pub confidence: u8,
}

/// A follow-up recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAction {
    pub priority: Priority,

    pub action: String,

    pub reason: String,

    /// Violation or mapping ids the action covers
    pub related_ids: Vec<String>,
}

/// Run information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub pipeline_version: String,

    /// Strategy configured as primary classifier (`llm` or `heuristic`)
    pub classification_strategy: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub namespace: String,

    pub sentences_analyzed: usize,

    /// Sentences beyond the analysis cap
    pub sentences_truncated: usize,

    /// Sentences without any candidate provision
    pub sentences_unmatched: usize,

    /// Sentences dropped after an error
    pub sentences_failed: usize,

    /// Mappings whose verdict came from the heuristic
    pub classification_fallbacks: usize,

    /// Mappings whose rationale came from the template
    pub rationale_fallbacks: usize,

    pub summary_fallback: bool,

    pub cancelled: bool,

    pub chars_per_page: usize,

    /// Disclaimer for estimated page numbers
    pub pagination_note: String,

    pub duration_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_head_hash: Option<String>,
}

/// The final analysis artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_id: Uuid,
    pub document_meta: DocumentMeta,
    pub timestamp: DateTime<Utc>,
    pub summary: ReportSummary,
    pub article_analysis: ArticleAnalysis,
    pub mappings: Vec<ComplianceMapping>,
    pub violations: Vec<Violation>,
    pub confidence_summary: ConfidenceSummary,
    pub suggested_actions: Vec<SuggestedAction>,
    pub metadata: ReportMetadata,
}

impl Report {
    /// Serialize to pretty JSON
    pub fn to_json(&self) -> lexcheck_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
