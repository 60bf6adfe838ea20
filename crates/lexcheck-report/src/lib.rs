//! LexCheck Report
//!
//! Turns the mappings of one analysis run into the final [`Report`].
//!
//! Provides:
//! - Decision counts, confidence buckets and overall status
//! - Article-level breakdown grouped by provision
//! - Violations with (inverted) confidence-based severity
//! - Suggested actions by severity tier
//! - Executive summary with template fallback
//! - A markdown digest derived from a finished report

pub mod analysis;
pub mod builder;
pub mod digest;
pub mod summarizer;
pub mod types;

pub use builder::{ReportBuilder, ReportInput};
pub use digest::render_markdown;
pub use summarizer::{FallbackSummarizer, LlmSummarizer, Summarizer, Summary, SummaryRequest};
pub use types::{
    ArticleAnalysis, ConfidenceSummary, OverallCompliance, Priority, ProvisionGroup,
    ProvisionStatus, Report, ReportMetadata, ReportSummary, Severity, SuggestedAction, Violation,
};
