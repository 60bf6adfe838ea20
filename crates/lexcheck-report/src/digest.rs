//! Markdown digest of a finished report
//!
//! Pure formatting: the digest is derived from a [`Report`] without
//! re-running any analysis.

use crate::types::{ProvisionGroup, Report};
use std::fmt::Write;

/// Render a markdown digest
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &Report) -> std::fmt::Result {
    let summary = &report.summary;

    writeln!(out, "# Compliance report: {}", report.document_meta.name)?;
    writeln!(out)?;
    writeln!(out, "- Report: `{}`", report.report_id)?;
    writeln!(out, "- Generated: {}", report.timestamp.to_rfc3339())?;
    writeln!(out, "- Overall compliance: **{}**", summary.overall_compliance)?;
    writeln!(
        out,
        "- Sentences: {} analysed, {} mapped ({} YES / {} PARTIAL / {} NO)",
        summary.total_sentences,
        summary.total_snippets,
        summary.yes_count,
        summary.partial_count,
        summary.no_count
    )?;
    if report.metadata.cancelled {
        writeln!(out, "- Run was cancelled; results are partial")?;
    }
    writeln!(out)?;

    writeln!(out, "## Executive summary")?;
    writeln!(out)?;
    writeln!(out, "{}", summary.executive_summary)?;
    writeln!(out)?;

    if !summary.key_findings.is_empty() {
        writeln!(out, "## Key findings")?;
        writeln!(out)?;
        for finding in &summary.key_findings {
            writeln!(out, "- {}", finding)?;
        }
        writeln!(out)?;
    }

    if !report.violations.is_empty() {
        writeln!(out, "## Violations")?;
        writeln!(out)?;
        writeln!(out, "| Id | Severity | Provision | Confidence | Location |")?;
        writeln!(out, "|----|----------|-----------|------------|----------|")?;
        for v in &report.violations {
            writeln!(
                out,
                "| {} | {} | {} | {} | p.{} ¶{} l.{} |",
                v.violation_id,
                v.severity,
                v.provision_reference,
                v.confidence,
                v.snippet_location.page,
                v.snippet_location.paragraph,
                v.snippet_location.line
            )?;
        }
        writeln!(out)?;
        for v in &report.violations {
            writeln!(out, "### {} ({})", v.violation_id, v.severity)?;
            writeln!(out)?;
            writeln!(out, "> {}", v.offending_snippet)?;
            writeln!(out)?;
            writeln!(out, "{}", v.why_violates)?;
            writeln!(out)?;
            writeln!(out, "Suggested fix: {}", v.suggested_fix)?;
            writeln!(out)?;
        }
    }

    let articles = &report.article_analysis;
    if articles.statistics.total_provisions_referenced > 0 {
        writeln!(out, "## Provisions")?;
        writeln!(out)?;
        write_groups(out, "Non-compliant", &articles.non_compliant_provisions)?;
        write_groups(out, "Partially compliant", &articles.partially_compliant_provisions)?;
        write_groups(out, "Compliant", &articles.compliant_provisions)?;
    }

    if !report.suggested_actions.is_empty() {
        writeln!(out, "## Suggested actions")?;
        writeln!(out)?;
        for action in &report.suggested_actions {
            writeln!(out, "- **{}**: {}", action.priority, action.action)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "---")?;
    writeln!(out)?;
    writeln!(out, "_{}_", report.metadata.pagination_note)?;
    Ok(())
}

fn write_groups(out: &mut String, title: &str, groups: &[ProvisionGroup]) -> std::fmt::Result {
    if groups.is_empty() {
        return Ok(());
    }
    writeln!(out, "### {}", title)?;
    writeln!(out)?;
    for group in groups {
        writeln!(
            out,
            "- {}: {} mapping(s), average confidence {:.1}",
            group.provision.reference(),
            group.mapping_count,
            group.average_confidence
        )?;
    }
    writeln!(out)
}
