//! Pure report computations over a set of mappings
//!
//! Nothing here performs I/O; every function is a deterministic function of
//! its input mappings.

use crate::types::{
    ArticleAnalysis, ArticleStatistics, ConfidenceSummary, GroupSnippet, OverallCompliance,
    Priority, ProvisionGroup, ProvisionStatus, Severity, SuggestedAction, Violation,
};
use lexcheck_core::{ComplianceMapping, Decision, Error, Result, SnippetLocation};
use std::collections::{HashMap, HashSet};

/// Confidence at or above which a mapping counts as high confidence
pub const HIGH_CONFIDENCE: u8 = 85;

/// Confidence below which a mapping counts as low confidence
pub const LOW_CONFIDENCE: u8 = 70;

/// Decision counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionCounts {
    pub yes: usize,
    pub no: usize,
    pub partial: usize,
}

impl DecisionCounts {
    /// Count decisions
    pub fn from_mappings(mappings: &[ComplianceMapping]) -> Self {
        let mut counts = Self::default();
        for mapping in mappings {
            match mapping.decision {
                Decision::Yes => counts.yes += 1,
                Decision::No => counts.no += 1,
                Decision::Partial => counts.partial += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.yes + self.no + self.partial
    }

    /// Share of YES in percent, one decimal
    pub fn compliance_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            round1(self.yes as f64 * 100.0 / self.total() as f64)
        }
    }

    /// Document-level status; zero mappings is [`OverallCompliance::NoData`]
    pub fn overall(&self) -> OverallCompliance {
        let total = self.total();
        if total == 0 {
            OverallCompliance::NoData
        } else if self.yes == total {
            OverallCompliance::FullyCompliant
        } else if self.no * 2 >= total {
            OverallCompliance::NonCompliant
        } else {
            OverallCompliance::PartiallyCompliant
        }
    }
}

/// Bucket confidences into high/medium/low
pub fn confidence_summary(mappings: &[ComplianceMapping]) -> ConfidenceSummary {
    let mut summary = ConfidenceSummary::default();
    if mappings.is_empty() {
        return summary;
    }

    let mut sum = 0u64;
    for mapping in mappings {
        sum += u64::from(mapping.confidence);
        if mapping.confidence >= HIGH_CONFIDENCE {
            summary.high += 1;
        } else if mapping.confidence >= LOW_CONFIDENCE {
            summary.medium += 1;
        } else {
            summary.low += 1;
        }
    }
    summary.average = round1(sum as f64 / mappings.len() as f64);
    summary
}

/// Status of a provision given the decisions of its mappings
pub fn provision_status(decisions: impl IntoIterator<Item = Decision>) -> ProvisionStatus {
    let mut all_yes = true;
    let mut all_no = true;
    for decision in decisions {
        all_yes &= decision == Decision::Yes;
        all_no &= decision == Decision::No;
    }

    match (all_yes, all_no) {
        (true, _) => ProvisionStatus::Compliant,
        (_, true) => ProvisionStatus::NonCompliant,
        _ => ProvisionStatus::PartiallyCompliant,
    }
}

/// Group mappings by provision id, in order of first reference
pub fn article_analysis(mappings: &[ComplianceMapping]) -> ArticleAnalysis {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&ComplianceMapping>> = HashMap::new();
    for mapping in mappings {
        let id = mapping.provision_match.id.as_str();
        groups
            .entry(id)
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(mapping);
    }

    let mut analysis = ArticleAnalysis::default();
    for id in order {
        let members = &groups[id];
        let group = build_group(members);
        match group.status {
            ProvisionStatus::Compliant => analysis.compliant_provisions.push(group),
            ProvisionStatus::NonCompliant => analysis.non_compliant_provisions.push(group),
            ProvisionStatus::PartiallyCompliant => {
                analysis.partially_compliant_provisions.push(group)
            }
        }
    }

    analysis.statistics = ArticleStatistics {
        total_provisions_referenced: groups.len(),
        compliant: analysis.compliant_provisions.len(),
        non_compliant: analysis.non_compliant_provisions.len(),
        partially_compliant: analysis.partially_compliant_provisions.len(),
    };
    analysis
}

fn build_group(members: &[&ComplianceMapping]) -> ProvisionGroup {
    let status = provision_status(members.iter().map(|m| m.decision));
    let sum: u64 = members.iter().map(|m| u64::from(m.confidence)).sum();

    ProvisionGroup {
        provision: members[0].provision_match.clone(),
        status,
        mapping_count: members.len(),
        average_confidence: round1(sum as f64 / members.len() as f64),
        snippets: members
            .iter()
            .map(|m| GroupSnippet {
                mapping_id: m.mapping_id.clone(),
                sentence_id: m.sentence_ref.sentence_id.clone(),
                text: m.sentence_ref.text.clone(),
                decision: m.decision,
                confidence: m.confidence,
                location: m.snippet_location.clone(),
            })
            .collect(),
    }
}

/// Derive violations: exactly the NO mappings, in mapping order
pub fn violations(mappings: &[ComplianceMapping]) -> Vec<Violation> {
    mappings
        .iter()
        .filter(|m| m.decision == Decision::No)
        .enumerate()
        .map(|(i, m)| violation_for(i, m))
        .collect()
}

fn violation_for(index: usize, mapping: &ComplianceMapping) -> Violation {
    let severity = Severity::from_confidence(mapping.confidence);
    let reference = mapping.provision_match.reference();

    let (suggested_fix, next_steps) = match severity {
        Severity::High => (
            format!(
                "Suspend use of this clause and have counsel confirm whether it conflicts with {}.",
                reference
            ),
            vec![
                "Escalate to legal counsel for manual review".to_string(),
                format!("Compare the clause line by line with {}", reference),
                "Redraft or remove the clause if the conflict is confirmed".to_string(),
            ],
        ),
        Severity::Medium => (
            format!("Amend the clause so that it aligns with {}.", reference),
            vec![
                "Prepare a revised wording".to_string(),
                "Have the revision reviewed before the next signature".to_string(),
            ],
        ),
        Severity::Low => (
            format!("Adjust the wording to remove the conflict with {}.", reference),
            vec!["Include the change in the next scheduled revision".to_string()],
        ),
    };

    Violation {
        violation_id: format!("viol-{:04}", index + 1),
        mapping_id: mapping.mapping_id.clone(),
        decision_source: mapping.decision,
        severity,
        description: format!(
            "Sentence {} contradicts {}",
            mapping.sentence_ref.sentence_id, reference
        ),
        offending_snippet: mapping.sentence_ref.text.clone(),
        snippet_location: mapping.snippet_location.clone(),
        provision_reference: reference,
        provision_id: mapping.provision_match.id.clone(),
        why_violates: mapping.rationale.clone(),
        suggested_fix,
        next_steps,
        confidence: mapping.confidence,
    }
}

/// Recommendations by severity tier, most urgent first
pub fn suggested_actions(
    mappings: &[ComplianceMapping],
    violations: &[Violation],
) -> Vec<SuggestedAction> {
    let ids_with = |severity: Severity| -> Vec<String> {
        violations
            .iter()
            .filter(|v| v.severity == severity)
            .map(|v| v.violation_id.clone())
            .collect()
    };

    let mut actions = Vec::new();

    let high = ids_with(Severity::High);
    if !high.is_empty() {
        actions.push(SuggestedAction {
            priority: Priority::Urgent,
            action: format!(
                "Obtain immediate legal review of {} high-severity violation(s)",
                high.len()
            ),
            reason: "Contradictions detected with low confidence need human confirmation \
                     before the document is used"
                .to_string(),
            related_ids: high,
        });
    }

    let medium = ids_with(Severity::Medium);
    if !medium.is_empty() {
        actions.push(SuggestedAction {
            priority: Priority::High,
            action: format!("Amend {} clause(s) with medium-severity violations", medium.len()),
            reason: "These clauses likely conflict with the referenced provisions".to_string(),
            related_ids: medium,
        });
    }

    let low_confidence: Vec<String> = mappings
        .iter()
        .filter(|m| m.confidence < LOW_CONFIDENCE)
        .map(|m| m.mapping_id.clone())
        .collect();
    if !low_confidence.is_empty() {
        actions.push(SuggestedAction {
            priority: Priority::Medium,
            action: format!("Manually review {} low-confidence mapping(s)", low_confidence.len()),
            reason: format!("Confidence below {} leaves the verdict uncertain", LOW_CONFIDENCE),
            related_ids: low_confidence,
        });
    }

    let low = ids_with(Severity::Low);
    if !low.is_empty() {
        actions.push(SuggestedAction {
            priority: Priority::Low,
            action: format!("Track {} low-severity violation(s) for the next revision", low.len()),
            reason: "The conflict was detected with high confidence but is narrow in scope"
                .to_string(),
            related_ids: low,
        });
    }

    actions
}

/// Structural checks before a report is assembled
pub fn validate_mappings(mappings: &[ComplianceMapping], total_sentences: usize) -> Result<()> {
    if mappings.len() > total_sentences {
        return Err(Error::aggregation(format!(
            "{} mappings for {} sentences",
            mappings.len(),
            total_sentences
        )));
    }

    let mut seen = HashSet::new();
    for mapping in mappings {
        if !seen.insert(mapping.mapping_id.as_str()) {
            return Err(Error::aggregation(format!(
                "duplicate mapping id '{}'",
                mapping.mapping_id
            )));
        }
        if mapping.confidence > 100 {
            return Err(Error::aggregation(format!(
                "mapping '{}' has confidence {}",
                mapping.mapping_id, mapping.confidence
            )));
        }
        if !(0.0..=1.0).contains(&mapping.similarity_score) {
            return Err(Error::aggregation(format!(
                "mapping '{}' has similarity {}",
                mapping.mapping_id, mapping.similarity_score
            )));
        }
        if mapping.provision_match.id.is_empty() {
            return Err(Error::aggregation(format!(
                "mapping '{}' references no provision",
                mapping.mapping_id
            )));
        }
        if !valid_location(&mapping.snippet_location) {
            return Err(Error::aggregation(format!(
                "mapping '{}' has an empty snippet range",
                mapping.mapping_id
            )));
        }
    }
    Ok(())
}

fn valid_location(location: &SnippetLocation) -> bool {
    location.start_char < location.end_char
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mapping;
    use proptest::prelude::*;

    #[test]
    fn test_overall_status() {
        let counts = |yes, no, partial| DecisionCounts { yes, no, partial };

        assert_eq!(counts(0, 0, 0).overall(), OverallCompliance::NoData);
        assert_eq!(counts(3, 0, 0).overall(), OverallCompliance::FullyCompliant);
        assert_eq!(counts(1, 1, 1).overall(), OverallCompliance::PartiallyCompliant);
        assert_eq!(counts(1, 1, 0).overall(), OverallCompliance::NonCompliant);
        assert_eq!(counts(0, 3, 1).overall(), OverallCompliance::NonCompliant);
        assert_eq!(counts(2, 0, 1).overall(), OverallCompliance::PartiallyCompliant);
    }

    #[test]
    fn test_confidence_buckets() {
        let mappings = vec![
            mapping(0, "a", Decision::Yes, 85),
            mapping(1, "a", Decision::Yes, 84),
            mapping(2, "b", Decision::No, 70),
            mapping(3, "b", Decision::No, 69),
        ];
        let summary = confidence_summary(&mappings);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 2);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.average, 77.0);

        assert_eq!(confidence_summary(&[]).average, 0.0);
    }

    #[test]
    fn test_mixed_group_is_partial() {
        let mappings = vec![
            mapping(0, "article-14", Decision::Yes, 90),
            mapping(1, "article-14", Decision::No, 60),
            mapping(2, "article-14", Decision::Yes, 75),
        ];
        let analysis = article_analysis(&mappings);

        assert!(analysis.compliant_provisions.is_empty());
        assert!(analysis.non_compliant_provisions.is_empty());
        assert_eq!(analysis.partially_compliant_provisions.len(), 1);

        let group = &analysis.partially_compliant_provisions[0];
        assert_eq!(group.mapping_count, 3);
        assert_eq!(group.snippets.len(), 3);
        assert_eq!(group.average_confidence, 75.0);
        assert_eq!(analysis.statistics.total_provisions_referenced, 1);
    }

    #[test]
    fn test_groups_by_status() {
        let mappings = vec![
            mapping(0, "article-19", Decision::Yes, 90),
            mapping(1, "article-21", Decision::No, 60),
            mapping(2, "article-19", Decision::Yes, 88),
            mapping(3, "article-21", Decision::No, 40),
            mapping(4, "article-23", Decision::Partial, 72),
        ];
        let analysis = article_analysis(&mappings);

        assert_eq!(analysis.compliant_provisions[0].provision.id, "article-19");
        assert_eq!(analysis.non_compliant_provisions[0].provision.id, "article-21");
        assert_eq!(analysis.partially_compliant_provisions[0].provision.id, "article-23");
        assert_eq!(analysis.statistics.compliant, 1);
        assert_eq!(analysis.statistics.non_compliant, 1);
        assert_eq!(analysis.statistics.partially_compliant, 1);
        assert_eq!(analysis.statistics.total_provisions_referenced, 3);
    }

    #[test]
    fn test_violation_severity_inversion() {
        let mappings = vec![
            mapping(0, "article-21", Decision::No, 50),
            mapping(1, "article-21", Decision::No, 90),
        ];
        let violations = violations(&mappings);

        assert_eq!(violations[0].severity, Severity::High);
        assert_eq!(violations[1].severity, Severity::Low);
        assert_eq!(violations[0].violation_id, "viol-0001");
        assert_eq!(violations[1].mapping_id, "map-0002");
    }

    #[test]
    fn test_suggested_actions_by_tier() {
        let mappings = vec![
            mapping(0, "a", Decision::No, 50),
            mapping(1, "b", Decision::No, 65),
            mapping(2, "c", Decision::No, 95),
            mapping(3, "d", Decision::Partial, 60),
            mapping(4, "e", Decision::Yes, 95),
        ];
        let violations = violations(&mappings);
        let actions = suggested_actions(&mappings, &violations);

        let priorities: Vec<Priority> = actions.iter().map(|a| a.priority).collect();
        assert_eq!(
            priorities,
            vec![Priority::Urgent, Priority::High, Priority::Medium, Priority::Low]
        );
        assert_eq!(actions[0].related_ids, vec!["viol-0001"]);
        assert_eq!(actions[2].related_ids, vec!["map-0001", "map-0002", "map-0004"]);
    }

    #[test]
    fn test_no_actions_when_all_confident_yes() {
        let mappings = vec![mapping(0, "a", Decision::Yes, 95)];
        assert!(suggested_actions(&mappings, &violations(&mappings)).is_empty());
    }

    #[test]
    fn test_validation_rejects_structural_faults() {
        let good = vec![mapping(0, "a", Decision::Yes, 90)];
        assert!(validate_mappings(&good, 1).is_ok());
        assert!(matches!(validate_mappings(&good, 0), Err(Error::Aggregation(_))));

        let duplicate = vec![mapping(0, "a", Decision::Yes, 90), mapping(0, "b", Decision::No, 40)];
        assert!(matches!(validate_mappings(&duplicate, 5), Err(Error::Aggregation(_))));

        let mut bad = mapping(0, "a", Decision::Yes, 90);
        bad.confidence = 101;
        assert!(validate_mappings(&[bad], 1).is_err());

        let mut bad = mapping(0, "a", Decision::Yes, 90);
        bad.similarity_score = 1.2;
        assert!(validate_mappings(&[bad], 1).is_err());
    }

    fn decision_strategy() -> impl Strategy<Value = Decision> {
        prop_oneof![Just(Decision::Yes), Just(Decision::No), Just(Decision::Partial)]
    }

    proptest! {
        #[test]
        fn prop_violations_are_exactly_no_mappings(
            entries in proptest::collection::vec((decision_strategy(), 0u8..=100), 0..40)
        ) {
            let mappings: Vec<_> = entries
                .iter()
                .enumerate()
                .map(|(i, (d, c))| mapping(i, "p", *d, *c))
                .collect();
            let violations = violations(&mappings);

            let no_ids: Vec<&str> = mappings
                .iter()
                .filter(|m| m.decision == Decision::No)
                .map(|m| m.mapping_id.as_str())
                .collect();
            let violation_ids: Vec<&str> =
                violations.iter().map(|v| v.mapping_id.as_str()).collect();

            prop_assert_eq!(no_ids, violation_ids);
            prop_assert!(violations.iter().all(|v| v.decision_source == Decision::No));
        }

        #[test]
        fn prop_severity_non_increasing_in_confidence(a in 0u8..=100, b in 0u8..=100) {
            let rank = |s: Severity| match s {
                Severity::High => 2,
                Severity::Medium => 1,
                Severity::Low => 0,
            };
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                rank(Severity::from_confidence(lo)) >= rank(Severity::from_confidence(hi))
            );
        }

        #[test]
        fn prop_buckets_partition_mappings(
            confidences in proptest::collection::vec(0u8..=100, 0..30)
        ) {
            let mappings: Vec<_> = confidences
                .iter()
                .enumerate()
                .map(|(i, c)| mapping(i, "p", Decision::Yes, *c))
                .collect();
            let summary = confidence_summary(&mappings);
            prop_assert_eq!(summary.high + summary.medium + summary.low, mappings.len());
        }
    }
}
