//! Rule-based effort and impact estimation for findings.
//!
//! Estimates are derived from severity alone, with a discount when the finding
//! already ships a code example. Everything here is pure.

use crate::domain::models::{
    AnalysisRecord, EffortLevel, EnrichedFinding, Finding, FindingEstimate, ImprovementRoadmap,
    PersonaResult, PriorityItem, RoadmapPhase, Severity,
};

/// Maximum number of entries in a priority summary.
pub const PRIORITY_SUMMARY_LIMIT: usize = 10;

/// Hours at or below this are quick wins.
const QUICK_MAX_HOURS: f64 = 2.0;
/// Hours at or below this (and above quick) are moderate.
const MODERATE_MAX_HOURS: f64 = 8.0;
const CODE_EXAMPLE_DISCOUNT: f64 = 0.8;

fn hours_range(severity: Severity) -> (f64, f64) {
    match severity {
        Severity::High => (4.0, 8.0),
        Severity::Medium => (2.0, 4.0),
        Severity::Low => (0.5, 2.0),
    }
}

fn impact_range(severity: Severity) -> (f64, f64) {
    match severity {
        Severity::High => (3.0, 5.0),
        Severity::Medium => (1.0, 3.0),
        Severity::Low => (0.5, 1.0),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Effort bucket for an hour estimate. Both thresholds are inclusive.
pub fn effort_for_hours(hours: f64) -> EffortLevel {
    if hours <= QUICK_MAX_HOURS {
        EffortLevel::Quick
    } else if hours <= MODERATE_MAX_HOURS {
        EffortLevel::Moderate
    } else {
        EffortLevel::Significant
    }
}

/// Estimate hours, score impact and effort bucket for one finding.
///
/// The bucket is chosen from unrounded hours; reported values are rounded to
/// one decimal.
pub fn estimate(finding: &Finding) -> FindingEstimate {
    let (min_hours, max_hours) = hours_range(finding.severity);
    let mut hours = (min_hours + max_hours) / 2.0;
    if finding.has_code_example() {
        hours *= CODE_EXAMPLE_DISCOUNT;
    }

    let (min_impact, max_impact) = impact_range(finding.severity);
    let impact = (min_impact + max_impact) / 2.0;

    FindingEstimate {
        hours: round1(hours),
        score_impact: round1(impact),
        effort: effort_for_hours(hours),
    }
}

/// Estimate every finding, order by return on effort and assign priorities.
///
/// The sort is stable, so equal-ROI findings keep their input order.
pub fn enrich(findings: &[Finding]) -> Vec<EnrichedFinding> {
    let mut enriched: Vec<EnrichedFinding> = findings
        .iter()
        .map(|finding| {
            let estimate = estimate(finding);
            EnrichedFinding {
                finding: finding.clone(),
                estimated_hours: estimate.hours,
                estimated_score_impact: estimate.score_impact,
                effort_level: estimate.effort,
                priority: 0,
            }
        })
        .collect();

    enriched.sort_by(|a, b| b.roi().total_cmp(&a.roi()));
    for (index, item) in enriched.iter_mut().enumerate() {
        item.priority = index + 1;
    }
    enriched
}

/// Group enriched findings into quick / moderate / significant phases.
///
/// Empty phases are omitted and the remaining ones are numbered from 1.
pub fn build_roadmap(findings: &[Finding], current_score: u8) -> ImprovementRoadmap {
    let enriched = enrich(findings);

    let mut phases: Vec<RoadmapPhase> = Vec::new();
    for effort in [EffortLevel::Quick, EffortLevel::Moderate, EffortLevel::Significant] {
        let items: Vec<EnrichedFinding> = enriched
            .iter()
            .filter(|f| f.effort_level == effort)
            .cloned()
            .collect();
        if items.is_empty() {
            continue;
        }
        phases.push(RoadmapPhase {
            phase: phases.len() + 1,
            label: effort.phase_label().to_string(),
            effort_level: effort,
            estimated_total_hours: round1(items.iter().map(|f| f.estimated_hours).sum()),
            expected_score_gain: round1(items.iter().map(|f| f.estimated_score_impact).sum()),
            findings: items,
        });
    }

    let total_hours: f64 = phases.iter().map(|p| p.estimated_total_hours).sum();
    let total_gain: f64 = phases.iter().map(|p| p.expected_score_gain).sum();
    let final_score = (f64::from(current_score) + total_gain).round().min(100.0);

    ImprovementRoadmap {
        phases,
        total_estimated_hours: round1(total_hours),
        current_score,
        expected_final_score: final_score as u8,
    }
}

/// All findings raised by completed personas, in persona order.
pub fn collect_findings(record: &AnalysisRecord) -> Vec<Finding> {
    record
        .persona_results
        .iter()
        .filter(|r| r.is_completed())
        .flat_map(|r| r.findings.iter().cloned())
        .collect()
}

/// Roadmap for a record's completed findings at its current overall score.
pub fn roadmap_for(record: &AnalysisRecord) -> ImprovementRoadmap {
    build_roadmap(&collect_findings(record), record.overall_score)
}

/// The most severe findings across completed personas, tagged by persona.
pub fn priority_summary(results: &[PersonaResult]) -> Vec<PriorityItem> {
    let mut items: Vec<PriorityItem> = results
        .iter()
        .filter(|r| r.is_completed())
        .flat_map(|r| {
            r.findings.iter().map(|finding| PriorityItem {
                persona_name: r.persona_name.clone(),
                finding: finding.clone(),
            })
        })
        .collect();
    items.sort_by_key(|item| item.finding.severity);
    items.truncate(PRIORITY_SUMMARY_LIMIT);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Evaluation, Persona, PersonaCategory, AnalysisStatus};
    use proptest::prelude::*;

    fn finding(id: &str, severity: Severity) -> Finding {
        Finding::new(id, severity, format!("Finding {id}"))
    }

    #[test]
    fn test_estimate_high() {
        let estimate = estimate(&finding("f-1", Severity::High));
        assert_eq!(estimate.hours, 6.0);
        assert_eq!(estimate.score_impact, 4.0);
        assert_eq!(estimate.effort, EffortLevel::Moderate);
    }

    #[test]
    fn test_estimate_high_with_code_example() {
        let estimate = estimate(&finding("f-1", Severity::High).with_code_example("<title>Home</title>"));
        assert_eq!(estimate.hours, 4.8);
        assert_eq!(estimate.score_impact, 4.0);
        assert_eq!(estimate.effort, EffortLevel::Moderate);
    }

    #[test]
    fn test_estimate_medium_and_low() {
        let medium = estimate(&finding("f-1", Severity::Medium));
        assert_eq!((medium.hours, medium.score_impact, medium.effort), (3.0, 2.0, EffortLevel::Moderate));

        let low = estimate(&finding("f-2", Severity::Low));
        assert_eq!((low.hours, low.score_impact, low.effort), (1.3, 0.8, EffortLevel::Quick));

        let low_with_code = estimate(&finding("f-3", Severity::Low).with_code_example("alt=\"\""));
        assert_eq!(low_with_code.hours, 1.0);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        assert_eq!(effort_for_hours(2.0), EffortLevel::Quick);
        assert_eq!(effort_for_hours(2.01), EffortLevel::Moderate);
        assert_eq!(effort_for_hours(8.0), EffortLevel::Moderate);
        assert_eq!(effort_for_hours(8.01), EffortLevel::Significant);
    }

    #[test]
    fn test_enrich_orders_by_roi() {
        let findings = vec![
            finding("high", Severity::High),     // 4 / 6   = 0.67
            finding("low", Severity::Low),       // 0.8 / 1.3 = 0.62
            finding("medium", Severity::Medium), // 2 / 3   = 0.67
        ];
        let enriched = enrich(&findings);
        let ids: Vec<_> = enriched.iter().map(|f| f.finding.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "medium", "low"]);
        let priorities: Vec<_> = enriched.iter().map(|f| f.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3]);
    }

    #[test]
    fn test_enrich_preserves_original_fields() {
        let original = finding("f-9", Severity::Medium).with_code_example("x");
        let enriched = enrich(std::slice::from_ref(&original));
        assert_eq!(enriched[0].finding, original);
    }

    #[test]
    fn test_build_roadmap_skips_empty_phases() {
        let findings = vec![finding("a", Severity::High), finding("b", Severity::Medium)];
        let roadmap = build_roadmap(&findings, 60);
        assert_eq!(roadmap.phases.len(), 1);
        assert_eq!(roadmap.phases[0].phase, 1);
        assert_eq!(roadmap.phases[0].effort_level, EffortLevel::Moderate);
        assert_eq!(roadmap.phases[0].label, "Planned improvements");
        assert_eq!(roadmap.phases[0].estimated_total_hours, 9.0);
        assert_eq!(roadmap.phases[0].expected_score_gain, 6.0);
        assert_eq!(roadmap.total_estimated_hours, 9.0);
        assert_eq!(roadmap.expected_final_score, 66);
    }

    #[test]
    fn test_build_roadmap_caps_final_score() {
        let findings: Vec<_> = (0..10).map(|i| finding(&format!("f-{i}"), Severity::High)).collect();
        let roadmap = build_roadmap(&findings, 95);
        assert_eq!(roadmap.current_score, 95);
        assert_eq!(roadmap.expected_final_score, 100);
    }

    #[test]
    fn test_build_roadmap_empty() {
        let roadmap = build_roadmap(&[], 42);
        assert!(roadmap.phases.is_empty());
        assert_eq!(roadmap.total_estimated_hours, 0.0);
        assert_eq!(roadmap.expected_final_score, 42);
    }

    #[test]
    fn test_collect_and_priority_summary_use_completed_only() {
        let personas = vec![
            Persona::new("a", "Alpha", "s", "p", PersonaCategory::Design),
            Persona::new("b", "Beta", "s", "p", PersonaCategory::Technical),
        ];
        let mut record = AnalysisRecord::new("https://example.com", &personas, None, vec![]);
        record.transition_to(AnalysisStatus::Preparing).unwrap();
        record.start_persona("a").unwrap();
        record
            .complete_persona(
                "a",
                Evaluation {
                    score: 70,
                    summary: String::new(),
                    findings: vec![finding("a-low", Severity::Low), finding("a-high", Severity::High)],
                    thinking_process: String::new(),
                    competitor_comparison: None,
                },
            )
            .unwrap();
        record.start_persona("b").unwrap();
        record.fail_persona("b", "boom").unwrap();

        assert_eq!(collect_findings(&record).len(), 2);
        let summary = priority_summary(&record.persona_results);
        assert_eq!(summary[0].finding.id, "a-high");
        assert_eq!(summary[0].persona_name, "Alpha");
        assert_eq!(roadmap_for(&record).current_score, record.overall_score);
    }

    #[test]
    fn test_priority_summary_is_capped() {
        let persona = Persona::new("a", "Alpha", "s", "p", PersonaCategory::Design);
        let mut result = PersonaResult::waiting(&persona);
        result.status = crate::domain::models::PersonaStatus::Completed;
        result.findings = (0..15).map(|i| finding(&format!("f-{i}"), Severity::Medium)).collect();
        let summary = priority_summary(&[result]);
        assert_eq!(summary.len(), PRIORITY_SUMMARY_LIMIT);
        assert_eq!(summary[0].finding.id, "f-0");
    }

    fn arb_finding() -> impl Strategy<Value = Finding> {
        (
            prop_oneof![Just(Severity::High), Just(Severity::Medium), Just(Severity::Low)],
            any::<bool>(),
            "[a-z]{1,8}",
        )
            .prop_map(|(severity, with_code, id)| {
                let finding = Finding::new(id, severity, "title");
                if with_code {
                    finding.with_code_example("code")
                } else {
                    finding
                }
            })
    }

    proptest! {
        #[test]
        fn prop_enrich_roi_non_increasing(findings in prop::collection::vec(arb_finding(), 0..30)) {
            let enriched = enrich(&findings);
            prop_assert_eq!(enriched.len(), findings.len());
            for pair in enriched.windows(2) {
                prop_assert!(pair[0].roi() >= pair[1].roi());
            }
            let priorities: Vec<_> = enriched.iter().map(|f| f.priority).collect();
            let expected: Vec<_> = (1..=findings.len()).collect();
            prop_assert_eq!(priorities, expected);
        }

        #[test]
        fn prop_roadmap_phases_dense_and_non_empty(
            findings in prop::collection::vec(arb_finding(), 0..30),
            current in 0u8..=100,
        ) {
            let roadmap = build_roadmap(&findings, current);
            for (index, phase) in roadmap.phases.iter().enumerate() {
                prop_assert_eq!(phase.phase, index + 1);
                prop_assert!(!phase.findings.is_empty());
            }
            let total: usize = roadmap.phases.iter().map(|p| p.findings.len()).sum();
            prop_assert_eq!(total, findings.len());
            prop_assert!(roadmap.expected_final_score <= 100);
            prop_assert!(roadmap.expected_final_score >= current);
        }
    }
}
