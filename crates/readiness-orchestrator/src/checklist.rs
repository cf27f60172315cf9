use readiness_core::{
    AnalysisSummary, ChecklistItem, Flow, FlowStatus, FindingRecord, LayerFindings, LayerName,
};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

pub fn finding_title(kind: &str) -> &str {
    match kind {
        "missing_validation" => "Missing Input Validation",
        "missing_error_handling" => "Missing Error Handling",
        "accessibility_issue" => "Accessibility Issue",
        "missing_auth" => "Missing Authentication",
        "contract_mismatch" => "API Contract Mismatch",
        "missing_constraint" => "Missing Database Constraint",
        "missing_index" => "Missing Database Index",
        "data_integrity_issue" => "Data Integrity Issue",
        "semantic_error" => "Semantic Error",
        "signature_mismatch" => "Function Signature Mismatch",
        "missing_retry" => "Missing Retry Logic",
        "missing_coverage" => "Missing Test Coverage",
        "weak_assertion" => "Weak Test Assertion",
        "missing_edge_case" => "Missing Edge Case Test",
        "missing_error_case" => "Missing Error Case Test",
        other => other,
    }
}

pub fn remediation(kind: &str) -> &'static str {
    match kind {
        "business_rule_violation" => {
            "Review business rule and ensure code implementation matches requirements"
        }
        "user_journey_mismatch" => "Implement missing journey steps or update journey documentation",
        "entity_validation_failure" => "Verify entity structure matches documented schema",
        _ => "Review and fix the identified issue",
    }
}

fn auto_fixable(layer: LayerName, kind: &str) -> bool {
    matches!(
        (layer, kind),
        (LayerName::Ui, "accessibility_issue") | (LayerName::Database, "missing_index")
    )
}

fn checklist_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

/// One checklist item per finding, grouped in layer order.
pub fn build_checklist(layers: &BTreeMap<LayerName, LayerFindings>) -> Vec<ChecklistItem> {
    let mut checklist = Vec::new();
    for (layer, findings) in layers {
        for record in findings.records() {
            let title = record
                .title()
                .unwrap_or_else(|| finding_title(record.kind()))
                .to_string();
            checklist.push(ChecklistItem {
                id: checklist_id(),
                category: layer.category().to_string(),
                severity: record.severity(),
                title,
                description: record.issue().to_string(),
                location: record.location().to_string(),
                remediation: remediation(record.kind()).to_string(),
                auto_fixable: auto_fixable(*layer, record.kind()),
            });
        }
    }
    checklist
}

pub fn build_summary(
    checklist: &[ChecklistItem],
    flows: &[Flow],
    elapsed: Duration,
) -> AnalysisSummary {
    let mut by_severity = BTreeMap::new();
    let mut by_layer = BTreeMap::new();
    for item in checklist {
        *by_severity.entry(item.severity.as_str().to_string()).or_insert(0) += 1;
        *by_layer.entry(item.category.clone()).or_insert(0) += 1;
    }

    AnalysisSummary {
        total_findings: checklist.len(),
        by_severity,
        by_layer,
        flows_verified: flows.len(),
        flows_broken: flows
            .iter()
            .filter(|f| f.status == FlowStatus::Broken)
            .count(),
        analysis_time_ms: elapsed.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readiness_core::{BusinessFinding, Finding, Severity};

    fn layers() -> BTreeMap<LayerName, LayerFindings> {
        let mut layers = BTreeMap::new();
        layers.insert(
            LayerName::Database,
            LayerFindings::Database(vec![Finding::new(
                "missing_index",
                Severity::Medium,
                "migrations/001.sql",
                "orders.user_id has no index",
            )]),
        );
        layers.insert(
            LayerName::Test,
            LayerFindings::Test(vec![Finding::new(
                "flaky_setup",
                Severity::Low,
                "tests/cart.test.ts",
                "shared state between cases",
            )]),
        );
        layers.insert(
            LayerName::Business,
            LayerFindings::Business(vec![BusinessFinding {
                kind: "business_rule_violation".into(),
                rule_id: "r1".into(),
                rule_title: "Refund window".into(),
                location: "api/refund.go".into(),
                issue: "Endpoint POST /refund may violate business rule: Refund window".into(),
                severity: Severity::Critical,
            }]),
        );
        layers.insert(LayerName::Api, LayerFindings::Api(Vec::new()));
        layers
    }

    #[test]
    fn test_checklist_items() {
        let checklist = build_checklist(&layers());
        assert_eq!(checklist.len(), 3);

        let business = &checklist[0];
        assert_eq!(business.category, "business");
        assert_eq!(business.title, "Refund window");
        assert_eq!(
            business.remediation,
            "Review business rule and ensure code implementation matches requirements"
        );
        assert!(!business.auto_fixable);

        let database = &checklist[1];
        assert_eq!(database.category, "database");
        assert_eq!(database.title, "Missing Database Index");
        assert!(database.auto_fixable);
        assert_eq!(database.id.len(), 16);

        let test = &checklist[2];
        assert_eq!(test.category, "tests");
        assert_eq!(test.title, "flaky_setup");
        assert_eq!(test.remediation, "Review and fix the identified issue");
    }

    #[test]
    fn test_summary_counts() {
        let checklist = build_checklist(&layers());
        let flows = vec![
            Flow {
                name: "submit refund".into(),
                steps: Vec::new(),
                status: FlowStatus::Broken,
                breakpoints: Vec::new(),
            },
            Flow {
                name: "view orders".into(),
                steps: Vec::new(),
                status: FlowStatus::Complete,
                breakpoints: Vec::new(),
            },
        ];
        let summary = build_summary(&checklist, &flows, Duration::from_millis(1500));
        assert_eq!(summary.total_findings, 3);
        assert_eq!(summary.by_severity.get("critical"), Some(&1));
        assert_eq!(summary.by_layer.get("tests"), Some(&1));
        assert_eq!(summary.by_layer.get("api"), None);
        assert_eq!(summary.flows_verified, 2);
        assert_eq!(summary.flows_broken, 1);
        assert_eq!(summary.analysis_time_ms, 1500);
    }
}
