use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::findings::{LayerFindings, Severity};
use crate::types::{AnalysisMode, Depth, LayerName};

/// One actionable line of the readiness checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    /// "business", "ui", "api", "database", "logic", "integration" or "tests"
    pub category: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub location: String,
    pub remediation: String,
    pub auto_fixable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_findings: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_layer: BTreeMap<String, usize>,
    pub flows_verified: usize,
    pub flows_broken: usize,
    /// Wall-clock time from request start to assembly, in milliseconds
    pub analysis_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Complete,
    Broken,
    Partial,
}

/// A cross-layer user flow, e.g. form submit through API to table write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    pub steps: Vec<FlowStep>,
    pub status: FlowStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakpoints: Vec<Breakpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStep {
    pub layer: String,
    pub component: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default)]
    pub line_number: usize,
}

/// Point where a flow is broken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Index of the step the breakpoint applies to
    pub step: usize,
    /// "missing_error_handling", "missing_validation", "missing_rollback", "missing_timeout", "missing_retry"
    #[serde(rename = "type")]
    pub kind: String,
    pub issue: String,
    pub severity: Severity,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub validation_id: String,
    pub feature: String,
    pub mode: AnalysisMode,
    pub depth: Depth,
    pub summary: AnalysisSummary,
    pub checklist: Vec<ChecklistItem>,
    pub layer_analysis: BTreeMap<LayerName, LayerFindings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub end_to_end_flows: Vec<Flow>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hub_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome returned to the caller of a comprehensive analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub validation_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hub_url: String,
    pub report: AnalysisReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub critical_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial_analysis: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

impl AnalysisResponse {
    pub fn from_cache(report: AnalysisReport) -> Self {
        Self {
            success: true,
            validation_id: report.validation_id.clone(),
            hub_url: report.hub_url.clone(),
            report,
            warnings: Vec::new(),
            critical_errors: Vec::new(),
            partial_analysis: false,
            cached: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_omits_clean_flags() {
        let report = AnalysisReport {
            validation_id: "VAL-1".into(),
            feature: "checkout".into(),
            mode: AnalysisMode::Auto,
            depth: Depth::Surface,
            summary: AnalysisSummary::default(),
            checklist: Vec::new(),
            layer_analysis: BTreeMap::new(),
            end_to_end_flows: Vec::new(),
            hub_url: String::new(),
            created_at: Utc::now(),
            completed_at: None,
        };
        let mut response = AnalysisResponse::from_cache(report);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["cached"], true);
        assert!(json.get("partial_analysis").is_none());
        assert!(json.get("warnings").is_none());

        response.cached = false;
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("cached").is_none());
    }
}
