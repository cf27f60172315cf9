use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::LayerName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Lenient parse for model output; unknown labels become `Medium`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over every layer's finding shape.
pub trait FindingRecord {
    /// Machine-readable finding type, e.g. `missing_auth`
    fn kind(&self) -> &str;
    fn severity(&self) -> Severity;
    fn issue(&self) -> &str;
    fn location(&self) -> &str;
    /// Checklist title override; `None` uses the finding-type title map
    fn title(&self) -> Option<&str> {
        None
    }
}

/// Finding shape shared by the UI, database, logic, integration and test layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub issue: String,
    pub severity: Severity,
}

impl Finding {
    pub fn new(
        kind: impl Into<String>,
        severity: Severity,
        location: impl Into<String>,
        issue: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            location: location.into(),
            issue: issue.into(),
            severity,
        }
    }
}

impl FindingRecord for Finding {
    fn kind(&self) -> &str {
        &self.kind
    }
    fn severity(&self) -> Severity {
        self.severity
    }
    fn issue(&self) -> &str {
        &self.issue
    }
    fn location(&self) -> &str {
        &self.location
    }
}

/// API layer finding, optionally tied to a contract path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFinding {
    #[serde(flatten)]
    pub finding: Finding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl From<Finding> for ApiFinding {
    fn from(finding: Finding) -> Self {
        Self {
            finding,
            contract_path: None,
            suggested_fix: None,
        }
    }
}

impl FindingRecord for ApiFinding {
    fn kind(&self) -> &str {
        &self.finding.kind
    }
    fn severity(&self) -> Severity {
        self.finding.severity
    }
    fn issue(&self) -> &str {
        &self.finding.issue
    }
    fn location(&self) -> &str {
        &self.finding.location
    }
}

/// Business-rule or user-journey finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessFinding {
    /// "business_rule_violation", "user_journey_mismatch" or "entity_validation_failure"
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rule_title: String,
    pub location: String,
    pub issue: String,
    pub severity: Severity,
}

impl FindingRecord for BusinessFinding {
    fn kind(&self) -> &str {
        &self.kind
    }
    fn severity(&self) -> Severity {
        self.severity
    }
    fn issue(&self) -> &str {
        &self.issue
    }
    fn location(&self) -> &str {
        &self.location
    }
    fn title(&self) -> Option<&str> {
        Some(&self.rule_title)
    }
}

/// Findings produced by one layer task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", content = "findings", rename_all = "lowercase")]
pub enum LayerFindings {
    Business(Vec<BusinessFinding>),
    Api(Vec<ApiFinding>),
    Ui(Vec<Finding>),
    Database(Vec<Finding>),
    Logic(Vec<Finding>),
    Integration(Vec<Finding>),
    Test(Vec<Finding>),
}

impl LayerFindings {
    /// Degraded result for a layer whose analyzer failed.
    pub fn empty(layer: LayerName) -> Self {
        match layer {
            LayerName::Business => LayerFindings::Business(Vec::new()),
            LayerName::Api => LayerFindings::Api(Vec::new()),
            LayerName::Ui => LayerFindings::Ui(Vec::new()),
            LayerName::Database => LayerFindings::Database(Vec::new()),
            LayerName::Logic => LayerFindings::Logic(Vec::new()),
            LayerName::Integration => LayerFindings::Integration(Vec::new()),
            LayerName::Test => LayerFindings::Test(Vec::new()),
        }
    }

    pub fn layer(&self) -> LayerName {
        match self {
            LayerFindings::Business(_) => LayerName::Business,
            LayerFindings::Api(_) => LayerName::Api,
            LayerFindings::Ui(_) => LayerName::Ui,
            LayerFindings::Database(_) => LayerName::Database,
            LayerFindings::Logic(_) => LayerName::Logic,
            LayerFindings::Integration(_) => LayerName::Integration,
            LayerFindings::Test(_) => LayerName::Test,
        }
    }

    pub fn records(&self) -> Vec<&dyn FindingRecord> {
        match self {
            LayerFindings::Business(items) => {
                items.iter().map(|f| f as &dyn FindingRecord).collect()
            }
            LayerFindings::Api(items) => items.iter().map(|f| f as &dyn FindingRecord).collect(),
            LayerFindings::Ui(items)
            | LayerFindings::Database(items)
            | LayerFindings::Logic(items)
            | LayerFindings::Integration(items)
            | LayerFindings::Test(items) => {
                items.iter().map(|f| f as &dyn FindingRecord).collect()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LayerFindings::Business(items) => items.len(),
            LayerFindings::Api(items) => items.len(),
            LayerFindings::Ui(items)
            | LayerFindings::Database(items)
            | LayerFindings::Logic(items)
            | LayerFindings::Integration(items)
            | LayerFindings::Test(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
