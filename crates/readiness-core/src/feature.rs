// ABOUTME: Discovered feature model handed to the orchestrator by feature discovery
// ABOUTME: Each layer is optional; an absent layer is skipped rather than failed

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::LayerName;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredFeature {
    pub feature_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_layer: Option<UiLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_layer: Option<ApiLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_layer: Option<DatabaseLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic_layer: Option<LogicLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_layer: Option<IntegrationLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_layer: Option<TestLayer>,
}

impl DiscoveredFeature {
    pub fn new(feature_name: impl Into<String>) -> Self {
        Self {
            feature_name: feature_name.into(),
            ..Default::default()
        }
    }

    /// Whether discovery produced a description for `layer`.
    ///
    /// The business layer has no discovered artifacts of its own and is
    /// always considered present; the request flags decide whether it runs.
    pub fn has_layer(&self, layer: LayerName) -> bool {
        match layer {
            LayerName::Business => true,
            LayerName::Ui => self.ui_layer.is_some(),
            LayerName::Api => self.api_layer.is_some(),
            LayerName::Database => self.database_layer.is_some(),
            LayerName::Logic => self.logic_layer.is_some(),
            LayerName::Integration => self.integration_layer.is_some(),
            LayerName::Test => self.test_layer.is_some(),
        }
    }

    pub fn components(&self) -> &[ComponentInfo] {
        self.ui_layer
            .as_ref()
            .map(|l| l.components.as_slice())
            .unwrap_or_default()
    }

    pub fn endpoints(&self) -> &[EndpointInfo] {
        self.api_layer
            .as_ref()
            .map(|l| l.endpoints.as_slice())
            .unwrap_or_default()
    }

    pub fn tables(&self) -> &[TableInfo] {
        self.database_layer
            .as_ref()
            .map(|l| l.tables.as_slice())
            .unwrap_or_default()
    }

    pub fn functions(&self) -> &[FunctionInfo] {
        self.logic_layer
            .as_ref()
            .map(|l| l.functions.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiLayer {
    pub components: Vec<ComponentInfo>,
    #[serde(default)]
    pub framework: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub path: String,
    /// "component", "form" or "page"
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiLayer {
    pub endpoints: Vec<EndpointInfo>,
    #[serde(default)]
    pub framework: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub handler: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseLayer {
    pub tables: Vec<TableInfo>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub orm_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<RelationshipInfo>,
    /// "migration", "prisma", "typeorm", ...
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipInfo {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicLayer {
    pub functions: Vec<FunctionInfo>,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
    pub file: String,
    #[serde(default)]
    pub line_number: usize,
}

impl FunctionInfo {
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line_number)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationLayer {
    pub integrations: Vec<IntegrationInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,
    pub endpoint: String,
    pub method: String,
    pub file: String,
    #[serde(default)]
    pub line_number: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestLayer {
    pub test_files: Vec<TestFileInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestFileInfo {
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub framework: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_cases: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_layers_are_skipped_not_failed() {
        let mut feature = DiscoveredFeature::new("checkout");
        assert!(feature.has_layer(LayerName::Business));
        assert!(!feature.has_layer(LayerName::Api));
        assert!(feature.endpoints().is_empty());

        feature.api_layer = Some(ApiLayer {
            endpoints: vec![EndpointInfo {
                method: "POST".into(),
                path: "/checkout".into(),
                file: "api/checkout.go".into(),
                ..Default::default()
            }],
            framework: "chi".into(),
        });
        assert!(feature.has_layer(LayerName::Api));
        assert_eq!(feature.endpoints().len(), 1);
    }

    #[test]
    fn test_component_type_field_name() {
        let json = r#"{"name":"CartForm","path":"src/CartForm.tsx","type":"form"}"#;
        let component: ComponentInfo = serde_json::from_str(json).unwrap();
        assert_eq!(component.kind, "form");
    }
}
