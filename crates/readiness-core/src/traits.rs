use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::config_manager::LLMConfig;
use crate::feature::DiscoveredFeature;
use crate::report::{AnalysisReport, Breakpoint, Flow};
use crate::types::{Depth, LayerName};
use crate::usage::UsageRecord;

/// Result type for collaborator calls; errors are classified by message.
pub type CollabResult<T> = anyhow::Result<T>;

/// Per-request state shared by every layer task.
#[derive(Debug, Clone)]
pub struct LayerContext {
    pub cancel: CancellationToken,
    pub project_id: String,
    pub depth: Depth,
    /// Feature hash, doubling as the codebase snapshot key for the context cache
    pub codebase_hash: String,
    pub codebase_path: PathBuf,
}

impl LayerContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Approved knowledge item (business rule, user journey, entity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Business rules and journeys for one codebase snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub rules: Vec<KnowledgeItem>,
    pub journeys: Vec<KnowledgeItem>,
}

#[async_trait]
pub trait FeatureDiscovery: Send + Sync {
    async fn discover_feature(
        &self,
        cancel: &CancellationToken,
        feature_name: &str,
        codebase_path: &Path,
        manual_files: &BTreeMap<LayerName, Vec<PathBuf>>,
    ) -> CollabResult<DiscoveredFeature>;
}

/// Opaque per-layer detector.
#[async_trait]
pub trait LayerAnalyzer<F>: Send + Sync {
    async fn analyze(&self, ctx: &LayerContext, feature: &DiscoveredFeature)
        -> CollabResult<Vec<F>>;
}

#[async_trait]
pub trait FlowVerifier: Send + Sync {
    async fn verify_end_to_end_flows(
        &self,
        cancel: &CancellationToken,
        feature: &DiscoveredFeature,
    ) -> CollabResult<Vec<Flow>>;

    async fn verify_integration_points(
        &self,
        cancel: &CancellationToken,
        flows: &[Flow],
        feature: &DiscoveredFeature,
    ) -> CollabResult<Vec<Breakpoint>>;
}

/// Report and usage persistence.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn persist_report(&self, report: &AnalysisReport, project_id: &str) -> CollabResult<()>;

    async fn record_usage(&self, usage: &UsageRecord) -> CollabResult<()>;

    /// Attach `validation_id` to the project's usage rows that have none yet.
    /// Returns the number of rows updated.
    async fn backfill_usage_validation_id(
        &self,
        validation_id: &str,
        project_id: &str,
    ) -> CollabResult<usize>;
}

/// Source of approved business rules and user journeys.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn business_rules(&self, project_id: &str) -> CollabResult<Vec<KnowledgeItem>>;

    async fn user_journeys(&self, project_id: &str) -> CollabResult<Vec<KnowledgeItem>>;
}

/// Per-project provider configuration lookup.
#[async_trait]
pub trait LlmConfigSource: Send + Sync {
    async fn llm_config(&self, project_id: &str) -> CollabResult<LLMConfig>;
}

/// A fixed configuration serves every project.
#[async_trait]
impl LlmConfigSource for LLMConfig {
    async fn llm_config(&self, _project_id: &str) -> CollabResult<LLMConfig> {
        Ok(self.clone())
    }
}
