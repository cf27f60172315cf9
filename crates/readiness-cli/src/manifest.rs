// ABOUTME: Feature manifest: a JSON description of one discovered feature plus its knowledge items
// ABOUTME: Backs discovery, knowledge and flow collaborators for command-line analysis runs

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use readiness_core::{
    Breakpoint, CancellationToken, CollabResult, DiscoveredFeature, FeatureDiscovery, Flow,
    FlowVerifier, KnowledgeItem, KnowledgeSource, LayerAnalyzer, LayerContext, LayerName,
    LlmConfigSource, ReportStore,
};
use readiness_orchestrator::Collaborators;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub feature: DiscoveredFeature,
    #[serde(default)]
    pub rules: Vec<KnowledgeItem>,
    #[serde(default)]
    pub journeys: Vec<KnowledgeItem>,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))
    }

    pub fn feature_name(&self) -> &str {
        &self.feature.feature_name
    }

    /// Collaborators for one run. Layers without a local detector report no findings.
    pub fn into_collaborators(
        self,
        store: Arc<dyn ReportStore>,
        configs: Arc<dyn LlmConfigSource>,
    ) -> Collaborators {
        Collaborators {
            discovery: Arc::new(ManifestDiscovery {
                feature: self.feature,
            }),
            flows: Arc::new(ManifestFlows { flows: self.flows }),
            store,
            knowledge: Arc::new(ManifestKnowledge {
                rules: self.rules,
                journeys: self.journeys,
            }),
            configs,
            api: Arc::new(NoDetector(LayerName::Api)),
            ui: Arc::new(NoDetector(LayerName::Ui)),
            database: Arc::new(NoDetector(LayerName::Database)),
            integration: Arc::new(NoDetector(LayerName::Integration)),
            test: Arc::new(NoDetector(LayerName::Test)),
        }
    }
}

struct ManifestDiscovery {
    feature: DiscoveredFeature,
}

#[async_trait]
impl FeatureDiscovery for ManifestDiscovery {
    async fn discover_feature(
        &self,
        _cancel: &CancellationToken,
        feature_name: &str,
        _codebase_path: &Path,
        _manual_files: &BTreeMap<LayerName, Vec<PathBuf>>,
    ) -> CollabResult<DiscoveredFeature> {
        if self.feature.feature_name != feature_name {
            bail!(
                "manifest describes feature '{}', not '{}'",
                self.feature.feature_name,
                feature_name
            );
        }
        Ok(self.feature.clone())
    }
}

struct ManifestKnowledge {
    rules: Vec<KnowledgeItem>,
    journeys: Vec<KnowledgeItem>,
}

#[async_trait]
impl KnowledgeSource for ManifestKnowledge {
    async fn business_rules(&self, _project_id: &str) -> CollabResult<Vec<KnowledgeItem>> {
        Ok(self.rules.clone())
    }

    async fn user_journeys(&self, _project_id: &str) -> CollabResult<Vec<KnowledgeItem>> {
        Ok(self.journeys.clone())
    }
}

struct ManifestFlows {
    flows: Vec<Flow>,
}

#[async_trait]
impl FlowVerifier for ManifestFlows {
    async fn verify_end_to_end_flows(
        &self,
        _cancel: &CancellationToken,
        _feature: &DiscoveredFeature,
    ) -> CollabResult<Vec<Flow>> {
        Ok(self.flows.clone())
    }

    async fn verify_integration_points(
        &self,
        _cancel: &CancellationToken,
        _flows: &[Flow],
        _feature: &DiscoveredFeature,
    ) -> CollabResult<Vec<Breakpoint>> {
        Ok(Vec::new())
    }
}

struct NoDetector(LayerName);

#[async_trait]
impl<F: Send + 'static> LayerAnalyzer<F> for NoDetector {
    async fn analyze(
        &self,
        _ctx: &LayerContext,
        _feature: &DiscoveredFeature,
    ) -> CollabResult<Vec<F>> {
        debug!(layer = %self.0, "No local detector, reporting no findings");
        Ok(Vec::new())
    }
}
