// ABOUTME: Request entry point: validation, depth deadline, result cache, discovery, fan-out, assembly
// ABOUTME: Discovery failure is the only hard stop; every other failure degrades to a partial report

use readiness_ai::{LlmGateway, SelectionMetrics};
use readiness_cache::{CacheJanitor, CacheService, ResultKey};
use readiness_core::{
    feature_hash, AnalysisRequest, AnalysisResponse, ApiFinding, CacheConfig, CancellationToken,
    DiscoveredFeature, FeatureDiscovery, Finding, Flow, FlowVerifier, KnowledgeSource,
    LayerAnalyzer, LayerContext, LlmConfigSource, ReadinessConfig, ReadinessError, ReportStore,
    Result, TimeoutConfig,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::assembler::{AssemblyInput, ReportAssembler};
use crate::business::BusinessContextAnalyzer;
use crate::checklist::build_checklist;
use crate::layers::{LayerAnalyzers, LayerOrchestrator};
use crate::logic::DepthAwareLogicAnalyzer;
use crate::progressive::ProgressiveAnalyzer;

/// Layer detectors and verifiers supplied from outside the orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    pub discovery: Arc<dyn FeatureDiscovery>,
    pub flows: Arc<dyn FlowVerifier>,
    pub store: Arc<dyn ReportStore>,
    pub knowledge: Arc<dyn KnowledgeSource>,
    pub configs: Arc<dyn LlmConfigSource>,
    pub api: Arc<dyn LayerAnalyzer<ApiFinding>>,
    pub ui: Arc<dyn LayerAnalyzer<Finding>>,
    pub database: Arc<dyn LayerAnalyzer<Finding>>,
    pub integration: Arc<dyn LayerAnalyzer<Finding>>,
    pub test: Arc<dyn LayerAnalyzer<Finding>>,
}

pub struct AnalysisService {
    discovery: Arc<dyn FeatureDiscovery>,
    flows: Arc<dyn FlowVerifier>,
    configs: Arc<dyn LlmConfigSource>,
    layers: LayerOrchestrator,
    assembler: ReportAssembler,
    cache: Arc<CacheService>,
    selections: Arc<SelectionMetrics>,
    timeouts: TimeoutConfig,
}

impl AnalysisService {
    /// Wire the business and logic layers on top of the supplied collaborators.
    pub fn new(
        config: &ReadinessConfig,
        collaborators: Collaborators,
        gateway: LlmGateway,
        cache: Arc<CacheService>,
    ) -> Self {
        let selections = Arc::new(SelectionMetrics::new());
        let progressive = Arc::new(ProgressiveAnalyzer::new(
            gateway,
            cache.clone(),
            selections.clone(),
            collaborators.store.clone(),
        ));

        let analyzers = LayerAnalyzers {
            business: Arc::new(BusinessContextAnalyzer::new(
                collaborators.knowledge.clone(),
                cache.clone(),
                collaborators.configs.clone(),
            )),
            api: collaborators.api,
            ui: collaborators.ui,
            database: collaborators.database,
            logic: Arc::new(DepthAwareLogicAnalyzer::new(
                progressive,
                collaborators.configs.clone(),
            )),
            integration: collaborators.integration,
            test: collaborators.test,
        };

        Self {
            discovery: collaborators.discovery,
            flows: collaborators.flows,
            configs: collaborators.configs,
            layers: LayerOrchestrator::new(analyzers),
            assembler: ReportAssembler::new(
                collaborators.store,
                cache.clone(),
                config.report.hub_url_base.clone(),
            ),
            cache,
            selections,
            timeouts: config.timeouts.clone(),
        }
    }

    /// Run one comprehensive analysis.
    ///
    /// The request is bounded by the depth deadline; cancelling `cancel` or
    /// hitting the deadline returns an error and leaves no persisted report
    /// or result-cache entry behind.
    pub async fn analyze(
        &self,
        project_id: &str,
        request: AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResponse> {
        request.validate()?;

        let deadline = self.timeouts.for_depth(request.depth);
        let token = cancel.child_token();

        match tokio::time::timeout(deadline, self.run(project_id, &request, &token)).await {
            Ok(result) => result,
            Err(_) => {
                token.cancel();
                warn!(
                    project_id,
                    depth = %request.depth,
                    deadline_secs = deadline.as_secs(),
                    "Analysis exceeded its deadline"
                );
                Err(ReadinessError::Timeout(deadline.as_secs()))
            }
        }
    }

    async fn run(
        &self,
        project_id: &str,
        request: &AnalysisRequest,
        token: &CancellationToken,
    ) -> Result<AnalysisResponse> {
        let started = Instant::now();
        let created_at = self.cache.clock().now();
        let feature_hash = feature_hash(&request.feature, &request.codebase_path);

        if !request.depth.uses_models() {
            info!(project_id, "Surface depth: pattern checks only, no model calls");
        }

        let config = match self.configs.llm_config(project_id).await {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(project_id, "No model configuration, result cache disabled: {:#}", e);
                None
            }
        };

        if let Some(config) = &config {
            let key = ResultKey::new(project_id, &feature_hash, request.depth, request.mode);
            if let Some(report) = self.cache.results.get(&key, config) {
                info!(project_id, key = %key, "Returning cached analysis result");
                return Ok(AnalysisResponse::from_cache(report));
            }
        }

        if token.is_cancelled() {
            return Err(ReadinessError::Cancelled);
        }

        let feature = self
            .discovery
            .discover_feature(token, &request.feature, &request.codebase_path, &request.files)
            .await
            .map_err(|e| ReadinessError::Discovery(format!("{:#}", e)))?;
        let feature = Arc::new(feature);

        let ctx = LayerContext {
            cancel: token.clone(),
            project_id: project_id.to_string(),
            depth: request.depth,
            codebase_hash: feature_hash.clone(),
            codebase_path: request.codebase_path.clone(),
        };
        let outcome = self
            .layers
            .analyze_feature(&ctx, feature.clone(), request.include_business_context)
            .await;

        if token.is_cancelled() {
            warn!(project_id, "Analysis cancelled during layer fan-out");
            return Err(ReadinessError::Cancelled);
        }

        let checklist = build_checklist(&outcome.layer_analysis);
        let flows = self.verify_flows(token, &feature).await;

        let partial_analysis = outcome.is_partial();
        let report = self
            .assembler
            .assemble(
                token,
                AssemblyInput {
                    project_id: project_id.to_string(),
                    feature: request.feature.clone(),
                    feature_hash,
                    mode: request.mode,
                    depth: request.depth,
                    checklist,
                    layer_analysis: outcome.layer_analysis,
                    flows,
                    created_at,
                    started,
                },
                config.as_ref(),
            )
            .await?;

        Ok(AnalysisResponse {
            success: true,
            validation_id: report.validation_id.clone(),
            hub_url: report.hub_url.clone(),
            report,
            warnings: outcome.warnings,
            critical_errors: outcome.critical_errors,
            partial_analysis,
            cached: false,
        })
    }

    /// End-to-end flows with integration breakpoints merged in.
    async fn verify_flows(
        &self,
        token: &CancellationToken,
        feature: &DiscoveredFeature,
    ) -> Vec<Flow> {
        let mut flows = match self.flows.verify_end_to_end_flows(token, feature).await {
            Ok(flows) => flows,
            Err(e) => {
                warn!("Flow verification failed: {:#}", e);
                return Vec::new();
            }
        };

        match self.flows.verify_integration_points(token, &flows, feature).await {
            Ok(breakpoints) => {
                for flow in &mut flows {
                    flow.breakpoints.extend(breakpoints.iter().cloned());
                }
            }
            Err(e) => debug!("Integration point verification failed: {:#}", e),
        }

        flows
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    pub fn cache_hit_rate(&self, project_id: &str) -> f64 {
        self.cache.hit_rate(project_id)
    }

    pub fn cache_size(&self, project_id: &str) -> u64 {
        self.cache.cache_size(project_id)
    }

    pub fn model_selection_savings(&self, project_id: &str) -> f64 {
        self.selections.savings(project_id)
    }

    pub fn selection_metrics(&self) -> &Arc<SelectionMetrics> {
        &self.selections
    }

    /// Start the expired-entry sweeper when enabled in `config`.
    pub fn spawn_janitor(
        &self,
        config: &CacheConfig,
        shutdown: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if !config.janitor_enabled {
            return None;
        }
        let janitor = CacheJanitor::new(self.cache.clone(), config.janitor_interval());
        Some(janitor.spawn(shutdown))
    }
}
