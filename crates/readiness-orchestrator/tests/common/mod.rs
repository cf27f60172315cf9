// ABOUTME: Scripted collaborators and a temp-dir fixture shared by the orchestrator integration tests
// ABOUTME: Every double counts its calls so tests can assert what a cached or cancelled request skipped

#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use readiness_ai::{LlmGateway, ProviderClient, ProviderReply, ProviderResult};
use readiness_cache::CacheService;
use readiness_core::*;
use readiness_orchestrator::{AnalysisService, Collaborators, MemoryReportStore};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const PROJECT: &str = "proj-1";

pub const BILLING_GO: &str = "package billing\n\nimport \"fmt\"\n\nfunc Charge(amount int) int {\n\ttotal := amount * 2\n\tfmt.Println(total)\n\treturn total\n}\n";

pub const SEMANTIC_REPLY: &str = r#"{"issues":[{"type":"logic_error","severity":"high","description":"Charge doubles the amount","line":6}]}"#;

pub struct ScriptedProvider {
    reply: String,
    tokens: Option<u64>,
    failure: Option<String>,
    calls: AtomicUsize,
    models: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            tokens: Some(400),
            failure: None,
            calls: AtomicUsize::new(0),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::replying("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Models requested, in call order.
    pub fn models(&self) -> Vec<String> {
        self.models.lock().clone()
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn call_provider(&self, config: &LLMConfig, _prompt: &str) -> ProviderResult<ProviderReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.models.lock().push(config.model.clone());
        if let Some(message) = &self.failure {
            return Err(anyhow!("{}", message));
        }
        Ok(ProviderReply {
            text: self.reply.clone(),
            tokens_used: self.tokens,
        })
    }

    fn client_name(&self) -> &str {
        "scripted"
    }
}

/// Layer analyzer with a fixed outcome and optional latency.
pub struct ScriptedLayer<F> {
    findings: Vec<F>,
    delay: Duration,
    error: Option<String>,
    panics: bool,
    calls: AtomicUsize,
}

impl<F: Clone + Send + Sync> ScriptedLayer<F> {
    pub fn returning(findings: Vec<F>) -> Self {
        Self {
            findings,
            delay: Duration::ZERO,
            error: None,
            panics: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::returning(Vec::new())
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::returning(Vec::new())
        }
    }

    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F: Clone + Send + Sync + 'static> LayerAnalyzer<F> for ScriptedLayer<F> {
    async fn analyze(
        &self,
        _ctx: &LayerContext,
        _feature: &DiscoveredFeature,
    ) -> CollabResult<Vec<F>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("scripted analyzer blew up");
        }
        if let Some(message) = &self.error {
            return Err(anyhow!("{}", message));
        }
        Ok(self.findings.clone())
    }
}

pub struct StaticDiscovery {
    outcome: std::result::Result<DiscoveredFeature, String>,
    calls: AtomicUsize,
}

impl StaticDiscovery {
    pub fn new(feature: DiscoveredFeature) -> Self {
        Self {
            outcome: Ok(feature),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureDiscovery for StaticDiscovery {
    async fn discover_feature(
        &self,
        _cancel: &CancellationToken,
        _feature_name: &str,
        _codebase_path: &Path,
        _manual_files: &BTreeMap<LayerName, Vec<std::path::PathBuf>>,
    ) -> CollabResult<DiscoveredFeature> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(|e| anyhow!("{}", e))
    }
}

#[derive(Default)]
pub struct StaticFlows {
    pub flows: Vec<Flow>,
    pub breakpoints: Vec<Breakpoint>,
    pub fail_flows: bool,
    pub fail_breakpoints: bool,
}

#[async_trait]
impl FlowVerifier for StaticFlows {
    async fn verify_end_to_end_flows(
        &self,
        _cancel: &CancellationToken,
        _feature: &DiscoveredFeature,
    ) -> CollabResult<Vec<Flow>> {
        if self.fail_flows {
            return Err(anyhow!("flow graph unavailable"));
        }
        Ok(self.flows.clone())
    }

    async fn verify_integration_points(
        &self,
        _cancel: &CancellationToken,
        _flows: &[Flow],
        _feature: &DiscoveredFeature,
    ) -> CollabResult<Vec<Breakpoint>> {
        if self.fail_breakpoints {
            return Err(anyhow!("integration scan failed"));
        }
        Ok(self.breakpoints.clone())
    }
}

#[derive(Default)]
pub struct StaticKnowledge {
    pub rules: Vec<KnowledgeItem>,
    pub journeys: Vec<KnowledgeItem>,
    pub fail_rules: bool,
    pub fail_journeys: bool,
    rule_calls: AtomicUsize,
}

impl StaticKnowledge {
    pub fn rule_calls(&self) -> usize {
        self.rule_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeSource for StaticKnowledge {
    async fn business_rules(&self, _project_id: &str) -> CollabResult<Vec<KnowledgeItem>> {
        self.rule_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_rules {
            return Err(anyhow!("knowledge base offline"));
        }
        Ok(self.rules.clone())
    }

    async fn user_journeys(&self, _project_id: &str) -> CollabResult<Vec<KnowledgeItem>> {
        if self.fail_journeys {
            return Err(anyhow!("journey index offline"));
        }
        Ok(self.journeys.clone())
    }
}

/// Report store whose report writes always fail; usage still lands in `inner`.
pub struct RejectingStore {
    pub inner: Arc<MemoryReportStore>,
}

#[async_trait]
impl ReportStore for RejectingStore {
    async fn persist_report(&self, _report: &AnalysisReport, _project_id: &str) -> CollabResult<()> {
        Err(anyhow!("disk full"))
    }

    async fn record_usage(&self, usage: &UsageRecord) -> CollabResult<()> {
        self.inner.record_usage(usage).await
    }

    async fn backfill_usage_validation_id(
        &self,
        validation_id: &str,
        project_id: &str,
    ) -> CollabResult<usize> {
        self.inner
            .backfill_usage_validation_id(validation_id, project_id)
            .await
    }
}

pub struct FixedConfig(pub std::result::Result<LLMConfig, String>);

#[async_trait]
impl LlmConfigSource for FixedConfig {
    async fn llm_config(&self, _project_id: &str) -> CollabResult<LLMConfig> {
        self.0.clone().map_err(|e| anyhow!("{}", e))
    }
}

pub fn finding(kind: &str, severity: Severity, location: &str) -> Finding {
    Finding::new(kind, severity, location, format!("{} at {}", kind, location))
}

/// Checkout feature with every discoverable layer present.
pub fn checkout_feature() -> DiscoveredFeature {
    let mut feature = DiscoveredFeature::new("checkout");
    feature.ui_layer = Some(UiLayer {
        components: vec![ComponentInfo {
            name: "CheckoutForm".to_string(),
            path: "ui/checkout.tsx".to_string(),
            kind: "form".to_string(),
            ..Default::default()
        }],
        framework: "react".to_string(),
    });
    feature.api_layer = Some(ApiLayer {
        endpoints: vec![EndpointInfo {
            method: "POST".to_string(),
            path: "/checkout".to_string(),
            file: "api/checkout.go".to_string(),
            ..Default::default()
        }],
        framework: "chi".to_string(),
    });
    feature.database_layer = Some(DatabaseLayer {
        tables: vec![TableInfo {
            name: "orders".to_string(),
            source: "migration".to_string(),
            ..Default::default()
        }],
        orm_type: String::new(),
    });
    feature.logic_layer = Some(LogicLayer {
        functions: vec![FunctionInfo {
            name: "Charge".to_string(),
            signature: "func Charge(amount int) int".to_string(),
            file: "billing.go".to_string(),
            line_number: 5,
        }],
        language: "go".to_string(),
    });
    feature.integration_layer = Some(IntegrationLayer {
        integrations: vec![IntegrationInfo {
            service: "payments".to_string(),
            endpoint: "https://pay.example/charge".to_string(),
            method: "POST".to_string(),
            file: "billing.go".to_string(),
            line_number: 7,
        }],
    });
    feature.test_layer = Some(TestLayer {
        test_files: vec![TestFileInfo {
            path: "billing_test.go".to_string(),
            ..Default::default()
        }],
    });
    feature
}

pub struct Fixture {
    pub root: TempDir,
    pub config: ReadinessConfig,
    pub clock: Arc<ManualClock>,
    pub provider: Arc<ScriptedProvider>,
    pub store: Arc<MemoryReportStore>,
    pub reject_persist: bool,
    pub discovery: Arc<StaticDiscovery>,
    pub flows: Arc<StaticFlows>,
    pub knowledge: Arc<StaticKnowledge>,
    pub configs: Arc<dyn LlmConfigSource>,
    pub api: Arc<ScriptedLayer<ApiFinding>>,
    pub ui: Arc<ScriptedLayer<Finding>>,
    pub database: Arc<ScriptedLayer<Finding>>,
    pub integration: Arc<ScriptedLayer<Finding>>,
    pub test: Arc<ScriptedLayer<Finding>>,
}

pub fn fixture() -> Fixture {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("billing.go"), BILLING_GO).unwrap();

    Fixture {
        root,
        config: ReadinessConfig::default(),
        clock: Arc::new(ManualClock::default()),
        provider: Arc::new(ScriptedProvider::replying(SEMANTIC_REPLY)),
        store: Arc::new(MemoryReportStore::new()),
        reject_persist: false,
        discovery: Arc::new(StaticDiscovery::new(checkout_feature())),
        flows: Arc::new(StaticFlows::default()),
        knowledge: Arc::new(StaticKnowledge::default()),
        configs: Arc::new(LLMConfig::default()),
        api: Arc::new(ScriptedLayer::returning(vec![ApiFinding::from(finding(
            "missing_auth",
            Severity::High,
            "api/checkout.go:12",
        ))])),
        ui: Arc::new(ScriptedLayer::returning(vec![finding(
            "accessibility_issue",
            Severity::Low,
            "ui/checkout.tsx:40",
        )])),
        database: Arc::new(ScriptedLayer::returning(vec![finding(
            "missing_index",
            Severity::Medium,
            "migrations/001_orders.sql",
        )])),
        integration: Arc::new(ScriptedLayer::returning(vec![finding(
            "missing_retry",
            Severity::Medium,
            "billing.go:7",
        )])),
        test: Arc::new(ScriptedLayer::returning(vec![finding(
            "missing_coverage",
            Severity::Low,
            "billing_test.go",
        )])),
    }
}

impl Fixture {
    pub fn service(&self) -> AnalysisService {
        let store: Arc<dyn ReportStore> = if self.reject_persist {
            Arc::new(RejectingStore {
                inner: self.store.clone(),
            })
        } else {
            self.store.clone()
        };

        let collaborators = Collaborators {
            discovery: self.discovery.clone(),
            flows: self.flows.clone(),
            store,
            knowledge: self.knowledge.clone(),
            configs: self.configs.clone(),
            api: self.api.clone(),
            ui: self.ui.clone(),
            database: self.database.clone(),
            integration: self.integration.clone(),
            test: self.test.clone(),
        };
        let cache = Arc::new(CacheService::new(self.clock.clone() as Arc<dyn Clock>));
        AnalysisService::new(
            &self.config,
            collaborators,
            LlmGateway::new(self.provider.clone()),
            cache,
        )
    }

    pub fn request(&self, depth: Depth) -> AnalysisRequest {
        AnalysisRequest::auto("checkout", self.root.path()).with_depth(depth)
    }

    pub fn layer_context(&self, depth: Depth) -> LayerContext {
        LayerContext {
            cancel: CancellationToken::new(),
            project_id: PROJECT.to_string(),
            depth,
            codebase_hash: feature_hash("checkout", self.root.path()),
            codebase_path: self.root.path().to_path_buf(),
        }
    }
}
