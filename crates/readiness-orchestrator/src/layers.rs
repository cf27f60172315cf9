// ABOUTME: Concurrent per-layer fan-out with cancellation checks and critical/recoverable classification
// ABOUTME: Results land in one mutex-guarded aggregate keyed by layer, so completion order never matters

use anyhow::anyhow;
use futures::FutureExt;
use parking_lot::Mutex;
use readiness_core::{
    ApiFinding, BusinessFinding, DiscoveredFeature, Finding, LayerAnalyzer, LayerContext,
    LayerFindings, LayerName,
};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::classify::{classify_error, ErrorClass};

/// One analyzer per layer.
#[derive(Clone)]
pub struct LayerAnalyzers {
    pub business: Arc<dyn LayerAnalyzer<BusinessFinding>>,
    pub api: Arc<dyn LayerAnalyzer<ApiFinding>>,
    pub ui: Arc<dyn LayerAnalyzer<Finding>>,
    pub database: Arc<dyn LayerAnalyzer<Finding>>,
    pub logic: Arc<dyn LayerAnalyzer<Finding>>,
    pub integration: Arc<dyn LayerAnalyzer<Finding>>,
    pub test: Arc<dyn LayerAnalyzer<Finding>>,
}

/// Aggregate of one fan-out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerOutcome {
    /// Every layer, empty when skipped or failed
    pub layer_analysis: BTreeMap<LayerName, LayerFindings>,
    /// Recoverable failures in layer order
    pub warnings: Vec<String>,
    /// Critical failures in layer order
    pub critical_errors: Vec<String>,
}

impl LayerOutcome {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty() || !self.critical_errors.is_empty()
    }
}

#[derive(Default)]
struct Aggregate {
    results: BTreeMap<LayerName, LayerFindings>,
    warnings: BTreeMap<LayerName, String>,
    critical: BTreeMap<LayerName, String>,
}

pub struct LayerOrchestrator {
    analyzers: LayerAnalyzers,
}

impl LayerOrchestrator {
    pub fn new(analyzers: LayerAnalyzers) -> Self {
        Self { analyzers }
    }

    /// Layers that get a task for this request.
    pub fn planned_layers(
        feature: &DiscoveredFeature,
        ctx: &LayerContext,
        include_business_context: bool,
    ) -> Vec<LayerName> {
        LayerName::all()
            .into_iter()
            .filter(|layer| match layer {
                LayerName::Business => include_business_context && ctx.depth.uses_models(),
                other => feature.has_layer(*other),
            })
            .collect()
    }

    /// Run every planned layer concurrently and wait for all of them.
    pub async fn analyze_feature(
        &self,
        ctx: &LayerContext,
        feature: Arc<DiscoveredFeature>,
        include_business_context: bool,
    ) -> LayerOutcome {
        let aggregate = Arc::new(Mutex::new(Aggregate::default()));
        let mut tasks = JoinSet::new();
        let planned = Self::planned_layers(&feature, ctx, include_business_context);

        info!(
            project_id = %ctx.project_id,
            depth = %ctx.depth,
            layers = planned.len(),
            "Starting layer analysis"
        );

        for layer in planned {
            let ctx = ctx.clone();
            let feature = feature.clone();
            let aggregate = aggregate.clone();
            match layer {
                LayerName::Business => spawn_layer(
                    &mut tasks,
                    layer,
                    self.analyzers.business.clone(),
                    LayerFindings::Business,
                    ctx,
                    feature,
                    aggregate,
                ),
                LayerName::Api => spawn_layer(
                    &mut tasks,
                    layer,
                    self.analyzers.api.clone(),
                    LayerFindings::Api,
                    ctx,
                    feature,
                    aggregate,
                ),
                LayerName::Ui => spawn_layer(
                    &mut tasks,
                    layer,
                    self.analyzers.ui.clone(),
                    LayerFindings::Ui,
                    ctx,
                    feature,
                    aggregate,
                ),
                LayerName::Database => spawn_layer(
                    &mut tasks,
                    layer,
                    self.analyzers.database.clone(),
                    LayerFindings::Database,
                    ctx,
                    feature,
                    aggregate,
                ),
                LayerName::Logic => spawn_layer(
                    &mut tasks,
                    layer,
                    self.analyzers.logic.clone(),
                    LayerFindings::Logic,
                    ctx,
                    feature,
                    aggregate,
                ),
                LayerName::Integration => spawn_layer(
                    &mut tasks,
                    layer,
                    self.analyzers.integration.clone(),
                    LayerFindings::Integration,
                    ctx,
                    feature,
                    aggregate,
                ),
                LayerName::Test => spawn_layer(
                    &mut tasks,
                    layer,
                    self.analyzers.test.clone(),
                    LayerFindings::Test,
                    ctx,
                    feature,
                    aggregate,
                ),
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Layer task aborted: {}", e);
            }
        }

        let mut aggregate = std::mem::take(&mut *aggregate.lock());
        for layer in LayerName::all() {
            aggregate
                .results
                .entry(layer)
                .or_insert_with(|| LayerFindings::empty(layer));
        }

        if !aggregate.critical.is_empty() {
            error!(
                project_id = %ctx.project_id,
                critical = aggregate.critical.len(),
                "Critical errors in layer analysis, continuing with partial results"
            );
        }

        LayerOutcome {
            layer_analysis: aggregate.results,
            warnings: aggregate.warnings.into_values().collect(),
            critical_errors: aggregate.critical.into_values().collect(),
        }
    }
}

fn spawn_layer<F>(
    tasks: &mut JoinSet<()>,
    layer: LayerName,
    analyzer: Arc<dyn LayerAnalyzer<F>>,
    wrap: fn(Vec<F>) -> LayerFindings,
    ctx: LayerContext,
    feature: Arc<DiscoveredFeature>,
    aggregate: Arc<Mutex<Aggregate>>,
) where
    F: Send + 'static,
{
    tasks.spawn(async move {
        if ctx.is_cancelled() {
            warn!(layer = %layer, "{} analysis cancelled", layer.label());
            return;
        }

        let result = match AssertUnwindSafe(analyzer.analyze(&ctx, &feature))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => Err(anyhow!("analyzer panicked")),
        };

        match result {
            Ok(findings) => {
                if ctx.is_cancelled() {
                    warn!(layer = %layer, "Cancelled before writing results");
                    return;
                }
                debug!(layer = %layer, findings = findings.len(), "Layer analysis complete");
                aggregate.lock().results.insert(layer, wrap(findings));
            }
            Err(e) => {
                warn!(layer = %layer, "{} analysis failed: {:#}", layer.label(), e);
                if ctx.is_cancelled() {
                    warn!(layer = %layer, "Cancelled before writing error");
                    return;
                }
                let message = format!("{}: {:#}", layer.label(), e);
                let mut aggregate = aggregate.lock();
                aggregate.results.insert(layer, LayerFindings::empty(layer));
                match classify_error(&e) {
                    ErrorClass::Critical => aggregate.critical.insert(layer, message),
                    ErrorClass::Recoverable => aggregate.warnings.insert(layer, message),
                };
            }
        }
    });
}
