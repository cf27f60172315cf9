use chrono::{DateTime, Utc};
use readiness_cache::{CacheService, ResultKey};
use readiness_core::{
    AnalysisMode, AnalysisReport, CancellationToken, ChecklistItem, Depth, Flow, LLMConfig,
    LayerFindings, LayerName, ReadinessError, ReportStore, Result,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::checklist::build_summary;

/// Everything one request produced, ready to become a report.
#[derive(Debug, Clone)]
pub struct AssemblyInput {
    pub project_id: String,
    pub feature: String,
    pub feature_hash: String,
    pub mode: AnalysisMode,
    pub depth: Depth,
    pub checklist: Vec<ChecklistItem>,
    pub layer_analysis: BTreeMap<LayerName, LayerFindings>,
    pub flows: Vec<Flow>,
    pub created_at: DateTime<Utc>,
    pub started: Instant,
}

pub fn new_validation_id() -> String {
    format!("VAL-{}", Uuid::new_v4())
}

pub struct ReportAssembler {
    store: Arc<dyn ReportStore>,
    cache: Arc<CacheService>,
    hub_url_base: String,
}

impl ReportAssembler {
    pub fn new(
        store: Arc<dyn ReportStore>,
        cache: Arc<CacheService>,
        hub_url_base: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            hub_url_base: hub_url_base.into(),
        }
    }

    pub fn hub_url(&self, validation_id: &str) -> String {
        format!(
            "{}/validations/{}",
            self.hub_url_base.trim_end_matches('/'),
            validation_id
        )
    }

    /// Build, persist and cache the report for one request.
    ///
    /// Persistence and usage back-fill failures are logged and the report is
    /// still returned. The result cache is only written when `config` allows
    /// it and the request is still live.
    pub async fn assemble(
        &self,
        cancel: &CancellationToken,
        input: AssemblyInput,
        config: Option<&LLMConfig>,
    ) -> Result<AnalysisReport> {
        let validation_id = new_validation_id();
        let summary = build_summary(&input.checklist, &input.flows, input.started.elapsed());

        let report = AnalysisReport {
            hub_url: self.hub_url(&validation_id),
            validation_id,
            feature: input.feature,
            mode: input.mode,
            depth: input.depth,
            summary,
            checklist: input.checklist,
            layer_analysis: input.layer_analysis,
            end_to_end_flows: input.flows,
            created_at: input.created_at,
            completed_at: Some(self.cache.clock().now()),
        };

        if cancel.is_cancelled() {
            warn!(project_id = %input.project_id, "Cancelled before persisting report");
            return Err(ReadinessError::Cancelled);
        }

        match self.store.persist_report(&report, &input.project_id).await {
            Ok(()) => {
                match self
                    .store
                    .backfill_usage_validation_id(&report.validation_id, &input.project_id)
                    .await
                {
                    Ok(updated) => debug!(
                        validation_id = %report.validation_id,
                        updated,
                        "Back-filled usage records"
                    ),
                    Err(e) => warn!(
                        validation_id = %report.validation_id,
                        "Failed to back-fill usage validation id: {:#}", e
                    ),
                }
            }
            Err(e) => warn!(
                validation_id = %report.validation_id,
                "Failed to persist report, returning it anyway: {:#}", e
            ),
        }

        if cancel.is_cancelled() {
            warn!(project_id = %input.project_id, "Cancelled before caching report");
            return Err(ReadinessError::Cancelled);
        }

        if let Some(config) = config {
            let key = ResultKey::new(&input.project_id, &input.feature_hash, input.depth, input.mode);
            self.cache.results.set(key, report.clone(), config);
        }

        info!(
            validation_id = %report.validation_id,
            findings = report.summary.total_findings,
            flows = report.summary.flows_verified,
            "Analysis report assembled"
        );
        Ok(report)
    }
}
