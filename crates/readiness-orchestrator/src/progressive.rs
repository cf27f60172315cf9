// ABOUTME: Depth-gated model path: response cache, model selection, gateway call, usage record
// ABOUTME: Surface depth never reaches a model and costs nothing

use readiness_ai::{estimate_tokens, select_model, GatewayError, LlmGateway, SelectionMetrics};
use readiness_cache::{CacheService, CachedResponse, ResponseKey};
use readiness_core::{LLMConfig, LayerContext, ReportStore, UsageRecord};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ProgressiveAnalyzer {
    gateway: LlmGateway,
    cache: Arc<CacheService>,
    selections: Arc<SelectionMetrics>,
    store: Arc<dyn ReportStore>,
}

impl ProgressiveAnalyzer {
    pub fn new(
        gateway: LlmGateway,
        cache: Arc<CacheService>,
        selections: Arc<SelectionMetrics>,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            gateway,
            cache,
            selections,
            store,
        }
    }

    /// Run `prompt` at the request's depth, returning raw model text.
    ///
    /// `content` is the analysed source and only keys the response cache.
    /// Model selection is sized on `prompt`, the same text the call is priced
    /// from. Returns an empty string at surface depth.
    pub async fn analyze(
        &self,
        ctx: &LayerContext,
        config: &LLMConfig,
        content: &str,
        prompt: &str,
        analysis_type: &str,
    ) -> Result<String, GatewayError> {
        if !ctx.depth.uses_models() {
            return Ok(String::new());
        }

        let key = ResponseKey::new(content, analysis_type, ctx.depth);
        if let Some(cached) = self.cache.responses.get(&ctx.project_id, &key, config) {
            debug!(
                project_id = %ctx.project_id,
                analysis_type,
                model = %cached.model,
                "Serving model response from cache"
            );
            return Ok(cached.text);
        }

        let selection = select_model(analysis_type, config, ctx.depth, estimate_tokens(prompt));
        self.selections.record(&ctx.project_id, &selection);
        let selected = config.with_model(selection.model.clone());

        let response = self
            .gateway
            .call(&ctx.cancel, &selected, prompt, analysis_type)
            .await?;

        // Spend is recorded even if the request was cancelled while the call was in flight
        let usage = UsageRecord::new(
            ctx.project_id.clone(),
            response.provider.clone(),
            response.model.clone(),
            response.tokens_used,
            response.estimated_cost,
            self.cache.clock().now(),
        );
        if let Err(e) = self.store.record_usage(&usage).await {
            warn!(project_id = %ctx.project_id, "Failed to record model usage: {:#}", e);
        }

        if ctx.is_cancelled() {
            warn!(project_id = %ctx.project_id, analysis_type, "Cancelled before caching model response");
            return Err(GatewayError::Cancelled);
        }

        self.cache.responses.set(
            key,
            CachedResponse {
                text: response.text.clone(),
                tokens_used: response.tokens_used,
                model: response.model,
            },
            config,
        );

        Ok(response.text)
    }
}
