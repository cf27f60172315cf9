use readiness_core::{CancellationToken, LLMConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cost_model::estimate_tokens;
use crate::pricing;
use crate::provider::ProviderClient;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Model call cancelled before dispatch")]
    Cancelled,
}

/// Text and accounting for one completed model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub text: String,
    pub tokens_used: u64,
    pub provider: String,
    pub model: String,
    pub estimated_cost: f64,
}

/// Transport from a prompt to a priced model reply.
///
/// The gateway never retries and never persists usage; callers do both.
#[derive(Clone)]
pub struct LlmGateway {
    client: Arc<dyn ProviderClient>,
}

impl LlmGateway {
    pub fn new(client: Arc<dyn ProviderClient>) -> Self {
        Self { client }
    }

    pub async fn call(
        &self,
        cancel: &CancellationToken,
        config: &LLMConfig,
        prompt: &str,
        analysis_type: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let estimated_tokens = estimate_tokens(prompt);
        debug!(
            analysis_type,
            provider = %config.provider,
            model = %config.model,
            estimated_tokens,
            client = self.client.client_name(),
            "Dispatching model call"
        );

        // A dispatched call runs to completion even if the request is cancelled meanwhile
        let reply = self
            .client
            .call_provider(config, prompt)
            .await
            .map_err(|e| {
                warn!(analysis_type, model = %config.model, "Provider call failed: {:#}", e);
                GatewayError::Provider(format!("{:#}", e))
            })?;

        let tokens_used = reply
            .tokens_used
            .unwrap_or_else(|| estimated_tokens + estimate_tokens(&reply.text));
        let estimated_cost = pricing::cost(&config.provider, &config.model, tokens_used);

        Ok(GatewayResponse {
            text: reply.text,
            tokens_used,
            provider: config.provider.clone(),
            model: config.model.clone(),
            estimated_cost,
        })
    }
}
