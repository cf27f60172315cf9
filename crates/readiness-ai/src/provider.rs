use async_trait::async_trait;
use readiness_core::LLMConfig;
use serde::{Deserialize, Serialize};

/// Result type for provider operations
pub type ProviderResult<T> = anyhow::Result<T>;

/// Raw reply from a provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReply {
    pub text: String,
    /// Total tokens as reported by the provider, when it reports usage
    pub tokens_used: Option<u64>,
}

/// The only network egress of the analysis core.
///
/// Implementations make exactly one attempt; retry policy belongs to callers.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn call_provider(&self, config: &LLMConfig, prompt: &str) -> ProviderResult<ProviderReply>;

    fn client_name(&self) -> &str;
}
