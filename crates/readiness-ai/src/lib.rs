pub mod cost_model;
pub mod gateway;
pub mod http_provider;
pub mod pricing;
pub mod provider;
pub mod savings;

pub use cost_model::{estimate_tokens, select_model, ModelSelection, ModelTier, BYTES_PER_TOKEN};
pub use gateway::{GatewayError, GatewayResponse, LlmGateway};
pub use http_provider::HttpProviderClient;
pub use provider::{ProviderClient, ProviderReply, ProviderResult};
pub use savings::{SelectionMetrics, SelectionStats};
