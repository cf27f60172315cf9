use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use readiness_core::LLMConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::provider::{ProviderClient, ProviderReply, ProviderResult};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const AZURE_API_VERSION: &str = "2024-02-01";

/// Chat-completion client for the openai, anthropic and azure providers.
pub struct HttpProviderClient {
    client: Client,
}

impl HttpProviderClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    fn api_key(config: &LLMConfig) -> Result<&str> {
        config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow!("{} API key is not configured", config.provider))
    }

    async fn call_openai(&self, config: &LLMConfig, prompt: &str) -> Result<ProviderReply> {
        let base = config.base_url.as_deref().unwrap_or(OPENAI_API_BASE);
        let request = ChatRequest::new(Some(config.model.clone()), prompt, config.max_tokens);

        let response = self
            .client
            .post(format!("{}/chat/completions", base.trim_end_matches('/')))
            .timeout(Duration::from_secs(config.timeout_secs))
            .bearer_auth(Self::api_key(config)?)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        Self::parse_chat_response(response, "OpenAI").await
    }

    async fn call_azure(&self, config: &LLMConfig, prompt: &str) -> Result<ProviderReply> {
        let base = config
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow!("azure provider requires base_url"))?;
        let request = ChatRequest::new(None, prompt, config.max_tokens);

        let response = self
            .client
            .post(format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                base.trim_end_matches('/'),
                config.model,
                AZURE_API_VERSION
            ))
            .timeout(Duration::from_secs(config.timeout_secs))
            .header("api-key", Self::api_key(config)?)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Azure OpenAI API")?;

        Self::parse_chat_response(response, "Azure OpenAI").await
    }

    async fn parse_chat_response(response: reqwest::Response, label: &str) -> Result<ProviderReply> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("{} API error ({}): {}", label, status, error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} API response", label))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("{} API returned no choices", label))?;

        Ok(ProviderReply {
            text,
            tokens_used: body.usage.map(|u| u.total_tokens),
        })
    }

    async fn call_anthropic(&self, config: &LLMConfig, prompt: &str) -> Result<ProviderReply> {
        let base = config.base_url.as_deref().unwrap_or(ANTHROPIC_API_BASE);
        let request = AnthropicRequest {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", base.trim_end_matches('/')))
            .timeout(Duration::from_secs(config.timeout_secs))
            .header("x-api-key", Self::api_key(config)?)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Anthropic API error ({}): {}", status, error_text));
        }

        let body: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        let text = body
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        Ok(ProviderReply {
            text,
            tokens_used: Some(body.usage.input_tokens + body.usage.output_tokens),
        })
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn call_provider(&self, config: &LLMConfig, prompt: &str) -> ProviderResult<ProviderReply> {
        debug!(provider = %config.provider, model = %config.model, "Calling provider");
        match config.provider.as_str() {
            "openai" => self.call_openai(config, prompt).await,
            "anthropic" => self.call_anthropic(config, prompt).await,
            "azure" => self.call_azure(config, prompt).await,
            other => Err(anyhow!("unsupported provider: {}", other)),
        }
    }

    fn client_name(&self) -> &str {
        "http"
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

impl ChatRequest {
    fn new(model: Option<String>, prompt: &str, max_tokens: usize) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens,
            temperature: 0.1,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: usize,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}
