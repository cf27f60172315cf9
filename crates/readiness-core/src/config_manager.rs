use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::Depth;

/// Providers the gateway knows how to price and call.
pub const SUPPORTED_PROVIDERS: &[&str] = &["openai", "anthropic", "azure"];

/// Upper bound for `cache_ttl_hours` (one year).
pub const MAX_CACHE_TTL_HOURS: i64 = 8760;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for the readiness analyzer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReadinessConfig {
    /// Model provider and cost controls
    #[serde(default)]
    pub llm: LLMConfig,

    /// Per-depth request deadlines
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Background cache maintenance
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Provider configuration used for every model call in a request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LLMConfig {
    /// Provider: "openai", "anthropic" or "azure"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Configured model; an empty string lets the depth selector pick the tier default
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key material, never logged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Endpoint override (required for azure deployments)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// HTTP timeout for a single provider call
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum tokens the provider may generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default)]
    pub cost_optimization: CostOptimization,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: None,
            base_url: None,
            timeout_secs: default_llm_timeout_secs(),
            max_tokens: default_max_tokens(),
            cost_optimization: CostOptimization::default(),
        }
    }
}

impl LLMConfig {
    /// Copy of this config pointing at a different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        let mut config = self.clone();
        config.model = model.into();
        config
    }

    /// Response/result/context entry lifetime.
    ///
    /// Non-positive hours fall back to the 24 hour default.
    pub fn cache_ttl(&self) -> Duration {
        let hours = if self.cost_optimization.cache_ttl_hours > 0 {
            self.cost_optimization.cache_ttl_hours as u64
        } else {
            default_cache_ttl_hours() as u64
        };
        Duration::from_secs(hours * 3600)
    }

    pub fn use_cache(&self) -> bool {
        self.cost_optimization.use_cache
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostOptimization {
    #[serde(default = "default_true")]
    pub use_cache: bool,

    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: i64,

    #[serde(default = "default_true")]
    pub progressive_depth: bool,

    /// Per-request ceiling in USD (0 = unlimited)
    #[serde(default)]
    pub max_cost_per_request: f64,
}

impl Default for CostOptimization {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_ttl_hours: default_cache_ttl_hours(),
            progressive_depth: true,
            max_cost_per_request: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Base request timeout, used for surface analysis
    #[serde(default = "default_request_timeout_secs")]
    pub request_secs: u64,

    /// Analysis timeout, used for medium analysis; deep uses three times this
    #[serde(default = "default_analysis_timeout_secs")]
    pub analysis_secs: u64,

    #[serde(default = "default_query_timeout_secs")]
    pub query_secs: u64,

    #[serde(default = "default_context_timeout_secs")]
    pub context_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: default_request_timeout_secs(),
            analysis_secs: default_analysis_timeout_secs(),
            query_secs: default_query_timeout_secs(),
            context_secs: default_context_timeout_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn for_depth(&self, depth: Depth) -> Duration {
        match depth {
            Depth::Surface => Duration::from_secs(self.request_secs),
            Depth::Medium => Duration::from_secs(self.analysis_secs),
            Depth::Deep => Duration::from_secs(self.analysis_secs.saturating_mul(3)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Run the periodic expired-entry sweep
    #[serde(default = "default_true")]
    pub janitor_enabled: bool,

    #[serde(default = "default_janitor_interval_secs")]
    pub janitor_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            janitor_enabled: true,
            janitor_interval_secs: default_janitor_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Base URL used to build `hub_url` links on reports
    #[serde(default = "default_hub_url_base")]
    pub hub_url_base: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            hub_url_base: default_hub_url_base(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_max_tokens() -> usize {
    2048
}
fn default_cache_ttl_hours() -> i64 {
    24
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_analysis_timeout_secs() -> u64 {
    60
}
fn default_query_timeout_secs() -> u64 {
    10
}
fn default_context_timeout_secs() -> u64 {
    30
}
fn default_janitor_interval_secs() -> u64 {
    3600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_hub_url_base() -> String {
    "http://localhost:8080".to_string()
}

/// Configuration manager with file discovery and environment overrides
pub struct ConfigManager {
    config: ReadinessConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.readiness.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading readiness configuration");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!(path = %path.display(), "Configuration loaded"),
            None => info!("Configuration loaded (defaults, no config file)"),
        }
        info!(
            provider = %config.llm.provider,
            model = %config.llm.model,
            use_cache = config.llm.cost_optimization.use_cache,
            max_cost = config.llm.cost_optimization.max_cost_per_request,
            "LLM cost settings"
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load an explicit config file, still honouring environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::read_toml_file(path)?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an in-memory configuration after validating it.
    pub fn from_config(config: ReadinessConfig) -> Result<Self, ConfigError> {
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".readiness.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .readiness.env: {}", e);
                }
            }
        }
    }

    /// Search order: ./.readiness.toml, then ~/.readiness/config.toml
    fn load_config_file() -> Result<(ReadinessConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".readiness.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".readiness").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((ReadinessConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<ReadinessConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: ReadinessConfig) -> ReadinessConfig {
        if let Ok(provider) = std::env::var("READINESS_LLM_PROVIDER") {
            config.llm.provider = provider.to_lowercase();
        }
        if let Ok(model) = std::env::var("READINESS_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(url) = std::env::var("READINESS_LLM_BASE_URL") {
            config.llm.base_url = Some(url);
        }
        if let Ok(cost) = std::env::var("READINESS_MAX_COST_PER_REQUEST") {
            if let Ok(c) = cost.parse() {
                config.llm.cost_optimization.max_cost_per_request = c;
            }
        }
        if let Ok(ttl) = std::env::var("READINESS_CACHE_TTL_HOURS") {
            if let Ok(h) = ttl.parse() {
                config.llm.cost_optimization.cache_ttl_hours = h;
            }
        }
        if let Ok(use_cache) = std::env::var("READINESS_USE_CACHE") {
            config.llm.cost_optimization.use_cache =
                use_cache.to_lowercase() == "true" || use_cache == "1";
        }
        if let Ok(secs) = std::env::var("READINESS_REQUEST_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse() {
                config.timeouts.request_secs = s;
            }
        }
        if let Ok(secs) = std::env::var("READINESS_ANALYSIS_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse() {
                config.timeouts.analysis_secs = s;
            }
        }

        // Provider key only fills in when the file did not set one
        if config.llm.api_key.is_none() {
            let key_var = match config.llm.provider.as_str() {
                "anthropic" => "ANTHROPIC_API_KEY",
                "azure" => "AZURE_OPENAI_API_KEY",
                _ => "OPENAI_API_KEY",
            };
            if let Ok(key) = std::env::var(key_var) {
                config.llm.api_key = Some(key);
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    /// Validate configuration
    pub fn validate_config(config: &ReadinessConfig) -> Result<(), ConfigError> {
        if !SUPPORTED_PROVIDERS.contains(&config.llm.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid LLM provider: {}. Must be one of: {}",
                config.llm.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        let cost = &config.llm.cost_optimization;
        if cost.cache_ttl_hours < 0 || cost.cache_ttl_hours > MAX_CACHE_TTL_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "cache_ttl_hours must be between 0 and {}",
                MAX_CACHE_TTL_HOURS
            )));
        }
        if cost.max_cost_per_request < 0.0 || cost.max_cost_per_request.is_nan() {
            return Err(ConfigError::ValidationError(
                "max_cost_per_request must be >= 0".to_string(),
            ));
        }

        if config.timeouts.request_secs == 0 || config.timeouts.analysis_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request and analysis timeouts must be greater than zero".to_string(),
            ));
        }

        if config.cache.janitor_enabled && config.cache.janitor_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "janitor_interval_secs must be greater than zero when the janitor is enabled"
                    .to_string(),
            ));
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = ReadinessConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReadinessConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());
        assert_eq!(config.llm.cost_optimization.cache_ttl_hours, 24);
        assert!(config.llm.use_cache());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let mut config = ReadinessConfig::default();
        config.llm.provider = "ollama".to_string();
        assert!(matches!(
            ConfigManager::validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_ttl_bounds() {
        let mut config = ReadinessConfig::default();
        config.llm.cost_optimization.cache_ttl_hours = MAX_CACHE_TTL_HOURS + 1;
        assert!(ConfigManager::validate_config(&config).is_err());

        config.llm.cost_optimization.cache_ttl_hours = -1;
        assert!(ConfigManager::validate_config(&config).is_err());

        config.llm.cost_optimization.cache_ttl_hours = 0;
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[test]
    fn test_negative_cost_ceiling_rejected() {
        let mut config = ReadinessConfig::default();
        config.llm.cost_optimization.max_cost_per_request = -0.5;
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_ttl_uses_default() {
        let mut llm = LLMConfig::default();
        llm.cost_optimization.cache_ttl_hours = 0;
        assert_eq!(llm.cache_ttl(), Duration::from_secs(24 * 3600));

        llm.cost_optimization.cache_ttl_hours = 2;
        assert_eq!(llm.cache_ttl(), Duration::from_secs(2 * 3600));
    }

    #[test]
    fn test_depth_timeouts() {
        let timeouts = TimeoutConfig::default();
        assert_eq!(timeouts.for_depth(Depth::Surface), Duration::from_secs(30));
        assert_eq!(timeouts.for_depth(Depth::Medium), Duration::from_secs(60));
        assert_eq!(timeouts.for_depth(Depth::Deep), Duration::from_secs(180));
    }

    #[test]
    fn test_huge_analysis_timeout_saturates() {
        let timeouts = TimeoutConfig {
            analysis_secs: u64::MAX,
            ..TimeoutConfig::default()
        };
        assert_eq!(timeouts.for_depth(Depth::Deep), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_zero_janitor_interval_rejected_only_when_enabled() {
        let mut config = ReadinessConfig::default();
        config.cache.janitor_interval_secs = 0;
        assert!(matches!(
            ConfigManager::validate_config(&config),
            Err(ConfigError::ValidationError(msg)) if msg.contains("janitor_interval_secs")
        ));

        config.cache.janitor_enabled = false;
        assert!(ConfigManager::validate_config(&config).is_ok());
    }
}
