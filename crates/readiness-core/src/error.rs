use thiserror::Error;

use crate::config_manager::ConfigError;

#[derive(Error, Debug)]
pub enum ReadinessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Feature discovery failed: {0}")]
    Discovery(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Analysis timed out after {0}s")]
    Timeout(u64),
}

impl ReadinessError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True when the caller gave up on the request (cancellation or deadline).
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, ReadinessError>;
