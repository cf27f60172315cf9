use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ReadinessError, Result};

/// How much model spend a request may incur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    /// Pattern/AST checks only, never calls a model
    Surface,
    /// Low-cost model tier
    #[default]
    Medium,
    /// High-accuracy model tier
    Deep,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Surface => "surface",
            Depth::Medium => "medium",
            Depth::Deep => "deep",
        }
    }

    pub fn all() -> [Depth; 3] {
        [Depth::Surface, Depth::Medium, Depth::Deep]
    }

    pub fn uses_models(&self) -> bool {
        !matches!(self, Depth::Surface)
    }
}

impl FromStr for Depth {
    type Err = ReadinessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "surface" => Ok(Depth::Surface),
            "medium" => Ok(Depth::Medium),
            "deep" => Ok(Depth::Deep),
            other => Err(ReadinessError::validation(format!(
                "depth must be 'surface', 'medium', or 'deep' (got '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Auto,
    Manual,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Auto => "auto",
            AnalysisMode::Manual => "manual",
        }
    }
}

impl FromStr for AnalysisMode {
    type Err = ReadinessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(AnalysisMode::Auto),
            "manual" => Ok(AnalysisMode::Manual),
            other => Err(ReadinessError::validation(format!(
                "mode must be 'auto' or 'manual' (got '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Architectural layer analyzed by one orchestrator task.
///
/// Ordering is fixed so maps keyed by layer serialize identically no matter
/// which task finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerName {
    Business,
    Api,
    Ui,
    Database,
    Logic,
    Integration,
    Test,
}

impl LayerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerName::Business => "business",
            LayerName::Api => "api",
            LayerName::Ui => "ui",
            LayerName::Database => "database",
            LayerName::Logic => "logic",
            LayerName::Integration => "integration",
            LayerName::Test => "test",
        }
    }

    /// Prefix used in warning and critical-error messages.
    pub fn label(&self) -> &'static str {
        match self {
            LayerName::Business => "Business context",
            LayerName::Api => "API layer",
            LayerName::Ui => "UI layer",
            LayerName::Database => "Database layer",
            LayerName::Logic => "Business logic",
            LayerName::Integration => "Integration layer",
            LayerName::Test => "Test layer",
        }
    }

    /// Checklist category for findings of this layer.
    pub fn category(&self) -> &'static str {
        match self {
            LayerName::Test => "tests",
            other => other.as_str(),
        }
    }

    pub fn all() -> [LayerName; 7] {
        [
            LayerName::Business,
            LayerName::Api,
            LayerName::Ui,
            LayerName::Database,
            LayerName::Logic,
            LayerName::Integration,
            LayerName::Test,
        ]
    }
}

impl FromStr for LayerName {
    type Err = ReadinessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "business" => Ok(LayerName::Business),
            "api" => Ok(LayerName::Api),
            "ui" => Ok(LayerName::Ui),
            "database" | "db" => Ok(LayerName::Database),
            "logic" => Ok(LayerName::Logic),
            "integration" => Ok(LayerName::Integration),
            "test" | "tests" => Ok(LayerName::Test),
            other => Err(ReadinessError::validation(format!("unknown layer '{}'", other))),
        }
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single comprehensive analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub feature: String,
    pub mode: AnalysisMode,
    #[serde(default)]
    pub depth: Depth,
    /// Manual-mode file lists, relative to `codebase_path`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<LayerName, Vec<PathBuf>>,
    #[serde(default)]
    pub codebase_path: PathBuf,
    #[serde(default)]
    pub include_business_context: bool,
}

impl AnalysisRequest {
    pub fn auto(feature: impl Into<String>, codebase_path: impl Into<PathBuf>) -> Self {
        Self {
            feature: feature.into(),
            mode: AnalysisMode::Auto,
            depth: Depth::default(),
            files: BTreeMap::new(),
            codebase_path: codebase_path.into(),
            include_business_context: false,
        }
    }

    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_business_context(mut self, include: bool) -> Self {
        self.include_business_context = include;
        self
    }

    /// Check the request before any cache lookup or discovery work.
    pub fn validate(&self) -> Result<()> {
        if self.feature.trim().is_empty() {
            return Err(ReadinessError::validation("feature is required"));
        }

        match self.mode {
            AnalysisMode::Auto => {
                if self.codebase_path.as_os_str().is_empty() {
                    return Err(ReadinessError::validation(
                        "codebasePath is required for auto mode",
                    ));
                }
                if !self.codebase_path.exists() {
                    return Err(ReadinessError::validation(format!(
                        "codebasePath does not exist: {}",
                        self.codebase_path.display()
                    )));
                }
            }
            AnalysisMode::Manual => {
                if self.files.values().all(|files| files.is_empty()) {
                    return Err(ReadinessError::validation(
                        "manual mode requires at least one file",
                    ));
                }
                for (layer, files) in &self.files {
                    for file in files {
                        let full_path = self.resolve(file);
                        if !full_path.exists() {
                            return Err(ReadinessError::validation(format!(
                                "File does not exist: {} (layer: {})",
                                full_path.display(),
                                layer
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Join a manual file path onto the codebase root.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.codebase_path.join(file)
        }
    }
}
