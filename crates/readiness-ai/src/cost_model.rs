use readiness_core::{Depth, LLMConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::pricing;

/// Bytes per token used for every estimate in a call.
pub const BYTES_PER_TOKEN: usize = 4;

pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() / BYTES_PER_TOKEN) as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    LowCost,
    HighAccuracy,
}

impl ModelTier {
    pub fn for_depth(depth: Depth) -> Self {
        match depth {
            Depth::Deep => ModelTier::HighAccuracy,
            Depth::Surface | Depth::Medium => ModelTier::LowCost,
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTier::LowCost => f.write_str("low_cost"),
            ModelTier::HighAccuracy => f.write_str("high_accuracy"),
        }
    }
}

/// Outcome of [`select_model`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub model: String,
    pub tier: ModelTier,
    /// Model the configuration asked for (tier default when unset)
    pub configured_model: String,
    pub estimated_tokens: u64,
    pub estimated_cost: f64,
    pub configured_cost: f64,
    /// The cost ceiling forced the low-cost tier
    pub downgraded_for_cost: bool,
}

impl ModelSelection {
    /// Money saved relative to the configured model, never negative.
    pub fn savings(&self) -> f64 {
        (self.configured_cost - self.estimated_cost).max(0.0)
    }

    pub fn is_cheaper(&self) -> bool {
        self.estimated_cost < self.configured_cost
    }

    pub fn is_more_expensive(&self) -> bool {
        self.estimated_cost > self.configured_cost
    }
}

/// Pick the concrete model for one call.
///
/// Pure apart from logging: the same inputs always give the same selection.
/// `Depth::Surface` callers are expected to skip model selection entirely;
/// if one gets here it is served from the low-cost tier.
pub fn select_model(
    analysis_type: &str,
    config: &LLMConfig,
    depth: Depth,
    estimated_tokens: u64,
) -> ModelSelection {
    let provider = config.provider.as_str();
    let requested_tier = ModelTier::for_depth(depth);

    let configured_model = if config.model.trim().is_empty() {
        match requested_tier {
            ModelTier::LowCost => pricing::cheap_model(provider).to_string(),
            ModelTier::HighAccuracy => pricing::capable_model(provider).to_string(),
        }
    } else {
        config.model.clone()
    };
    let configured_cost = pricing::cost(provider, &configured_model, estimated_tokens);

    let ceiling = config.cost_optimization.max_cost_per_request;
    let downgraded_for_cost = ceiling > 0.0 && configured_cost > ceiling;
    let tier = if downgraded_for_cost {
        warn!(
            analysis_type,
            model = %configured_model,
            estimated_cost = configured_cost,
            limit = ceiling,
            "Estimated cost exceeds per-request limit, forcing low-cost tier"
        );
        ModelTier::LowCost
    } else {
        requested_tier
    };

    let model = match tier {
        ModelTier::LowCost if pricing::is_high_accuracy(&configured_model) => {
            pricing::cheap_model(provider).to_string()
        }
        ModelTier::HighAccuracy if !pricing::is_high_accuracy(&configured_model) => {
            pricing::capable_model(provider).to_string()
        }
        _ => configured_model.clone(),
    };
    let estimated_cost = pricing::cost(provider, &model, estimated_tokens);

    debug!(
        analysis_type,
        depth = %depth,
        %tier,
        configured = %configured_model,
        selected = %model,
        estimated_tokens,
        estimated_cost,
        "Model selected"
    );

    ModelSelection {
        model,
        tier,
        configured_model,
        estimated_tokens,
        estimated_cost,
        configured_cost,
        downgraded_for_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, model: &str, ceiling: f64) -> LLMConfig {
        let mut config = LLMConfig::default();
        config.provider = provider.to_string();
        config.model = model.to_string();
        config.cost_optimization.max_cost_per_request = ceiling;
        config
    }

    #[test]
    fn test_estimate_tokens_uses_fixed_ratio() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("abc"), 0);
    }

    #[test]
    fn test_medium_substitutes_cheap_model() {
        let sel = select_model("semantic_analysis", &config("openai", "gpt-4", 0.0), Depth::Medium, 1000);
        assert_eq!(sel.model, "gpt-3.5-turbo");
        assert_eq!(sel.tier, ModelTier::LowCost);
        assert!(!sel.downgraded_for_cost);
        assert!(sel.is_cheaper());
        assert!((sel.savings() - (0.03 - 0.0015)).abs() < 1e-12);
    }

    #[test]
    fn test_medium_keeps_already_cheap_model() {
        let sel = select_model("semantic_analysis", &config("openai", "gpt-3.5-turbo-16k", 0.0), Depth::Medium, 1000);
        assert_eq!(sel.model, "gpt-3.5-turbo-16k");
        assert_eq!(sel.savings(), 0.0);
    }

    #[test]
    fn test_deep_upgrades_cheap_model() {
        let sel = select_model("semantic_analysis", &config("anthropic", "claude-3-haiku", 0.0), Depth::Deep, 1000);
        assert_eq!(sel.model, "claude-3-opus");
        assert_eq!(sel.tier, ModelTier::HighAccuracy);
        assert!(sel.is_more_expensive());
    }

    #[test]
    fn test_deep_keeps_capable_model() {
        let sel = select_model("semantic_analysis", &config("anthropic", "claude-3-sonnet", 0.0), Depth::Deep, 1000);
        assert_eq!(sel.model, "claude-3-sonnet");
    }

    #[test]
    fn test_cost_ceiling_forces_low_cost_tier_on_deep() {
        // 100k tokens of gpt-4 is $3.00, far over the $0.001 ceiling
        let sel = select_model("semantic_analysis", &config("openai", "gpt-4", 0.001), Depth::Deep, 100_000);
        assert!(sel.downgraded_for_cost);
        assert_eq!(sel.tier, ModelTier::LowCost);
        assert_eq!(sel.model, "gpt-3.5-turbo");
        // the cheap model still exceeds the ceiling; that is a downgrade, not an error
        assert!(sel.estimated_cost > 0.001);
    }

    #[test]
    fn test_ceiling_not_exceeded_keeps_depth_tier() {
        let sel = select_model("semantic_analysis", &config("openai", "gpt-4", 10.0), Depth::Deep, 1000);
        assert!(!sel.downgraded_for_cost);
        assert_eq!(sel.model, "gpt-4");
    }

    #[test]
    fn test_empty_model_uses_tier_default() {
        let medium = select_model("semantic_analysis", &config("anthropic", "", 0.0), Depth::Medium, 10);
        assert_eq!(medium.model, "claude-3-haiku");
        let deep = select_model("semantic_analysis", &config("azure", " ", 0.0), Depth::Deep, 10);
        assert_eq!(deep.model, "gpt-4");
    }

    #[test]
    fn test_selection_is_idempotent() {
        let cfg = config("openai", "gpt-4-turbo", 0.05);
        for depth in Depth::all() {
            for tokens in [0, 10, 5_000, 1_000_000] {
                let first = select_model("semantic_analysis", &cfg, depth, tokens);
                let second = select_model("semantic_analysis", &cfg, depth, tokens);
                assert_eq!(first, second);
            }
        }
    }
}
