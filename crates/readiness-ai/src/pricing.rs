// ABOUTME: Static per-provider price table and model catalogue
// ABOUTME: Costs are reproducible from (provider, model, tokens) alone

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// USD per 1K tokens, keyed by provider then model.
static PRICING: Lazy<HashMap<&'static str, Vec<(&'static str, f64)>>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        "openai",
        vec![
            ("gpt-4", 0.03),
            ("gpt-4-turbo", 0.01),
            ("gpt-3.5-turbo", 0.0015),
            ("gpt-3.5-turbo-16k", 0.003),
        ],
    );
    table.insert(
        "anthropic",
        vec![
            ("claude-3-opus", 0.015),
            ("claude-3-sonnet", 0.003),
            ("claude-3-haiku", 0.00025),
        ],
    );
    table.insert(
        "azure",
        vec![
            ("gpt-4", 0.03),
            ("gpt-4-turbo", 0.01),
            ("gpt-3.5-turbo", 0.0015),
        ],
    );
    table
});

/// Substrings that mark a model as high-cost / high-accuracy.
const HIGH_ACCURACY_MARKERS: &[&str] = &["gpt-4", "gpt-4-turbo", "claude-3-opus", "claude-3-sonnet"];

/// Price per 1K tokens.
///
/// Versioned model ids (`claude-3-opus-20240229`) resolve to the longest
/// catalogue prefix. Unknown models fall back to a per-provider default.
pub fn price_per_1k(provider: &str, model: &str) -> f64 {
    let provider = provider.to_lowercase();
    let model = model.to_lowercase();

    if let Some(models) = PRICING.get(provider.as_str()) {
        let best = models
            .iter()
            .filter(|(name, _)| model == *name || model.starts_with(&format!("{}-", name)))
            .max_by_key(|(name, _)| name.len());
        if let Some((_, price)) = best {
            return *price;
        }
    }

    match provider.as_str() {
        "openai" => 0.002,
        "anthropic" | "azure" => 0.001,
        _ => 0.0,
    }
}

/// Estimated USD cost of `tokens` on `(provider, model)`.
pub fn cost(provider: &str, model: &str, tokens: u64) -> f64 {
    tokens as f64 / 1000.0 * price_per_1k(provider, model)
}

/// The provider's designated low-cost model.
pub fn cheap_model(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "anthropic" => "claude-3-haiku",
        _ => "gpt-3.5-turbo",
    }
}

/// The provider's most capable model.
pub fn capable_model(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "anthropic" => "claude-3-opus",
        _ => "gpt-4",
    }
}

pub fn is_high_accuracy(model: &str) -> bool {
    let model = model.to_lowercase();
    HIGH_ACCURACY_MARKERS.iter().any(|m| model.contains(m))
}

/// Catalogue for one provider, cheapest first.
pub fn supported_models(provider: &str) -> Vec<(&'static str, f64)> {
    let mut models = PRICING
        .get(provider.to_lowercase().as_str())
        .cloned()
        .unwrap_or_default();
    models.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(b.0)));
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_prices() {
        assert_eq!(price_per_1k("openai", "gpt-4"), 0.03);
        assert_eq!(price_per_1k("anthropic", "claude-3-haiku"), 0.00025);
        assert_eq!(price_per_1k("azure", "gpt-3.5-turbo"), 0.0015);
    }

    #[test]
    fn test_versioned_model_uses_longest_prefix() {
        assert_eq!(price_per_1k("openai", "gpt-4-turbo-2024-04-09"), 0.01);
        assert_eq!(price_per_1k("openai", "gpt-3.5-turbo-16k"), 0.003);
        assert_eq!(price_per_1k("anthropic", "claude-3-opus-20240229"), 0.015);
    }

    #[test]
    fn test_unknown_model_fallbacks() {
        assert_eq!(price_per_1k("openai", "o9-preview"), 0.002);
        assert_eq!(price_per_1k("anthropic", "claude-9"), 0.001);
        assert_eq!(price_per_1k("mystery", "x"), 0.0);
    }

    #[test]
    fn test_cost_is_deterministic() {
        let a = cost("openai", "gpt-4", 2500);
        let b = cost("openai", "gpt-4", 2500);
        assert_eq!(a, b);
        assert!((a - 0.075).abs() < 1e-12);
    }

    #[test]
    fn test_tiers() {
        assert!(is_high_accuracy("GPT-4-Turbo"));
        assert!(is_high_accuracy("claude-3-sonnet"));
        assert!(!is_high_accuracy(cheap_model("anthropic")));
        assert!(is_high_accuracy(capable_model("azure")));
    }

    #[test]
    fn test_catalogue_sorted_by_price() {
        let models = supported_models("anthropic");
        assert_eq!(models.first().map(|m| m.0), Some("claude-3-haiku"));
        assert!(supported_models("ollama").is_empty());
    }
}
