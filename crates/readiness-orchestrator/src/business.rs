// ABOUTME: Business-context layer: matches approved rules and user journeys against discovered code
// ABOUTME: Rules and journeys are cached per (project, codebase hash) in the context cache

use anyhow::Context;
use async_trait::async_trait;
use readiness_cache::{CacheService, ContextKey};
use readiness_core::{
    BusinessContext, BusinessFinding, CollabResult, DiscoveredFeature, KnowledgeItem,
    KnowledgeSource, LayerAnalyzer, LayerContext, LlmConfigSource, Severity,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::logic::resolve_source;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from",
];

/// Rule phrasing that forbids the following keyword.
const NEGATIVE_PATTERNS: &[&str] = &[
    "not allowed",
    "forbidden",
    "prohibited",
    "must not",
    "should not",
    "cannot",
    "must never",
];

/// Rule phrasing that requires the following keyword.
const REQUIRED_PATTERNS: &[&str] = &["must", "required", "should", "shall"];

const ACTION_VERBS: &[&str] = &[
    "click", "enter", "submit", "select", "navigate", "view", "create", "update", "delete",
];

pub struct BusinessContextAnalyzer {
    knowledge: Arc<dyn KnowledgeSource>,
    cache: Arc<CacheService>,
    configs: Arc<dyn LlmConfigSource>,
}

impl BusinessContextAnalyzer {
    pub fn new(
        knowledge: Arc<dyn KnowledgeSource>,
        cache: Arc<CacheService>,
        configs: Arc<dyn LlmConfigSource>,
    ) -> Self {
        Self {
            knowledge,
            cache,
            configs,
        }
    }

    /// Rules and journeys for this codebase snapshot, from cache when possible.
    async fn business_context(&self, ctx: &LayerContext) -> CollabResult<BusinessContext> {
        let config = match self.configs.llm_config(&ctx.project_id).await {
            Ok(config) => Some(config),
            Err(e) => {
                debug!(project_id = %ctx.project_id, "No cache configuration for business context: {:#}", e);
                None
            }
        };
        let key = ContextKey::new(&ctx.project_id, &ctx.codebase_hash);

        if let Some(config) = &config {
            if let Some(context) = self.cache.contexts.get(&key, config) {
                debug!(key = %key, "Business context served from cache");
                return Ok(context);
            }
        }

        let rules = self
            .knowledge
            .business_rules(&ctx.project_id)
            .await
            .context("failed to extract business rules")?;

        let (journeys, complete) = match self.knowledge.user_journeys(&ctx.project_id).await {
            Ok(journeys) => (journeys, true),
            Err(e) => {
                warn!(project_id = %ctx.project_id, "Failed to extract user journeys: {:#}", e);
                (Vec::new(), false)
            }
        };

        let context = BusinessContext { rules, journeys };
        if let Some(config) = &config {
            if complete && !ctx.is_cancelled() {
                self.cache.contexts.set(key, context.clone(), config);
            }
        }
        Ok(context)
    }

    async fn rule_findings(
        &self,
        ctx: &LayerContext,
        feature: &DiscoveredFeature,
        rules: &[KnowledgeItem],
    ) -> Vec<BusinessFinding> {
        let mut findings = Vec::new();

        for component in feature.components() {
            let target = format!("{} {}", component.name, component.path);
            for rule in violated_rules(ctx, &target, &component.path, rules).await {
                findings.push(rule_violation(
                    rule,
                    &component.path,
                    format!("Component {} may violate business rule: {}", component.name, rule.title),
                    Severity::High,
                ));
            }
        }

        for endpoint in feature.endpoints() {
            let target = format!("{} {}", endpoint.path, endpoint.file);
            for rule in violated_rules(ctx, &target, &endpoint.file, rules).await {
                findings.push(rule_violation(
                    rule,
                    &endpoint.file,
                    format!(
                        "Endpoint {} {} may violate business rule: {}",
                        endpoint.method, endpoint.path, rule.title
                    ),
                    Severity::High,
                ));
            }
        }

        for function in feature.functions() {
            let target = format!("{} {}", function.name, function.file);
            for rule in violated_rules(ctx, &target, &function.file, rules).await {
                findings.push(rule_violation(
                    rule,
                    &function.file,
                    format!("Function {} may violate business rule: {}", function.name, rule.title),
                    Severity::Critical,
                ));
            }
        }

        findings
    }
}

#[async_trait]
impl LayerAnalyzer<BusinessFinding> for BusinessContextAnalyzer {
    async fn analyze(
        &self,
        ctx: &LayerContext,
        feature: &DiscoveredFeature,
    ) -> CollabResult<Vec<BusinessFinding>> {
        let context = self.business_context(ctx).await?;
        let mut findings = self.rule_findings(ctx, feature, &context.rules).await;

        if ctx.is_cancelled() {
            return Ok(findings);
        }
        findings.extend(journey_findings(feature, &context.journeys));
        Ok(findings)
    }
}

fn rule_violation(
    rule: &KnowledgeItem,
    location: &str,
    issue: String,
    severity: Severity,
) -> BusinessFinding {
    BusinessFinding {
        kind: "business_rule_violation".to_string(),
        rule_id: rule.id.clone(),
        rule_title: rule.title.clone(),
        location: location.to_string(),
        issue,
        severity,
    }
}

/// Rules whose title keywords appear in `target` and whose wording the
/// source file at `file` contradicts.
async fn violated_rules<'r>(
    ctx: &LayerContext,
    target: &str,
    file: &str,
    rules: &'r [KnowledgeItem],
) -> Vec<&'r KnowledgeItem> {
    let target = target.to_lowercase();
    let matched: Vec<&KnowledgeItem> = rules
        .iter()
        .filter(|rule| {
            keywords(&rule.title.to_lowercase())
                .iter()
                .any(|k| target.contains(k.as_str()))
        })
        .collect();

    if matched.is_empty() || file.is_empty() {
        return Vec::new();
    }

    let code = match tokio::fs::read_to_string(resolve_source(&ctx.codebase_path, file)).await {
        Ok(code) => code.to_lowercase(),
        Err(e) => {
            debug!(file, "Cannot read source for rule check: {}", e);
            return Vec::new();
        }
    };

    matched
        .into_iter()
        .filter(|rule| violates_rule(&code, rule))
        .collect()
}

/// Lowercased words longer than two characters, minus stop words.
pub fn keywords(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c| ".,!?;:".contains(c)))
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// `code` must already be lowercased.
pub fn violates_rule(code: &str, rule: &KnowledgeItem) -> bool {
    let rule_text = format!("{} {}", rule.content, rule.title).to_lowercase();
    let rule_keywords = keywords(&rule_text);

    let forbids = |k: &str| {
        NEGATIVE_PATTERNS
            .iter()
            .any(|p| rule_text.contains(&format!("{} {}", p, k)))
    };
    let requires = |k: &str| {
        REQUIRED_PATTERNS
            .iter()
            .any(|p| rule_text.contains(&format!("{} {}", p, k)))
    };

    rule_keywords
        .iter()
        .any(|k| forbids(k) && code.contains(k.as_str()))
        || rule_keywords
            .iter()
            .any(|k| requires(k) && !code.contains(k.as_str()))
}

#[derive(Debug, Default, Deserialize)]
struct StructuredJourney {
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    flow: Vec<String>,
}

/// Steps of a journey written as JSON, a markdown list or plain prose.
pub fn parse_journey_steps(content: &str) -> Vec<String> {
    if let Ok(journey) = serde_json::from_str::<StructuredJourney>(content) {
        if !journey.steps.is_empty() {
            return journey.steps;
        }
        if !journey.flow.is_empty() {
            return journey.flow;
        }
    }

    let listed: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("- ") || l.starts_with("* ") || l.starts_with("1. "))
        .map(|l| {
            let l = l.strip_prefix("- ").unwrap_or(l);
            let l = l.strip_prefix("* ").unwrap_or(l);
            let l = l.strip_prefix("1. ").unwrap_or(l);
            l.trim().to_string()
        })
        .filter(|s| !s.is_empty())
        .collect();
    if !listed.is_empty() {
        return listed;
    }

    content
        .split('.')
        .map(str::trim)
        .filter(|s| {
            let lower = s.to_lowercase();
            ACTION_VERBS
                .iter()
                .any(|v| lower.starts_with(&format!("{} ", v)))
        })
        .map(str::to_string)
        .collect()
}

fn any_match<'a>(mut targets: impl Iterator<Item = String>, step_keywords: &[String]) -> bool {
    targets.any(|t| {
        let t = t.to_lowercase();
        step_keywords.iter().any(|k| t.contains(k.as_str()))
    })
}

/// Layers a journey step needs but the feature does not implement.
pub fn missing_step_layers(step: &str, feature: &DiscoveredFeature) -> Vec<&'static str> {
    let step_lower = step.to_lowercase();
    let step_keywords = keywords(&step_lower);
    let mentions = |words: &[&str]| words.iter().any(|w| step_lower.contains(w));
    let mut missing = Vec::new();

    let has_ui = any_match(
        feature
            .components()
            .iter()
            .map(|c| format!("{} {}", c.name, c.path)),
        &step_keywords,
    );
    if !has_ui && mentions(&["click", "view", "navigate", "select"]) {
        missing.push("ui");
    }

    let has_api = any_match(
        feature
            .endpoints()
            .iter()
            .map(|e| format!("{} {}", e.path, e.file)),
        &step_keywords,
    );
    if !has_api && mentions(&["submit", "send", "request", "api"]) {
        missing.push("api");
    }

    let has_logic = any_match(
        feature
            .functions()
            .iter()
            .map(|f| format!("{} {}", f.name, f.file)),
        &step_keywords,
    );
    if !has_logic && mentions(&["process", "calculate", "validate", "business"]) {
        missing.push("logic");
    }

    let has_db = any_match(
        feature
            .tables()
            .iter()
            .map(|t| format!("{} {}", t.name, t.file)),
        &step_keywords,
    );
    if !has_db && mentions(&["save", "store", "database", "persist"]) {
        missing.push("database");
    }

    missing
}

pub fn journey_findings(
    feature: &DiscoveredFeature,
    journeys: &[KnowledgeItem],
) -> Vec<BusinessFinding> {
    let mut findings = Vec::new();
    for journey in journeys {
        for step in parse_journey_steps(&journey.content) {
            let missing = missing_step_layers(&step, feature);
            if missing.is_empty() {
                continue;
            }
            findings.push(BusinessFinding {
                kind: "user_journey_mismatch".to_string(),
                rule_id: journey.id.clone(),
                rule_title: journey.title.clone(),
                location: "feature".to_string(),
                issue: format!(
                    "Journey step '{}' is missing implementation: [{}]",
                    step,
                    missing.join(" ")
                ),
                severity: Severity::High,
            });
        }
    }
    findings
}
