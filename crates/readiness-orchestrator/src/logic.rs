// ABOUTME: Depth-aware business-logic layer: error-handling heuristics plus per-function semantic checks
// ABOUTME: Model failures fall back to the pattern check instead of failing the layer

use async_trait::async_trait;
use readiness_core::{
    CollabResult, DiscoveredFeature, Finding, FunctionInfo, LayerAnalyzer, LayerContext,
    LlmConfigSource, Severity,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::progressive::ProgressiveAnalyzer;

pub const SEMANTIC_ANALYSIS: &str = "semantic_analysis";

const RESPONSE_EXCERPT_CHARS: usize = 200;

/// Logic layer analyzer. Pattern checks always run; medium and deep depths
/// add a model-backed semantic check per function.
pub struct DepthAwareLogicAnalyzer {
    progressive: Arc<ProgressiveAnalyzer>,
    configs: Arc<dyn LlmConfigSource>,
}

impl DepthAwareLogicAnalyzer {
    pub fn new(progressive: Arc<ProgressiveAnalyzer>, configs: Arc<dyn LlmConfigSource>) -> Self {
        Self {
            progressive,
            configs,
        }
    }

    async fn semantic_findings(
        &self,
        ctx: &LayerContext,
        source: &str,
        function: &FunctionInfo,
    ) -> Vec<Finding> {
        let config = match self.configs.llm_config(&ctx.project_id).await {
            Ok(config) => config,
            Err(e) => {
                warn!(project_id = %ctx.project_id, "No model configuration, using pattern checks: {:#}", e);
                return check_semantic_issues(source, function);
            }
        };

        let function_code = extract_function_code(source, function);
        let prompt = build_semantic_prompt(&function_code, function);

        match self
            .progressive
            .analyze(ctx, &config, &function_code, &prompt, SEMANTIC_ANALYSIS)
            .await
        {
            Ok(response) => parse_semantic_response(&response, function),
            Err(e) => {
                warn!(function = %function.name, "Semantic analysis failed, using pattern checks: {}", e);
                check_semantic_issues(source, function)
            }
        }
    }
}

#[async_trait]
impl LayerAnalyzer<Finding> for DepthAwareLogicAnalyzer {
    async fn analyze(
        &self,
        ctx: &LayerContext,
        feature: &DiscoveredFeature,
    ) -> CollabResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for function in feature.functions() {
            if ctx.is_cancelled() {
                debug!(function = %function.name, "Logic analysis cancelled");
                break;
            }

            let path = resolve_source(&ctx.codebase_path, &function.file);
            let source = match tokio::fs::read_to_string(&path).await {
                Ok(source) => source,
                Err(e) => {
                    warn!(file = %path.display(), "Failed to read function file: {}", e);
                    continue;
                }
            };

            findings.extend(analyze_error_handling(&source, function));

            if ctx.depth.uses_models() {
                findings.extend(self.semantic_findings(ctx, &source, function).await);
            } else {
                findings.extend(check_semantic_issues(&source, function));
            }
        }

        Ok(findings)
    }
}

/// Join a discovered file path onto the codebase root when it is relative.
pub(crate) fn resolve_source(codebase_path: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() || codebase_path.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        codebase_path.join(path)
    }
}

pub fn analyze_error_handling(code: &str, function: &FunctionInfo) -> Vec<Finding> {
    let has_try_catch = code.contains("try") && code.contains("catch");
    let has_error_return = code.contains("error") && code.contains("return");

    if has_try_catch || has_error_return {
        return Vec::new();
    }

    vec![Finding::new(
        "missing_error_handling",
        Severity::High,
        function.location(),
        format!("Function {} may be missing error handling", function.name),
    )]
}

/// Pattern-only semantic check used at surface depth and as the model fallback.
pub fn check_semantic_issues(code: &str, function: &FunctionInfo) -> Vec<Finding> {
    if code.contains('.') && !code.contains("?.") && !code.contains("if") {
        return vec![Finding::new(
            "semantic_error",
            Severity::Medium,
            function.location(),
            format!("Function {} may have potential null reference issues", function.name),
        )];
    }
    Vec::new()
}

pub fn build_semantic_prompt(function_code: &str, function: &FunctionInfo) -> String {
    format!(
        r#"Analyze the following function for semantic correctness and business rule compliance.

Function: {name}
Location: {location}
Code:
{code}

Please analyze:
1. Does the function correctly implement the intended business logic?
2. Are there any semantic errors (null references, type mismatches, logic errors)?
3. Does the function handle edge cases appropriately?
4. Are there any potential bugs or issues?

Respond in JSON format:
{{
  "issues": [
    {{
      "type": "semantic_error|logic_error|missing_validation|edge_case",
      "severity": "critical|high|medium|low",
      "description": "Detailed description of the issue",
      "line": <line_number>
    }}
  ]
}}"#,
        name = function.name,
        location = function.location(),
        code = function_code,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceLanguage {
    Go,
    JavaScript,
    Python,
}

impl SourceLanguage {
    fn from_path(file: &str) -> Option<Self> {
        let ext = Path::new(file)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;
        match ext.as_str() {
            "go" => Some(SourceLanguage::Go),
            "js" | "jsx" | "ts" | "tsx" => Some(SourceLanguage::JavaScript),
            "py" => Some(SourceLanguage::Python),
            _ => None,
        }
    }
}

/// Source of one function, for the prompt and the response-cache key.
pub fn extract_function_code(source: &str, function: &FunctionInfo) -> String {
    SourceLanguage::from_path(&function.file)
        .and_then(|lang| extract_by_language(source, &function.name, lang))
        .unwrap_or_else(|| extract_by_line(source, function.line_number))
}

fn brace_delta(line: &str) -> i64 {
    line.matches('{').count() as i64 - line.matches('}').count() as i64
}

fn extract_by_language(source: &str, name: &str, lang: SourceLanguage) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    let mut start = None;
    let mut depth = 0i64;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        match start {
            None => {
                let is_start = match lang {
                    SourceLanguage::Go => trimmed.starts_with("func ") && trimmed.contains(name),
                    SourceLanguage::JavaScript => {
                        trimmed.contains(&format!("function {}", name))
                            || trimmed.contains(&format!("{} =", name))
                    }
                    SourceLanguage::Python => trimmed.starts_with(&format!("def {}", name)),
                };
                if !is_start {
                    continue;
                }
                if lang == SourceLanguage::Python {
                    let end = python_block_end(&lines, i);
                    return Some(lines[i..=end].join("\n"));
                }
                start = Some(i);
                depth = brace_delta(trimmed);
            }
            Some(s) => {
                depth += brace_delta(line);
                if depth <= 0 {
                    return Some(lines[s..=i].join("\n"));
                }
            }
        }
    }

    start.map(|s| lines[s..].join("\n"))
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Last non-blank line indented deeper than the `def`.
fn python_block_end(lines: &[&str], def_line: usize) -> usize {
    let def_indent = indentation(lines[def_line]);
    let mut last = def_line;
    for (i, line) in lines.iter().enumerate().skip(def_line + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indentation(line) <= def_indent {
            break;
        }
        last = i;
    }
    last
}

/// Take lines from `line_number` until braces balance again.
fn extract_by_line(source: &str, line_number: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return source.to_string();
    }
    let start = if line_number > 0 && line_number <= lines.len() {
        line_number - 1
    } else {
        0
    };

    let mut depth = 0i64;
    for (i, line) in lines.iter().enumerate().skip(start) {
        depth += brace_delta(line);
        let closes = line.matches('}').count() > line.matches('{').count();
        if i > start && (line.contains("func ") || closes) && depth == 0 {
            return lines[start..=i].join("\n");
        }
    }
    lines[start..].join("\n")
}

#[derive(Debug, Default, Deserialize)]
struct SemanticIssue {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    line: Option<serde_json::Value>,
}

impl SemanticIssue {
    fn line_label(&self) -> String {
        match &self.line {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => match n.as_f64() {
                Some(f) => format!("{:.0}", f),
                None => n.to_string(),
            },
            _ => String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SemanticResponse {
    #[serde(default)]
    issues: Vec<SemanticIssue>,
}

fn json_issues(response: &str) -> Vec<SemanticIssue> {
    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if end > start {
            if let Ok(parsed) = serde_json::from_str::<SemanticResponse>(&response[start..=end]) {
                return parsed.issues;
            }
        }
    }
    if let (Some(start), Some(end)) = (response.find('['), response.rfind(']')) {
        if end > start {
            if let Ok(issues) = serde_json::from_str::<Vec<SemanticIssue>>(&response[start..=end]) {
                return issues;
            }
        }
    }
    Vec::new()
}

/// Turn model output into logic findings.
pub fn parse_semantic_response(response: &str, function: &FunctionInfo) -> Vec<Finding> {
    if response.contains("\"issues\"") {
        return json_issues(response)
            .into_iter()
            .map(|issue| {
                Finding::new(
                    issue.kind.clone(),
                    Severity::from_label(&issue.severity),
                    format!("{}:{}", function.file, issue.line_label()),
                    issue.description.clone(),
                )
            })
            .collect();
    }

    let lower = response.to_lowercase();
    if lower.contains("error") || lower.contains("bug") || lower.contains("issue") {
        return vec![Finding::new(
            "semantic_error",
            Severity::Medium,
            function.location(),
            format!(
                "LLM analysis found potential issues in function {}: {}",
                function.name,
                truncate(response, RESPONSE_EXCERPT_CHARS)
            ),
        )];
    }

    Vec::new()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
