mod manifest;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use readiness_ai::{pricing, select_model, HttpProviderClient, LlmGateway};
use readiness_cache::CacheService;
use readiness_core::{
    AnalysisRequest, CancellationToken, ConfigError, ConfigManager, Depth, LLMConfig,
    LoggingConfig,
};
use readiness_orchestrator::{AnalysisService, MemoryReportStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::manifest::Manifest;

const DEFAULT_CONFIG_FILE: &str = ".readiness.toml";

#[derive(Parser)]
#[command(name = "readiness")]
#[command(about = "Feature readiness analysis with progressive model depth", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Config file; defaults to ./.readiness.toml then ~/.readiness/config.toml
    #[arg(short, long, global = true, env = "READINESS_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging regardless of the configured level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum DepthArg {
    Surface,
    Medium,
    Deep,
}

impl From<DepthArg> for Depth {
    fn from(arg: DepthArg) -> Self {
        match arg {
            DepthArg::Surface => Depth::Surface,
            DepthArg::Medium => Depth::Medium,
            DepthArg::Deep => Depth::Deep,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// List a provider's models with their price per 1K tokens
    Models {
        /// Provider: openai, anthropic or azure
        provider: String,
    },

    /// Show which model a call of the given size would use
    SelectModel {
        #[arg(long, default_value = "openai")]
        provider: String,

        /// Configured model; omit to use the depth's default tier
        #[arg(long)]
        model: Option<String>,

        #[arg(long, value_enum, default_value = "medium")]
        depth: DepthArg,

        /// Estimated tokens for the call
        #[arg(long)]
        tokens: u64,

        /// Per-request ceiling in USD (0 = unlimited)
        #[arg(long, default_value_t = 0.0)]
        max_cost: f64,

        #[arg(long, default_value = "semantic_analysis")]
        analysis_type: String,
    },

    /// Analyze a feature described by a JSON manifest
    Analyze {
        /// Manifest with the discovered feature, business rules, journeys and flows
        #[arg(short, long)]
        manifest: PathBuf,

        /// Codebase root the manifest's file paths are relative to
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        #[arg(long, value_enum, default_value = "medium")]
        depth: DepthArg,

        /// Check business rules and user journeys
        #[arg(long)]
        business: bool,

        #[arg(long, default_value = "local", env = "READINESS_PROJECT")]
        project: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Destination; defaults to ./.readiness.toml
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration with secrets redacted
    Show {
        /// Print as TOML, ready to save as a config file
        #[arg(long)]
        toml: bool,
    },
}

#[derive(Serialize)]
struct ModelEntry {
    model: &'static str,
    price_per_1k: f64,
    high_accuracy: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(cli.config.as_deref());
    let logging = loaded
        .as_ref()
        .map(|manager| manager.config().logging.clone())
        .unwrap_or_default();
    init_tracing(&logging, cli.verbose);

    match execute_command(&cli, loaded).await {
        Ok(output) => {
            print_output(&cli.output, &output)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&Path>) -> std::result::Result<ConfigManager, ConfigError> {
    match path {
        Some(path) => ConfigManager::load_from(path),
        None => ConfigManager::load(),
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let directive = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output; logs go to stderr
    match logging.format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        "compact" => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
    }
}

async fn execute_command(
    cli: &Cli,
    loaded: std::result::Result<ConfigManager, ConfigError>,
) -> Result<serde_json::Value> {
    match &cli.command {
        Commands::Config(ConfigCommands::Init { path, force }) => {
            execute_config_init(path.as_deref(), *force)
        }
        Commands::Config(ConfigCommands::Show { toml }) => {
            let manager = loaded.context("Failed to load configuration")?;
            execute_config_show(&manager, *toml)
        }
        Commands::Models { provider } => execute_models(provider),
        Commands::SelectModel {
            provider,
            model,
            depth,
            tokens,
            max_cost,
            analysis_type,
        } => {
            let mut config = LLMConfig {
                provider: provider.to_lowercase(),
                model: model.clone().unwrap_or_default(),
                ..LLMConfig::default()
            };
            config.cost_optimization.max_cost_per_request = *max_cost;
            let selection = select_model(analysis_type, &config, (*depth).into(), *tokens);

            let mut value = serde_json::to_value(&selection)?;
            value["savings"] = serde_json::json!(selection.savings());
            Ok(value)
        }
        Commands::Analyze {
            manifest,
            path,
            depth,
            business,
            project,
        } => {
            let manager = loaded.context("Failed to load configuration")?;
            execute_analyze(&manager, manifest, path, (*depth).into(), *business, project).await
        }
    }
}

fn execute_config_init(path: Option<&Path>, force: bool) -> Result<serde_json::Value> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    ConfigManager::create_default_config(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(serde_json::json!({
        "path": path.display().to_string(),
        "status": "created",
    }))
}

fn execute_config_show(manager: &ConfigManager, as_toml: bool) -> Result<serde_json::Value> {
    let mut config = manager.config().clone();
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some("***".to_string());
    }

    if as_toml {
        let rendered =
            toml::to_string_pretty(&config).context("Failed to render configuration as TOML")?;
        print!("{}", rendered);
        return Ok(serde_json::Value::Null);
    }

    let mut value = serde_json::to_value(&config)?;
    value["config_path"] = match manager.config_path() {
        Some(path) => serde_json::json!(path.display().to_string()),
        None => serde_json::json!("(defaults)"),
    };
    Ok(value)
}

fn execute_models(provider: &str) -> Result<serde_json::Value> {
    let models: Vec<ModelEntry> = pricing::supported_models(provider)
        .into_iter()
        .map(|(model, price_per_1k)| ModelEntry {
            model,
            price_per_1k,
            high_accuracy: pricing::is_high_accuracy(model),
        })
        .collect();

    if models.is_empty() {
        bail!("Unknown provider '{}' (expected openai, anthropic or azure)", provider);
    }
    Ok(serde_json::to_value(models)?)
}

async fn execute_analyze(
    manager: &ConfigManager,
    manifest_path: &Path,
    codebase_path: &Path,
    depth: Depth,
    include_business: bool,
    project_id: &str,
) -> Result<serde_json::Value> {
    let config = manager.config().clone();
    let manifest = Manifest::load(manifest_path)?;
    let request = AnalysisRequest::auto(manifest.feature_name(), codebase_path)
        .with_depth(depth)
        .with_business_context(include_business);

    let store = Arc::new(MemoryReportStore::new());
    let collaborators = manifest.into_collaborators(store.clone(), Arc::new(config.llm.clone()));
    let gateway = LlmGateway::new(Arc::new(HttpProviderClient::new()?));
    let service = AnalysisService::new(
        &config,
        collaborators,
        gateway,
        Arc::new(CacheService::default()),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling analysis");
            on_interrupt.cancel();
        }
    });

    info!(project_id, depth = %depth, feature = %request.feature, "Starting analysis");
    let response = service
        .analyze(project_id, request, &cancel)
        .await
        .context("Analysis failed")?;

    Ok(serde_json::json!({
        "validation_id": response.validation_id,
        "hub_url": response.hub_url,
        "partial_analysis": response.partial_analysis,
        "warnings": response.warnings,
        "critical_errors": response.critical_errors,
        "summary": response.report.summary,
        "checklist": response.report.checklist,
        "model_cost_usd": store.total_cost(project_id),
        "model_selection_savings_usd": service.model_selection_savings(project_id),
    }))
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Pretty => print_pretty(value, 0),
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key = key.cyan().bold();
                match val {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        println!("{}{}:", pad, key);
                        print_pretty(val, indent + 1);
                    }
                    _ => println!("{}{}: {}", pad, key, scalar(val)),
                }
            }
        }
        serde_json::Value::Array(items) if items.is_empty() => {
            println!("{}{}", pad, "(none)".dimmed());
        }
        serde_json::Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("{}{}", pad, format!("#{}", i + 1).yellow());
                print_pretty(item, indent + 1);
            }
        }
        other => println!("{}{}", pad, scalar(other)),
    }
}

fn scalar(value: &serde_json::Value) -> colored::ColoredString {
    match value {
        serde_json::Value::String(s) => s.green(),
        serde_json::Value::Number(n) => n.to_string().yellow(),
        serde_json::Value::Bool(true) => "true".green(),
        serde_json::Value::Bool(false) => "false".red(),
        other => other.to_string().normal(),
    }
}
