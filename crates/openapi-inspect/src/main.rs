//! Print the MCP components an `OpenAPI` spec would produce, without serving anything.

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unrelated_openapi_components::{
    ApiServerConfig, ComponentHooks, ComponentRegistry, OpenApiComponentSource,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "unrelated-openapi-inspect")]
#[command(about = "Show the tools, resources and resource templates derived from an OpenAPI spec")]
struct Args {
    /// Source config file (YAML or JSON).
    #[arg(long, env = "UNRELATED_OPENAPI_CONFIG")]
    config: Option<PathBuf>,

    /// Spec location (file path or URL); overrides `spec` from the config file.
    #[arg(long, env = "UNRELATED_OPENAPI_SPEC")]
    spec: Option<String>,

    /// Base URL override.
    #[arg(long)]
    base_url: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Serialize)]
struct Row<'a> {
    kind: String,
    name: &'a str,
    method: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<&'a str>,
    description: &'a str,
    tags: Vec<&'a str>,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match args.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(args: &Args) -> anyhow::Result<ApiServerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            serde_yaml::from_str::<ApiServerConfig>(&raw)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => {
            let spec = args
                .spec
                .clone()
                .context("either --config or --spec is required")?;
            ApiServerConfig::new(spec)
        }
    };
    if let Some(spec) = &args.spec {
        config.spec.clone_from(spec);
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    Ok(config)
}

fn rows(registry: &ComponentRegistry) -> Vec<Row<'_>> {
    registry
        .iter()
        .map(|c| Row {
            kind: c.kind.to_string(),
            name: &c.name,
            method: c.route.method.as_str(),
            path: &c.route.path,
            uri: c.uri.as_deref(),
            description: &c.description,
            tags: c.tags.iter().map(String::as_str).collect(),
        })
        .collect()
}

fn print_table(rows: &[Row<'_>]) {
    let name_w = rows.iter().map(|r| r.name.len()).max().unwrap_or(4).max(4);
    println!("{:<17} {:<name_w$} {:<7} {:<30} URI", "KIND", "NAME", "METHOD", "PATH");
    for r in rows {
        println!(
            "{:<17} {:<name_w$} {:<7} {:<30} {}",
            r.kind,
            r.name,
            r.method,
            r.path,
            r.uri.unwrap_or("-")
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let config = load_config(&args)?;
    let spec = config.spec.clone();
    let source = OpenApiComponentSource::build("inspect", config, ComponentHooks::default())
        .await
        .with_context(|| format!("build components from {spec}"))?;
    let registry = source
        .registry()
        .context("component registry missing after start")?;

    let rows = rows(&registry);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_table(&rows);
    }
    tracing::info!(components = rows.len(), "inspection finished");
    Ok(())
}
