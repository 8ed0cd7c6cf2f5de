//! prodex command-line entry point.
//!
//! Results are written to stdout as JSON. Logging goes to stderr so the
//! output stays machine-readable.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use url::Url;

use prodex_client::{ExtractorRegistry, ProductEngine, categorize_garment};
use prodex_core::{AppConfig, CacheDb, ExtractionRequest};

#[derive(Parser)]
#[command(name = "prodex", version, about = "Product data extraction from retailer pages (JSON output)")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract product data from a URL, serving from cache when fresh
    Extract(ExtractArgs),
    /// Print the strategy that would handle a URL
    Strategy { url: String },
    /// Delete cached records older than the TTL
    Purge,
}

#[derive(Args)]
struct ExtractArgs {
    /// Product page URL
    url: String,
    /// Discard any cached record and fetch again
    #[arg(long)]
    force_refresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;

    match cli.cmd {
        Command::Extract(args) => extract(&config, &args).await,
        Command::Strategy { url } => strategy(&config, &url),
        Command::Purge => purge(&config).await,
    }
}

async fn extract(config: &AppConfig, args: &ExtractArgs) -> Result<()> {
    let request = ExtractionRequest::new(&args.url, args.force_refresh)?;
    let engine = ProductEngine::from_config(config).await.context("initializing engine")?;

    let record = engine.extract(&request).await?;
    let category = categorize_garment(record.title.as_deref());
    print_json(&json!({ "record": record, "category": category }))
}

fn strategy(config: &AppConfig, raw: &str) -> Result<()> {
    let url = Url::parse(raw).with_context(|| format!("invalid url: {raw}"))?;
    let registry = ExtractorRegistry::with_defaults(&config.augment);
    print_json(&json!({ "url": url.as_str(), "strategy": registry.select_strategy(&url).to_string() }))
}

async fn purge(config: &AppConfig) -> Result<()> {
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache at {}", config.db_path.display()))?;
    let purged = db.purge_expired_products(config.cache_ttl(), Utc::now()).await?;
    tracing::info!(purged, "purged cache");
    print_json(&json!({ "purged": purged }))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
