/*
ainewsbot - main.rs
Generates one AI news digest and distributes it over the configured
notification channels, then exits. Scheduling is an external concern
(cron or a workflow trigger).
*/

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use common::{Config, Settings};

use ainewsbot::digest;
use ainewsbot::llm::anthropic::AnthropicProvider;
use ainewsbot::notify;

#[derive(Parser, Debug)]
#[command(name = "ainewsbot", about = "AI news digest generator and notifier")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load .env before reading any environment configuration
    dotenv::dotenv().ok();

    // Resolve config paths: an explicit --config must exist; otherwise the
    // optional config.default.toml / config.toml pair is layered.
    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            anyhow::bail!("Config file not found: {}", p.display());
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() {
            Some(&default_path)
        } else {
            None
        },
        override_path.as_deref(),
    )
    .await
    .context("failed to load configuration")?;

    // Initialize logging. The CLI flag wins over the config file's level.
    let level = args
        .log_level
        .unwrap_or_else(|| config.logging.level.clone());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter);
    if config.logging.format == "compact" {
        builder.compact().init();
    } else {
        builder.init();
    }

    // Fail fast on any missing or invalid setting, before any network call.
    let settings = Settings::from_env(config).context("failed to resolve configuration")?;

    info!("AI News Bot starting");
    info!(
        language = settings.language.code(),
        methods = ?settings.methods.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
        model = %settings.llm.model,
        "run configuration"
    );

    let provider = AnthropicProvider::new(
        settings.llm.api_url.clone(),
        settings.anthropic_api_key.clone(),
        settings.llm.model.clone(),
    )
    .with_defaults(settings.llm.timeout_seconds, settings.llm.max_tokens);

    info!("generating news digest");
    let digest = digest::generate_with_retry(&provider, &settings)
        .await
        .context("news digest generation failed")?;

    info!(chars = digest.text.chars().count(), "news digest generated");
    let preview: String = digest.text.chars().take(500).collect();
    info!("digest preview:\n{preview}");

    let notifiers = notify::build_notifiers(&settings);
    let outcomes = notify::dispatch_all(&notifiers, &digest).await;

    let sent: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.succeeded())
        .map(|o| o.channel)
        .collect();
    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.succeeded())
        .map(|o| o.channel)
        .collect();

    info!(sent = ?sent, "AI News Bot completed");

    if !failed.is_empty() {
        warn!(failed = ?failed, "some notification channels failed");
        anyhow::bail!(
            "{} of {} notification channels failed: {}",
            failed.len(),
            outcomes.len(),
            failed.join(", ")
        );
    }

    Ok(())
}
