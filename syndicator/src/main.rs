/*
syndicator - main.rs
Harvests new articles from the configured blog sites, rewords them, and publishes them
to the CMS collection. One run, strictly sequential, then exit.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::{resolve_secret, Config};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use syndicator::llm::remote::RemoteLlmProvider;
use syndicator::pipeline::Pipeline;
use syndicator::platform::webflow::WebflowClient;
use syndicator::{run_log, scraping};

#[derive(Parser, Debug)]
#[command(name = "syndicator", about = "Reword and republish blog articles to a CMS collection")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only process the site with this id
    #[arg(long, value_name = "ID")]
    site: Option<String>,

    /// Process only the first site and at most one post
    #[arg(long)]
    testing: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if let Err(e) = dotenv::dotenv() {
        info!("no .env file loaded: {}", e);
    }

    let mut config = load_config(args.config).await?;
    if let Some(site_id) = args.site.as_deref() {
        config.retain_site(site_id)?;
    }
    config.validate()?;
    for site in &config.sites {
        scraping::validate_selectors(site)?;
    }
    if args.testing {
        warn!("testing mode: only the first site and one post are processed");
        config.sites.truncate(1);
    }

    let llm_key = resolve_secret(&config.llm.api_key_env)?;
    let platform_key = resolve_secret(&config.platform.api_key_env)?;

    let mut llm = RemoteLlmProvider::new(config.llm.api_url.clone(), llm_key, config.llm.model.clone())
        .with_image_model(config.llm.image_model.clone())
        .with_defaults(config.llm.timeout_seconds, config.llm.max_tokens, config.llm.temperature);
    if let Some(images_url) = &config.llm.images_url {
        llm = llm.with_images_url(images_url.clone());
    }
    let platform = WebflowClient::from_config(&config.platform, platform_key)?;
    let http = scraping::build_client(&config.fetch)?;

    info!(sites = config.sites.len(), "starting run");
    let buffer = Pipeline::new(http, &llm, &platform)
        .with_pacing(config.pacing.clone())
        .with_image_size(config.llm.image_size.clone())
        .with_author_name(config.platform.author_name.clone())
        .with_max_posts_per_site(args.testing.then_some(1))
        .run(&config.sites)
        .await;

    match run_log::write_log_file(&buffer, Path::new(&config.run_log.dir)).await {
        Ok(Some(path)) => info!(path = %path.display(), "run log written"),
        Ok(None) => info!("no post processed, no run log written"),
        Err(e) => {
            error!(error = %e, "failed to write run log");
            return Err(e);
        }
    }

    Ok(())
}

/// Merges `config.default.toml` with the override file (`--config`, else `config.toml` if present).
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            anyhow::bail!("Config file not found: {}", p.display());
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        override_path.as_deref(),
    )
    .await
    .context("failed to load configuration")?;
    info!(default_file = ?default_path, override_file = ?override_path, "configuration loaded");
    Ok(config)
}
