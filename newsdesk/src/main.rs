/*
newsdesk - single-binary main.rs
This binary starts the Rocket HTTP server and runs the background worker inside the same process.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newsdesk::ingestion::NewsClient;
use newsdesk::llm::remote::RemoteLlmProvider;
use newsdesk::llm::LlmProvider;
use newsdesk::processing::Pipeline;
use newsdesk::server::{launch_rocket, AppState};
use newsdesk::storage::ArticleStore;
use newsdesk::worker::{run_worker, WorkerControl};

#[derive(Parser, Debug)]
#[command(name = "newsdesk", about = "Newsdesk single-binary server + worker")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable background worker (run server only)
    #[arg(long, conflicts_with = "worker_only")]
    no_worker: bool,

    /// Run worker only (do not bind HTTP server)
    #[arg(long)]
    worker_only: bool,

    /// Run the pipeline a single time and exit
    #[arg(long, conflicts_with_all = ["no_worker", "worker_only"])]
    once: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if let Err(e) = dotenv::dotenv() {
        info!("no .env file loaded: {}", e);
    }

    let config = Arc::new(load_config(args.config).await?);

    let store = ArticleStore::new(&config.storage.articles_dir);
    store.ensure_dir().await?;
    info!(dir = %store.dir().display(), "article directory ready");

    if args.once {
        let report = build_pipeline(&config)?.run_once().await;
        info!(written = report.written, failed = report.failed, "single run finished");
        return Ok(());
    }

    let control = WorkerControl::default();
    let period = Duration::from_secs(config.scheduler.interval_minutes * 60);

    if args.worker_only {
        info!("Starting in worker-only mode");
        let worker = run_worker(build_pipeline(&config)?, period, control.clone());
        tokio::pin!(worker);

        let interrupted = tokio::select! {
            _ = tokio::signal::ctrl_c() => true,
            _ = &mut worker => false,
        };
        if interrupted {
            info!("ctrl-c received, notifying worker to shutdown");
            control.request_shutdown();
            if tokio::time::timeout(Duration::from_secs(20), worker).await.is_err() {
                warn!("Timed out waiting for worker to exit");
            }
        }
        info!("worker-only run finished");
        return Ok(());
    }

    // Otherwise, start worker (unless disabled) and then start HTTP server.
    let mut worker_handle = None;
    if !args.no_worker {
        info!("Spawning background worker task");
        let pipeline = build_pipeline(&config)?;
        worker_handle = Some(tokio::spawn(run_worker(pipeline, period, control.clone())));
    } else {
        info!("Background worker disabled via CLI (--no-worker)");
    }

    if let Err(e) = launch_rocket(AppState::new(config.clone(), control.clone())).await {
        error!("Rocket server failed: {:#}", e);
    }

    info!("HTTP server stopped; notifying worker to shutdown");
    control.request_shutdown();

    if let Some(handle) = worker_handle {
        match tokio::time::timeout(Duration::from_secs(20), handle).await {
            Ok(Ok(())) => info!("worker exited cleanly"),
            Ok(Err(join_err)) => error!(%join_err, "worker task panicked"),
            Err(_) => info!("Timed out waiting for worker to exit; continuing shutdown"),
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Merge `config.default.toml` with `config.toml` (or the file given by `--config`).
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = match explicit {
        Some(p) if !p.exists() => {
            error!(path = ?p, "specified config file not found");
            anyhow::bail!("Config file not found: {}", p.display());
        }
        Some(p) => Some(p),
        None => Some(PathBuf::from("config.toml")).filter(|p| p.exists()),
    };

    let config = Config::load_with_defaults(
        Some(default_path.as_path()).filter(|p| p.exists()),
        override_path.as_deref(),
    )
    .await
    .context("failed to load configuration")?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

/// Resolve API keys and build the fetch/rewrite/store pipeline.
fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let news = NewsClient::new(&config.news, config.news_api_key()?)?;
    let llm = RemoteLlmProvider::from_config(&config.llm, config.llm_api_key()?);
    info!(model = llm.model(), categories = ?config.news.categories, "pipeline initialized");
    let llm: Arc<dyn LlmProvider> = Arc::new(llm);
    Ok(Pipeline::from_config(config, news, llm))
}
