use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use nd_core::logging::init_logging;
use nd_core::{DocumentStore, SourceName};
use nd_inference::{create_summarizer, Enricher};
use nd_scheduler::{
    CleanupJob, Job, JsonFileStatusStore, MemoryStatusStore, Scheduler, ScrapeJob, StatusStore,
};
use nd_scrapers::{PoliteClient, ScraperManager, ScraperRegistry};
use nd_storage::{ArticleUpserter, StorageConfig};
use tokio::sync::watch;
use tracing::info;

mod config;
mod duration;

use config::AppConfig;
use duration::HumanDuration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StorageKind {
    Memory,
    Sqlite,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "News article acquisition and storage pipeline", long_about = None)]
struct Cli {
    /// JSON configuration file; defaults apply when it doesn't exist
    #[arg(long, env = "ND_CONFIG", default_value = "config.json")]
    config: PathBuf,
    /// Storage backend, overriding the config file
    #[arg(long, value_enum)]
    storage: Option<StorageKind>,
    /// SQLite database file
    #[arg(long, env = "ND_DB_PATH", default_value = "articles.db")]
    db_path: PathBuf,
    /// Fetch interval (e.g. 45m, 1h, 1h15m30s)
    #[arg(long)]
    interval: Option<HumanDuration>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,
    #[arg(long, env = "ND_LOG_LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape on a schedule and clean up old articles until interrupted
    Run,
    /// Scrape once and store the results
    Scrape {
        /// Only this source (e.g. reuters, "AP News")
        #[arg(long)]
        source: Option<String>,
        /// Scrape a single article URL instead of the listing pages
        #[arg(long, conflicts_with = "source")]
        url: Option<String>,
        /// Print the records as JSON without storing them
        #[arg(long)]
        dry_run: bool,
    },
    /// List the configured sources
    Sources,
    /// Delete unsaved articles older than the retention window once
    Cleanup,
    /// Show the saved scheduler status
    Status,
}

struct Pipeline {
    store: Arc<dyn DocumentStore>,
    manager: Arc<ScraperManager>,
    upserter: ArticleUpserter,
    enricher: Arc<Enricher>,
}

impl Pipeline {
    async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let store = config.storage.open().await.context("Failed to open storage")?;
        info!(backend = store.name(), articles = store.count().await?, "💾 Storage ready");

        let client = Arc::new(PoliteClient::new(&config.scrape)?);
        let manager = Arc::new(ScraperManager::new(ScraperRegistry::with_defaults(client)));

        let summarizer = create_summarizer(config.gemini_api_key.clone())?;
        info!(summarizer = summarizer.name(), "🧠 Summarizer ready");
        let enricher = Arc::new(Enricher::new(store.clone(), summarizer));

        Ok(Self {
            upserter: ArticleUpserter::new(store.clone()),
            store,
            manager,
            enricher,
        })
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(&cli.config)?;

    match cli.storage {
        Some(StorageKind::Memory) => config.storage = StorageConfig::Memory,
        Some(StorageKind::Sqlite) => {
            config.storage = StorageConfig::Sqlite {
                path: cli.db_path.clone(),
            }
        }
        None => {}
    }
    if let Some(interval) = cli.interval {
        config.fetch.interval_secs = interval.0.as_secs();
    }
    if cli.gemini_api_key.is_some() {
        config.gemini_api_key = cli.gemini_api_key.clone();
    }
    Ok(config)
}

async fn run_daemon(config: &AppConfig, pipeline: Pipeline) -> anyhow::Result<()> {
    let scrape_job: Arc<dyn Job> = Arc::new(
        ScrapeJob::new(pipeline.manager.clone(), pipeline.upserter.clone()).with_enricher(pipeline.enricher.clone()),
    );
    let cleanup_job: Arc<dyn Job> = Arc::new(CleanupJob::new(pipeline.store.clone(), config.retention_days));

    let fetch = Scheduler::new(
        scrape_job,
        config.fetch.clone(),
        Arc::new(JsonFileStatusStore::new(&config.status_path)),
    );
    let cleanup = Scheduler::new(cleanup_job, config.cleanup.clone(), Arc::new(MemoryStatusStore::new()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, shutting down...");
            let _ = shutdown_tx.send(true);
        }
    });

    info!(
        fetch_every = %HumanDuration(config.fetch.interval()),
        cleanup_every = %HumanDuration(config.cleanup.interval()),
        "🦗 Scheduler started"
    );
    tokio::join!(fetch.run(shutdown_rx.clone()), cleanup.run(shutdown_rx));
    Ok(())
}

async fn scrape(
    pipeline: Pipeline,
    source: Option<String>,
    url: Option<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let records = match url {
        Some(url) => vec![pipeline.manager.scrape_url(&url).await?],
        None => {
            let sources = pipeline.manager.sources_matching(source.as_deref())?;
            pipeline.manager.run_sources(&sources).await.into_records()
        }
    };

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let summary = pipeline.upserter.upsert(&records).await?;
    let fresh: Vec<_> = records
        .iter()
        .filter(|r| summary.inserted_urls.contains(&r.url))
        .cloned()
        .collect();
    pipeline.enricher.enrich(&fresh).await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn list_sources(manager: &ScraperManager) {
    for source in manager.sources() {
        let kind = if manager.registry().is_registered(source.name) {
            "dedicated"
        } else {
            "generic"
        };
        println!(
            "{:<14} {:<10} {:<10} {}",
            source.name.as_str(),
            source.name.cli_name(),
            kind,
            source.listing_url
        );
    }
}

async fn show_status(config: &AppConfig) -> anyhow::Result<()> {
    let status = JsonFileStatusStore::new(&config.status_path).load().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    println!("success rate: {:.1}%", status.success_rate());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Status => show_status(&config).await?,
        Commands::Sources => {
            let client = Arc::new(PoliteClient::new(&config.scrape)?);
            list_sources(&ScraperManager::new(ScraperRegistry::with_defaults(client)));
        }
        Commands::Cleanup => {
            let pipeline = Pipeline::build(&config).await?;
            let deleted = CleanupJob::new(pipeline.store, config.retention_days).run().await?;
            println!("Deleted {} articles", deleted);
        }
        Commands::Scrape { source, url, dry_run } => {
            if let Some(name) = &source {
                // fail on typos before any network work
                name.parse::<SourceName>()?;
            }
            let pipeline = Pipeline::build(&config).await?;
            scrape(pipeline, source, url, dry_run).await?;
        }
        Commands::Run => {
            let pipeline = Pipeline::build(&config).await?;
            run_daemon(&config, pipeline).await?;
        }
    }

    Ok(())
}
