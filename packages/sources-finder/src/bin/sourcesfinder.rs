//! Finds new papers pages for catalogued subjects.
//!
//! Meant to run from cron: each invocation processes one explicit name or
//! the least recently searched subject(s), prints any accepted pages and
//! exits 0 when the circuit breaker says to stay away.

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sources_finder::stores::marker_file::DEFAULT_MARKER_PATH;
use sources_finder::{
    DiscoveryPipeline, FileMarkerStore, FinderConfig, GoogleCseSearcher, HttpFetcher,
    PhilPapersSource, RateController, SqliteStore, SystemClock, UrlFilter,
};

#[derive(Parser)]
#[command(name = "sourcesfinder")]
#[command(about = "Look for new papers pages of catalogued authors")]
struct Cli {
    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Search for this name instead of the least recently searched subject
    #[arg(short, long)]
    name: Option<String>,

    /// Run discovery without writing to the catalogue
    #[arg(short, long)]
    dry_run: bool,
}

/// Runtime settings loaded from environment variables.
struct Config {
    database_url: String,
    google_api_key: SecretString,
    google_cse_id: String,
    blacklist_file: Option<PathBuf>,
    marker_file: PathBuf,
    max_jitter_secs: Option<u64>,
}

impl Config {
    fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let max_jitter_secs = match env::var("SOURCES_MAX_JITTER_SECS") {
            Ok(value) => Some(
                value
                    .parse()
                    .context("SOURCES_MAX_JITTER_SECS must be a number of seconds")?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            google_api_key: SecretString::from(
                env::var("GOOGLE_API_KEY").context("GOOGLE_API_KEY must be set")?,
            ),
            google_cse_id: env::var("GOOGLE_CSE_ID").context("GOOGLE_CSE_ID must be set")?,
            blacklist_file: env::var("SOURCES_BLACKLIST_FILE").ok().map(PathBuf::from),
            marker_file: env::var("SOURCES_MARKER_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MARKER_PATH)),
            max_jitter_secs,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "info,sources_finder=debug"
    } else {
        "info,sources_finder=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let config = Config::from_env()?;

    let mut finder_config = FinderConfig::default();
    if let Some(secs) = config.max_jitter_secs {
        finder_config = finder_config.with_max_search_jitter_secs(secs);
    }

    let mut filter = UrlFilter::new().with_max_len(finder_config.max_url_len);
    if let Some(path) = &config.blacklist_file {
        filter = filter
            .with_blacklist_file(path)
            .with_context(|| format!("loading blacklist {}", path.display()))?;
    }

    let store = Arc::new(
        SqliteStore::new(&config.database_url)
            .await
            .context("Failed to open catalogue database")?,
    );
    let rate = RateController::from_config(
        Arc::new(FileMarkerStore::new(&config.marker_file)),
        Arc::new(SystemClock),
        &finder_config,
    );
    let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;

    let mut pipeline = DiscoveryPipeline::new(
        GoogleCseSearcher::new(config.google_api_key, config.google_cse_id),
        fetcher,
        store,
        PhilPapersSource::new(),
        rate,
        finder_config,
    )
    .with_filter(filter);

    let names = cli.name.map(|name| vec![name]);
    let outcome = pipeline
        .run(names, cli.dry_run)
        .await
        .context("Discovery run failed")?;

    if let Some(retry_after) = outcome.skipped {
        tracing::info!(
            retry_after_secs = retry_after.as_secs(),
            "search provider cool-down active, nothing to do"
        );
        return Ok(());
    }

    for report in &outcome.reports {
        for url in report.accepted_urls() {
            println!("{}\t{}", report.subject, url);
        }
    }

    Ok(())
}
