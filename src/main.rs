//! # tianqi_crawl
//!
//! A polite, restart-safe crawler for the weather tables on tianqi.com.
//!
//! ## Features
//!
//! - Walks every catalog location × every month of a year range and appends
//!   the daily history rows to a CSV file as soon as each page is parsed
//! - Records a current-conditions snapshot per location
//! - Bootstraps the location catalog from the site's city index
//! - Prunes locations the site blocks (HTTP 403) and rewrites the catalog
//!   file immediately, so a restart never revisits them
//! - Waits a random 0.5–1.0 s between requests, one request at a time
//! - Fetches with plain HTTP or through a Browserless headless browser that
//!   can click the "show more" control on history pages
//!
//! ## Usage
//!
//! ```sh
//! tianqi_crawl cities
//! tianqi_crawl history --year-min 2011 --year-max 2024
//! tianqi_crawl current
//! ```
//!
//! ## Architecture
//!
//! 1. **Catalog**: load `(name, endpoint id)` rows
//! 2. **Plan**: expand each location into target URLs
//! 3. **Fetch**: render each target, best-effort expand
//! 4. **Classify**: success / empty / transient / permanent
//! 5. **Persist**: append rows; rewrite the catalog on pruning

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod catalog;
mod cli;
mod config;
mod csv;
mod extract;
mod fetch;
mod models;
mod orchestrator;
mod outcome;
mod pacing;
mod periods;
mod store;
mod utils;

use catalog::LocationCatalog;
use cli::{Cli, Command};
use config::{CrawlConfig, load_config};
use extract::{CityIndexExtractor, CurrentWeatherExtractor, HistoryExtractor};
use fetch::{
    BrowserlessRenderer, HistoryPlan, HttpRenderer, SnapshotPlan, TargetFetcher, Transport,
};
use models::Location;
use orchestrator::{CrawlOrchestrator, CrawlSummary};
use outcome::{Outcome, classify};
use pacing::RandomPacer;
use store::{CsvStore, PersistenceSink, load_catalog};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("tianqi_crawl starting up");

    let args = Cli::parse();
    debug!(?args.command, ?args.config, "Parsed CLI arguments");

    let mut config = match args.config {
        Some(ref path) => load_config(path)?,
        None => CrawlConfig::default(),
    };
    args.apply_to(&mut config);
    config.validate()?;

    let transport = build_transport(&config)?;
    info!(?transport, "Transport ready");

    match args.command {
        Command::History { .. } => {
            run_history(&config, transport).await?;
        }
        Command::Current => {
            run_current(&config, transport).await?;
        }
        Command::Cities => {
            run_cities(&config, transport).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Pick the Browserless transport when configured, plain HTTP otherwise.
fn build_transport(config: &CrawlConfig) -> Result<Transport, fetch::FetchError> {
    match config.browserless_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Ok(Transport::Browserless(BrowserlessRenderer::new(
            url,
            config.browserless_token.as_deref(),
            config.request_timeout(),
            config.expand_settle(),
        )?)),
        None => Ok(Transport::Http(HttpRenderer::new(
            &config.user_agent,
            config.request_timeout(),
        )?)),
    }
}

async fn prepare_output(config: &CrawlConfig) -> Result<LocationCatalog, Box<dyn Error>> {
    let catalog = load_catalog(&config.catalog_path).await?;
    if catalog.is_empty() {
        warn!(path = %config.catalog_path.display(), "Catalog is empty; nothing to crawl (run `cities` first?)");
    }
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    Ok(catalog)
}

#[instrument(level = "info", skip_all)]
async fn run_history(config: &CrawlConfig, transport: Transport) -> Result<CrawlSummary, Box<dyn Error>> {
    let mut catalog = prepare_output(config).await?;
    let plan = HistoryPlan::new(
        &config.history_base_url,
        config.period_range()?,
        config.expand_selector.clone(),
    )?;
    let store = CsvStore::new(config.history_path(), &config.catalog_path);
    let (min, max) = config.pacing_bounds();
    info!(range = %plan.range(), months = plan.range().len(), output = %store.records_path().display(), "Starting history crawl");

    let mut orchestrator = CrawlOrchestrator::new(transport, HistoryExtractor, store, RandomPacer::new(min, max));
    let summary = orchestrator.run(&mut catalog, &plan).await?;
    Ok(summary)
}

#[instrument(level = "info", skip_all)]
async fn run_current(config: &CrawlConfig, transport: Transport) -> Result<CrawlSummary, Box<dyn Error>> {
    let mut catalog = prepare_output(config).await?;
    let plan = SnapshotPlan::new(&config.current_base_url)?;
    let store = CsvStore::new(config.current_path(), &config.catalog_path);
    let (min, max) = config.pacing_bounds();
    info!(output = %store.records_path().display(), "Starting current-conditions crawl");

    let mut orchestrator =
        CrawlOrchestrator::new(transport, CurrentWeatherExtractor, store, RandomPacer::new(min, max));
    let summary = orchestrator.run(&mut catalog, &plan).await?;
    Ok(summary)
}

/// One-shot catalog bootstrap from the city index page.
#[instrument(level = "info", skip_all, fields(url = %config.catalog_index_url))]
async fn run_cities(config: &CrawlConfig, transport: Transport) -> Result<(), Box<dyn Error>> {
    let index_url = Url::parse(&config.catalog_index_url)?;
    let fetcher = TargetFetcher::new(transport);
    let extractor = CityIndexExtractor::new(index_url.clone());
    let index = Location::new("index", "");

    let fetched = fetcher.fetch(index_url.as_str(), None).await;
    let cities = match classify(fetched, &extractor, &index) {
        Outcome::Success { records, dropped } => {
            info!(found = records.len(), dropped, "Extracted city index");
            records
        }
        Outcome::Empty(reason) => {
            error!(%reason, "City index has no usable entries");
            return Err(format!("city index {} has no usable entries: {}", index_url, reason).into());
        }
        Outcome::Transient(failure) => return Err(failure.to_string().into()),
        Outcome::Permanent(e) => return Err(e.into()),
    };

    let catalog = LocationCatalog::new(cities);
    let missing = catalog.locations().iter().filter(|l| !l.has_endpoint()).count();
    let store = CsvStore::new(config.history_path(), &config.catalog_path);
    store.overwrite_catalog(catalog.locations()).await?;
    info!(
        locations = catalog.len(),
        without_endpoint = missing,
        path = %store.catalog_path().display(),
        "Catalog written"
    );
    Ok(())
}
