//! # Regional News Ingest
//!
//! Runs one ingestion pass over the configured Kentucky news sources and
//! writes a JSON run report.
//!
//! ## Usage
//!
//! ```sh
//! regional_news_ingest -c ./sources.yaml -j ./reports
//! regional_news_ingest -c ./sources.yaml -j ./reports --tier high
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: YAML sources and thresholds, optional text model
//! 2. **Wiring**: HTTP fetcher, in-memory store and cache, optional archive
//! 3. **Run**: manual or scheduled trigger through the orchestrator
//! 4. **Output**: JSON run report with metrics and inserted articles

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;
use regional_news_ingest::api::{TextModel, build_model};
use regional_news_ingest::config::{IngestConfig, load_config};
use regional_news_ingest::fetch::{Fetcher, HttpFetcher};
use regional_news_ingest::orchestrator::Orchestrator;
use regional_news_ingest::outputs::json;
use regional_news_ingest::pipeline::{Pipeline, strategies};
use regional_news_ingest::scrapers::robots::RobotsGate;
use regional_news_ingest::store::{BlobStore, FsBlobStore, KvCache, MemoryArticleStore, MemoryCache, NullBlobStore};
use regional_news_ingest::utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
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

    let start_time = std::time::Instant::now();
    info!("regional_news_ingest starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.tier, json_output_dir = %args.json_output_dir, "Parsed CLI arguments");

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Load config ----
    let config = match &args.config {
        Some(path) => load_config(path).await?,
        None => {
            warn!("No configuration file given; using defaults");
            IngestConfig::default()
        }
    };
    if config.sources.is_empty() {
        warn!("No sources configured; nothing to ingest");
    }

    // ---- Collaborators ----
    let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());
    let store = Arc::new(MemoryArticleStore::new());
    let blobs: Arc<dyn BlobStore> = match &config.ingest.archive_dir {
        Some(dir) => {
            info!(%dir, "Archiving inserted payloads");
            Arc::new(FsBlobStore::new(dir))
        }
        None => Arc::new(NullBlobStore),
    };
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.http, Some(cache.clone()))?);

    let model: Option<Arc<dyn TextModel>> = match (&config.model, args.heuristic_only) {
        (Some(model_config), false) => {
            let api_key = args
                .llm_api_key
                .clone()
                .or_else(|| std::env::var(&model_config.api_key_env).ok());
            match build_model(model_config, api_key) {
                Ok(model) => {
                    info!(model = %model_config.model, base_url = %model_config.base_url, "Text model enabled");
                    let model: Arc<dyn TextModel> = Arc::new(model);
                    Some(model)
                }
                Err(e) => {
                    warn!(error = %e, "Text model unavailable; running heuristics only");
                    None
                }
            }
        }
        _ => {
            info!("Running heuristics only");
            None
        }
    };

    let (classifier, summarizer) = strategies(&config, model, cache.clone());
    let pipeline = Pipeline::new(
        fetcher.clone(),
        store.clone(),
        cache.clone(),
        blobs,
        classifier,
        summarizer,
        &config,
    );
    let robots = RobotsGate::new(
        fetcher.clone(),
        cache.clone(),
        config.http.trusted_hosts.clone(),
        &config.http.user_agent,
    );
    let orchestrator = Orchestrator::new(
        pipeline,
        fetcher,
        robots,
        cache,
        config.ingest.clone(),
        config.sources.clone(),
    );

    // ---- Run ----
    let trigger = args.trigger();
    let metrics = match orchestrator.run(&trigger).await {
        Ok(metrics) => metrics,
        Err(e) => {
            error!(error = %e, trigger = %trigger.label(), "Run aborted");
            return Err(e.into());
        }
    };

    // ---- Output ----
    let articles = store.records()?;
    match json::write_run_report(&metrics, &articles, &args.json_output_dir).await {
        Ok(path) => info!(path = %path.display(), "Run report written"),
        Err(e) => error!(error = %e, "Failed to write run report"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        inserted = metrics.counters.inserted,
        duplicate = metrics.counters.duplicate,
        rejected = metrics.counters.rejected,
        "Execution complete"
    );

    Ok(())
}
