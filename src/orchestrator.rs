//! Runs the pipeline over a trigger's sources.
//!
//! Sources are processed in fixed-size batches; sources within a batch run
//! concurrently and each one's items run in order. A failing source only
//! counts as a source error. An unavailable article store aborts the run.

use futures::future::join_all;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::config::RunConfig;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::metrics::{RunMetrics, SourceTally, persist_metrics};
use crate::models::Source;
use crate::pipeline::Pipeline;
use crate::scrapers::discover_items;
use crate::scrapers::robots::RobotsGate;
use crate::store::KvCache;
use crate::triggers::Trigger;

const ROTATION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Split sources into batches of at most `batch_size`, keeping source order
/// except that every batch starts with a regular source while any remain.
/// Low-value kinds can therefore never fill a batch on their own ahead of
/// regular sources.
pub fn plan_batches(sources: Vec<Source>, batch_size: usize) -> Vec<Vec<Source>> {
    let batch_size = batch_size.max(1);
    let (mut low, mut regular): (VecDeque<(usize, Source)>, VecDeque<(usize, Source)>) = sources
        .into_iter()
        .enumerate()
        .partition(|(_, s)| s.kind.is_low_value());

    let mut batches = Vec::new();
    while !low.is_empty() || !regular.is_empty() {
        let mut batch = Vec::with_capacity(batch_size);
        if let Some((_, s)) = regular.pop_front() {
            batch.push(s);
        }
        while batch.len() < batch_size {
            let next = match (regular.front(), low.front()) {
                (Some((r, _)), Some((l, _))) if r < l => regular.pop_front(),
                (_, Some(_)) => low.pop_front(),
                (Some(_), None) => regular.pop_front(),
                (None, None) => break,
            };
            if let Some((_, s)) = next {
                batch.push(s);
            }
        }
        batches.push(batch);
    }
    batches
}

/// A window of `window` sources starting at `offset`, wrapping around, and
/// the offset for the next invocation.
pub fn rotate(eligible: Vec<Source>, window: usize, offset: usize) -> (Vec<Source>, usize) {
    let len = eligible.len();
    if len <= window {
        return (eligible, 0);
    }
    let start = offset % len;
    let chosen = eligible.iter().cycle().skip(start).take(window).cloned().collect();
    (chosen, (start + window) % len)
}

pub struct Orchestrator {
    pipeline: Pipeline,
    fetcher: Arc<dyn Fetcher>,
    robots: RobotsGate,
    cache: Arc<dyn KvCache>,
    config: RunConfig,
    sources: Vec<Source>,
}

impl Orchestrator {
    pub fn new(
        pipeline: Pipeline,
        fetcher: Arc<dyn Fetcher>,
        robots: RobotsGate,
        cache: Arc<dyn KvCache>,
        config: RunConfig,
        sources: Vec<Source>,
    ) -> Self {
        Self {
            pipeline,
            fetcher,
            robots,
            cache,
            config,
            sources,
        }
    }

    /// Manual runs take every eligible source. Scheduled runs take the next
    /// rotation window of their tier and persist the new offset.
    pub async fn select_sources(&self, trigger: &Trigger) -> Vec<Source> {
        let eligible: Vec<Source> = trigger.eligible(&self.sources).into_iter().cloned().collect();
        let Trigger::Scheduled(scheduled) = trigger else {
            return eligible;
        };

        let key = format!("rotation:{}", scheduled.tier);
        let offset = match self.cache.get(&key).await {
            Ok(value) => value.and_then(|v| v.parse().ok()).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, %key, "Rotation offset unavailable; starting from 0");
                0
            }
        };
        let (chosen, next) = rotate(eligible, self.config.rotation_window, offset);
        if let Err(e) = self.cache.set(&key, &next.to_string(), ROTATION_TTL).await {
            warn!(error = %e, %key, "Failed to persist rotation offset");
        }
        debug!(offset, next, chosen = chosen.len(), "Rotation window selected");
        chosen
    }

    #[instrument(level = "info", skip_all, fields(source = %source.label()))]
    async fn run_source(&self, source: &Source, limit: usize) -> Result<SourceTally> {
        let mut tally = SourceTally::new(source.label(), self.config.reason_sample_size);
        let items = match discover_items(self.fetcher.as_ref(), &self.robots, source).await {
            Ok(items) => items,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Source failed");
                tally.record_source_error(&e);
                return Ok(tally);
            }
        };

        for item in items.iter().take(limit) {
            match self.pipeline.ingest_item(item).await {
                Ok(outcome) => tally.record_outcome(&item.link, &outcome),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(url = %item.link, error = %e, "Item rejected");
                    tally.record_item_error(&item.link, &e);
                }
            }
        }
        info!(
            discovered = items.len(),
            inserted = tally.counters.inserted,
            duplicate = tally.counters.duplicate,
            rejected = tally.counters.rejected,
            "Source done"
        );
        Ok(tally)
    }

    /// Run every selected source and return the run's metrics. Metrics are
    /// persisted even when the run aborts.
    #[instrument(level = "info", skip_all, fields(trigger = %trigger.label()))]
    pub async fn run(&self, trigger: &Trigger) -> Result<RunMetrics> {
        let sources = self.select_sources(trigger).await;
        let limit = trigger.item_limit(self.config.per_source_limit);
        let mut metrics = RunMetrics::new(&trigger.label(), self.config.reason_sample_size);
        info!(run_id = %metrics.run_id, sources = sources.len(), limit, "Starting run");

        for (index, batch) in plan_batches(sources, self.config.batch_size).into_iter().enumerate() {
            debug!(batch = index, size = batch.len(), "Running batch");
            let results = join_all(batch.iter().map(|s| self.run_source(s, limit))).await;
            for result in results {
                match result {
                    Ok(tally) => metrics.absorb(tally),
                    Err(e) => {
                        error!(error = %e, "Fatal error; aborting run");
                        metrics.finish();
                        persist_metrics(self.cache.as_ref(), &metrics, self.config.metrics_retention_days).await;
                        return Err(e);
                    }
                }
            }
        }

        metrics.finish();
        persist_metrics(self.cache.as_ref(), &metrics, self.config.metrics_retention_days).await;
        Ok(metrics)
    }
}
