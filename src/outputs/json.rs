//! JSON run reports.
//!
//! One file per run, grouped by the run's UTC start date:
//! `{json_output_dir}/{YYYY-MM-DD}/{run_id}.json`.

use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::metrics::RunMetrics;
use crate::models::ArticleRecord;

/// Everything one run produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport<'a> {
    #[serde(flatten)]
    pub metrics: &'a RunMetrics,
    pub articles: &'a [ArticleRecord],
}

pub fn report_path(json_output_dir: &str, metrics: &RunMetrics) -> PathBuf {
    PathBuf::from(json_output_dir)
        .join(metrics.started_at.format("%Y-%m-%d").to_string())
        .join(format!("{}.json", metrics.run_id))
}

/// Write a [`RunReport`] under a date directory, creating it as needed.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_run_report(
    metrics: &RunMetrics,
    articles: &[ArticleRecord],
    json_output_dir: &str,
) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(&RunReport { metrics, articles })?;
    let path = report_path(json_output_dir, metrics);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = articles.len(), "Wrote run report");
    Ok(path)
}
