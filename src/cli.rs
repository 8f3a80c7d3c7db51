//! Command-line interface definitions.
//!
//! All arguments can be provided via command-line flags or environment
//! variables.

use clap::Parser;

use regional_news_ingest::models::PriorityTier;
use regional_news_ingest::triggers::{ManualTrigger, ScheduledTrigger, Trigger};

/// Command-line arguments for one ingestion run.
///
/// Without `--tier` the run is manual and covers every configured source;
/// with `--tier` it is a scheduled run over that tier's rotation window.
///
/// # Examples
///
/// ```sh
/// # Manual run over all normal and high tier sources
/// regional_news_ingest -c ./sources.yaml -j ./reports
///
/// # Scheduled run of the high tier, heuristics only
/// regional_news_ingest -c ./sources.yaml -j ./reports --tier high --heuristic-only
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration (sources, thresholds, model)
    #[arg(short, long, env = "INGEST_CONFIG")]
    pub config: Option<String>,

    /// Output directory for the JSON run report
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Run as a scheduled invocation of this tier
    #[arg(long)]
    pub tier: Option<PriorityTier>,

    /// Include low tier sources in a manual run
    #[arg(long)]
    pub include_low_priority: bool,

    /// Cap on items ingested per source (manual runs)
    #[arg(long)]
    pub limit_per_source: Option<usize>,

    /// Skip the text model even if one is configured
    #[arg(long)]
    pub heuristic_only: bool,

    /// API key for the configured text model
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,
}

impl Cli {
    pub fn trigger(&self) -> Trigger {
        match self.tier {
            Some(tier) => Trigger::Scheduled(ScheduledTrigger { tier }),
            None => Trigger::Manual(ManualTrigger {
                include_low_priority_sources: self.include_low_priority,
                limit_per_source_items: self.limit_per_source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "regional_news_ingest",
            "--config",
            "./sources.yaml",
            "--json-output-dir",
            "./reports",
            "--include-low-priority",
            "--limit-per-source",
            "5",
        ]);

        assert_eq!(cli.config.as_deref(), Some("./sources.yaml"));
        assert_eq!(cli.json_output_dir, "./reports");
        assert_eq!(
            cli.trigger(),
            Trigger::Manual(ManualTrigger {
                include_low_priority_sources: true,
                limit_per_source_items: Some(5),
            })
        );
    }

    #[test]
    fn test_cli_short_flags_and_tier() {
        let cli = Cli::parse_from(["regional_news_ingest", "-c", "/etc/ingest.yaml", "-j", "/tmp/reports", "--tier", "high"]);

        assert_eq!(cli.json_output_dir, "/tmp/reports");
        assert_eq!(cli.trigger(), Trigger::Scheduled(ScheduledTrigger { tier: PriorityTier::High }));
    }
}
