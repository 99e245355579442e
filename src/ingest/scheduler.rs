// src/ingest/scheduler.rs
//! One scrape cycle (fetch → analyze → notify → prune) plus the recurring
//! tokio loop that drives it.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::analyze::amount::AmountRule;
use crate::config::TrackerConfig;
use crate::ingest::types::SourceProvider;
use crate::ingest::fetch_all;
use crate::ledger::Ledger;
use crate::notify::{AlertBatch, NotifierMux};
use crate::pipeline::{run_batch, PipelineError, RunReport};

/// Run one full cycle. Alerts are handed to the sinks only after the ledger
/// has recorded them, so a crash between the two repeats nothing.
pub async fn run_cycle(
    cfg: &TrackerConfig,
    rules: &[AmountRule],
    providers: &[Box<dyn SourceProvider>],
    ledger: &dyn Ledger,
    mux: &NotifierMux,
    force: bool,
) -> Result<RunReport, PipelineError> {
    let started = std::time::Instant::now();
    let articles = fetch_all(providers).await;

    let report = run_batch(&articles, cfg, rules, ledger, force)?;

    if !report.mentions.is_empty() {
        let batch = AlertBatch::new(&report.mentions, &articles, cfg.threshold_millions);
        mux.notify(&batch).await;
    }

    let cutoff = Utc::now() - ChronoDuration::days(cfg.retention_days);
    match ledger.prune_older_than(cutoff) {
        Ok(removed) if removed > 0 => info!(removed, "ledger retention prune"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "ledger prune failed"),
    }

    info!(
        fetched = articles.len(),
        alerts = report.mentions.len(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "scrape cycle finished"
    );
    Ok(report)
}

/// Spawn the recurring scrape loop. The first tick fires immediately.
pub fn spawn_scrape_scheduler(
    cfg: TrackerConfig,
    rules: Vec<AmountRule>,
    providers: Vec<Box<dyn SourceProvider>>,
    ledger: Arc<dyn Ledger>,
    mux: NotifierMux,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(cfg.scrape_interval_secs.max(1)));
        loop {
            ticker.tick().await;
            match run_cycle(&cfg, &rules, &providers, ledger.as_ref(), &mux, false).await {
                Ok(report) => {
                    info!(
                        target: "scheduler",
                        alerts = report.mentions.len(),
                        skipped = report.skipped_seen,
                        "scheduled scrape tick"
                    );
                }
                Err(e) => {
                    // Config errors do not fix themselves; log loudly and keep
                    // ticking so an operator can hot-fix the config file.
                    warn!(target: "scheduler", error = %e, "scheduled scrape failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::amount::default_rules;
    use crate::ingest::providers::RssProvider;
    use crate::ingest::types::Source;
    use crate::ledger::MemoryLedger;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <title>TechCorp hits $75M ARR</title>
    <link>https://example.com/techcorp-arr</link>
    <description>TechCorp reported $75M in ARR this quarter.</description>
  </item>
</channel></rss>"#;

    #[tokio::test]
    async fn cycle_is_idempotent_across_runs() {
        let cfg = TrackerConfig::default();
        let rules = default_rules();
        let ledger = MemoryLedger::new();
        let mux = NotifierMux::default();
        let providers: Vec<Box<dyn SourceProvider>> =
            vec![Box::new(RssProvider::from_fixture(Source::TechCrunch, FEED))];

        let first = run_cycle(&cfg, &rules, &providers, &ledger, &mux, false)
            .await
            .unwrap();
        assert_eq!(first.mentions.len(), 1);

        let second = run_cycle(&cfg, &rules, &providers, &ledger, &mux, false)
            .await
            .unwrap();
        assert!(second.mentions.is_empty());
        assert_eq!(second.skipped_seen, 1);
    }
}
