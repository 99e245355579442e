// src/pipeline.rs
//! One scrape cycle's worth of analysis: gate each article against the
//! ledger, run the pure extraction pipeline, and emit only mentions whose
//! `(article_id, dedup_key)` pair has never alerted before.
//!
//! Error policy (see ConfigError/LedgerError): configuration problems are
//! fatal before any article is touched; ledger failures are fatal for the
//! affected article only; it stays unmarked and is retried next cycle.

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::analyze::amount::AmountRule;
use crate::analyze::assemble::RevenueMention;
use crate::analyze::{analyze_article, anon_hash};
use crate::config::{ConfigError, TrackerConfig};
use crate::ingest::types::Article;
use crate::ledger::Ledger;

/// One-time metrics registration (so series show up on a host recorder).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "tracker_articles_analyzed_total",
            "Articles run through the extraction pipeline."
        );
        describe_counter!(
            "tracker_articles_skipped_total",
            "Articles skipped because the ledger had already seen them."
        );
        describe_counter!(
            "tracker_alerts_total",
            "Mentions emitted to the alerting collaborator."
        );
        describe_counter!(
            "tracker_suppressed_total",
            "Mentions suppressed as already-alerted."
        );
        describe_counter!("tracker_ledger_errors_total", "Ledger read/write failures.");
        describe_counter!("tracker_provider_errors_total", "Provider fetch/parse errors.");
        describe_histogram!("tracker_analyze_ms", "Per-article analysis time in milliseconds.");
        describe_gauge!("tracker_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Outcome of one batch run. `mentions` is ordered descending by amount
/// (ties by first appearance), which alerting relies on.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    pub mentions: Vec<RevenueMention>,
    pub analyzed: usize,
    pub skipped_seen: usize,
    pub suppressed: usize,
    pub ledger_failures: usize,
}

/// Process a bounded batch of articles against the ledger.
///
/// With `force` set, already-seen articles are re-analyzed (forced re-scan);
/// the ledger still suppresses re-alerting of known mentions.
pub fn run_batch(
    articles: &[Article],
    cfg: &TrackerConfig,
    rules: &[AmountRule],
    ledger: &dyn Ledger,
    force: bool,
) -> Result<RunReport, PipelineError> {
    ensure_metrics_described();

    cfg.validate()?;
    if rules.is_empty() {
        return Err(ConfigError::EmptyRuleSet.into());
    }

    let mut report = RunReport::default();

    for article in articles {
        match ledger.is_seen(&article.id) {
            Ok(true) if !force => {
                report.skipped_seen += 1;
                counter!("tracker_articles_skipped_total").increment(1);
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, article = %anon_hash(article.id.as_str()), "ledger read failed; article will be retried");
                report.ledger_failures += 1;
                counter!("tracker_ledger_errors_total").increment(1);
                continue;
            }
        }

        let t0 = std::time::Instant::now();
        let mentions = analyze_article(article, cfg, rules);
        histogram!("tracker_analyze_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let now = Utc::now();
        let mut article_ledger_ok = true;
        for mention in mentions {
            match ledger.mark_alerted(&article.id, &mention.dedup_key, now) {
                Ok(true) => report.mentions.push(mention),
                Ok(false) => {
                    report.suppressed += 1;
                    counter!("tracker_suppressed_total").increment(1);
                }
                Err(e) => {
                    warn!(error = %e, article = %anon_hash(article.id.as_str()), "ledger write failed; article will be retried");
                    report.ledger_failures += 1;
                    counter!("tracker_ledger_errors_total").increment(1);
                    article_ledger_ok = false;
                    break;
                }
            }
        }

        if article_ledger_ok {
            // Seen only after all of its mentions are recorded, so an abort
            // mid-article leaves it eligible for retry.
            if let Err(e) = ledger.mark_seen(&article.id, now) {
                warn!(error = %e, article = %anon_hash(article.id.as_str()), "mark_seen failed; article will be re-analyzed");
                report.ledger_failures += 1;
                counter!("tracker_ledger_errors_total").increment(1);
            }
            report.analyzed += 1;
            counter!("tracker_articles_analyzed_total").increment(1);
        }
    }

    // Batch-wide ordering contract; stable sort keeps per-article
    // first-appearance order among equal amounts.
    report.mentions.sort_by(|a, b| {
        b.amount_millions
            .partial_cmp(&a.amount_millions)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    counter!("tracker_alerts_total").increment(report.mentions.len() as u64);
    gauge!("tracker_last_run_ts").set(Utc::now().timestamp().max(0) as f64);

    info!(
        articles = articles.len(),
        analyzed = report.analyzed,
        skipped = report.skipped_seen,
        alerts = report.mentions.len(),
        suppressed = report.suppressed,
        ledger_failures = report.ledger_failures,
        "pipeline run complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::amount::default_rules;
    use crate::ingest::types::{ArticleId, Source};
    use crate::ledger::MemoryLedger;

    fn article(url: &str, body: &str) -> Article {
        Article {
            id: ArticleId::from_url(url),
            source: Source::TechCrunch,
            title: String::new(),
            body: body.to_string(),
            published_at: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn empty_rule_set_fails_fast() {
        let ledger = MemoryLedger::new();
        let err = run_batch(&[], &TrackerConfig::default(), &[], &ledger, false);
        assert!(matches!(
            err,
            Err(PipelineError::Config(ConfigError::EmptyRuleSet))
        ));
    }

    #[test]
    fn second_run_is_empty_on_unchanged_input() {
        let cfg = TrackerConfig::default();
        let rules = default_rules();
        let ledger = MemoryLedger::new();
        let batch = vec![article(
            "https://example.com/techcorp",
            "TechCorp reported $75M in ARR this quarter.",
        )];

        let first = run_batch(&batch, &cfg, &rules, &ledger, false).unwrap();
        assert_eq!(first.mentions.len(), 1);

        let second = run_batch(&batch, &cfg, &rules, &ledger, false).unwrap();
        assert!(second.mentions.is_empty());
        assert_eq!(second.skipped_seen, 1);
    }

    #[test]
    fn forced_rescan_reanalyzes_but_does_not_realert() {
        let cfg = TrackerConfig::default();
        let rules = default_rules();
        let ledger = MemoryLedger::new();
        let batch = vec![article(
            "https://example.com/techcorp",
            "TechCorp reported $75M in ARR this quarter.",
        )];

        run_batch(&batch, &cfg, &rules, &ledger, false).unwrap();
        let rescanned = run_batch(&batch, &cfg, &rules, &ledger, true).unwrap();
        assert_eq!(rescanned.skipped_seen, 0);
        assert!(rescanned.mentions.is_empty());
        assert_eq!(rescanned.suppressed, 1);
    }

    #[test]
    fn same_key_across_distinct_articles_alerts_twice() {
        let cfg = TrackerConfig::default();
        let rules = default_rules();
        let ledger = MemoryLedger::new();
        let body = "CloudCo posted $30M in bookings this year.";
        let batch = vec![
            article("https://example.com/one", body),
            article("https://example.com/two", body),
        ];

        let report = run_batch(&batch, &cfg, &rules, &ledger, false).unwrap();
        assert_eq!(report.mentions.len(), 2);
        assert_eq!(report.mentions[0].dedup_key, report.mentions[1].dedup_key);
        assert_ne!(report.mentions[0].article_id, report.mentions[1].article_id);
    }

    #[test]
    fn batch_output_is_sorted_descending_by_amount() {
        let cfg = TrackerConfig::default();
        let rules = default_rules();
        let ledger = MemoryLedger::new();
        let batch = vec![
            article(
                "https://example.com/small",
                "SmallCo reported $35M in revenue for the year.",
            ),
            article(
                "https://example.com/big",
                "BigCo reported $900M in revenue for the year.",
            ),
        ];

        let report = run_batch(&batch, &cfg, &rules, &ledger, false).unwrap();
        assert_eq!(report.mentions.len(), 2);
        assert_eq!(report.mentions[0].company, "BigCo");
        assert_eq!(report.mentions[1].company, "SmallCo");
    }
}
