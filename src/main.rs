//! Startup Revenue Tracker binary entrypoint.
//! Scheduled scraping of financial-news feeds for startup revenue/ARR/bookings
//! announcements, with email alerts for figures over the configured threshold.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use startup_revenue_tracker::analyze::amount::{default_rules, load_rules_file, AmountRule};
use startup_revenue_tracker::ingest::providers::RssProvider;
use startup_revenue_tracker::ingest::scheduler::{run_cycle, spawn_scrape_scheduler};
use startup_revenue_tracker::ingest::types::{Source, SourceProvider};
use startup_revenue_tracker::notify::{AlertBatch, NotifierMux};
use startup_revenue_tracker::{JsonFileLedger, Ledger, TrackerConfig};

#[derive(Parser, Debug)]
#[command(name = "startup-revenue-tracker")]
#[command(about = "Track startup revenue announcements in financial news.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the recurring scrape scheduler (runs until interrupted)
    Run,
    /// Run one manual scrape cycle now
    Scrape {
        /// Re-analyze articles the ledger has already seen (alerts stay suppressed)
        #[arg(long)]
        force: bool,
    },
    /// Show ledger statistics
    Status,
    /// Send a test alert email to verify SMTP configuration
    TestEmail,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("startup_revenue_tracker=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn load_rules(cfg: &TrackerConfig) -> Result<Vec<AmountRule>> {
    match &cfg.amount_rules_path {
        Some(path) => load_rules_file(path)
            .with_context(|| format!("loading amount rules from {}", path.display())),
        None => Ok(default_rules()),
    }
}

fn build_providers(cfg: &TrackerConfig) -> Vec<Box<dyn SourceProvider>> {
    cfg.sources
        .iter()
        .map(|s| {
            Box::new(RssProvider::new(Source::from_name(&s.name), s.feed_url.clone()))
                as Box<dyn SourceProvider>
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = TrackerConfig::load_default()?;

    match cli.command {
        Commands::Run => {
            cfg.validate()?;
            let rules = load_rules(&cfg)?;
            let providers = build_providers(&cfg);
            let ledger: Arc<dyn Ledger> = Arc::new(JsonFileLedger::open_default()?);
            let mux = NotifierMux::from_env();
            if mux.is_empty() {
                info!("no alert sinks configured; alerts will only be logged");
            }
            info!(
                interval_secs = cfg.scrape_interval_secs,
                threshold_millions = cfg.threshold_millions,
                sources = cfg.sources.len(),
                "starting scrape scheduler"
            );
            spawn_scrape_scheduler(cfg, rules, providers, ledger, mux)
                .await
                .context("scheduler task panicked")?;
        }
        Commands::Scrape { force } => {
            let rules = load_rules(&cfg)?;
            let providers = build_providers(&cfg);
            let ledger = JsonFileLedger::open_default()?;
            let mux = NotifierMux::from_env();
            let report = run_cycle(&cfg, &rules, &providers, &ledger, &mux, force).await?;
            println!(
                "analyzed {} article(s), skipped {}, {} alert(s), {} suppressed, {} ledger failure(s)",
                report.analyzed,
                report.skipped_seen,
                report.mentions.len(),
                report.suppressed,
                report.ledger_failures
            );
            for m in &report.mentions {
                println!(
                    "  {}: ${:.1}M {} (confidence {:.2})",
                    m.company, m.amount_millions, m.kind, m.confidence
                );
            }
        }
        Commands::Status => {
            let ledger = JsonFileLedger::open_default()?;
            let stats = ledger.stats()?;
            println!("ledger:            {}", ledger.path().display());
            println!("articles seen:     {}", stats.seen_articles);
            println!("mentions alerted:  {}", stats.alerted_mentions);
            println!("threshold:         ${:.0}M", cfg.threshold_millions);
            println!(
                "sources:           {}",
                cfg.sources
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Commands::TestEmail => {
            use startup_revenue_tracker::analyze::amount::AmountKind;
            use startup_revenue_tracker::analyze::normalize::Span;
            use startup_revenue_tracker::{Article, ArticleId, RevenueMention};

            let mux = NotifierMux::from_env();
            anyhow::ensure!(!mux.is_empty(), "no alert sinks configured (set SMTP_* env vars)");

            let article = Article {
                id: ArticleId::from_url("https://example.com/test-article"),
                source: Source::Other,
                title: "Test Article: Company Reaches $50M ARR".into(),
                body: String::new(),
                published_at: None,
                fetched_at: chrono::Utc::now(),
            };
            let mention = RevenueMention {
                article_id: article.id.clone(),
                company: "Test Company".into(),
                amount_millions: 50.0,
                kind: AmountKind::Arr,
                confidence: 1.0,
                dedup_key: "test company|arr|50".into(),
                span: Span::new(0, 0),
            };
            let mentions = vec![mention];
            let articles = vec![article];
            let batch = AlertBatch::new(&mentions, &articles, cfg.threshold_millions);
            mux.notify(&batch).await;
            println!("test alert dispatched");
        }
    }

    Ok(())
}
