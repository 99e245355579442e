// tests/e2e_cycle.rs
// Full cycle over a fixture feed: fetch → analyze → notify → prune, with a
// recording sink standing in for SMTP.

use std::sync::{Arc, Mutex};

use startup_revenue_tracker::analyze::amount::default_rules;
use startup_revenue_tracker::ingest::providers::RssProvider;
use startup_revenue_tracker::ingest::scheduler::run_cycle;
use startup_revenue_tracker::notify::{AlertBatch, AlertSink, NotifierMux};
use startup_revenue_tracker::{MemoryLedger, Source, SourceProvider, TrackerConfig};

const FEED: &str = include_str!("fixtures/techcrunch_rss.xml");

#[derive(Default)]
struct RecordingSink {
    subjects: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, batch: &AlertBatch<'_>) -> anyhow::Result<()> {
        self.subjects.lock().unwrap().push(batch.subject());
        self.bodies.lock().unwrap().push(batch.render_html());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

fn providers() -> Vec<Box<dyn SourceProvider>> {
    vec![Box::new(RssProvider::from_fixture(Source::TechCrunch, FEED))]
}

#[tokio::test]
async fn fixture_feed_alerts_once_and_only_once() {
    let cfg = TrackerConfig::default();
    let rules = default_rules();
    let ledger = MemoryLedger::new();

    let sink = RecordingSink::default();
    let subjects = Arc::clone(&sink.subjects);
    let bodies = Arc::clone(&sink.bodies);
    let mux = NotifierMux::default().with_sink(Box::new(sink));

    let first = run_cycle(&cfg, &rules, &providers(), &ledger, &mux, false)
        .await
        .unwrap();
    // The fixture carries TechCorp ($75M ARR) and CloudCo ($30M bookings);
    // the funding-round item has no revenue context.
    assert_eq!(first.mentions.len(), 2);
    assert_eq!(first.mentions[0].company, "TechCorp");
    assert_eq!(first.mentions[1].company, "CloudCo");

    {
        let subjects = subjects.lock().unwrap();
        assert_eq!(subjects.len(), 1);
        assert!(subjects[0].contains("2 startup revenue alerts"));
        let bodies = bodies.lock().unwrap();
        assert!(bodies[0].contains("TechCorp"));
        assert!(bodies[0].contains("https://techcrunch.com/2026/08/03/techcorp-arr"));
    }

    // Second cycle on the same feed: everything is seen, nothing is sent.
    let second = run_cycle(&cfg, &rules, &providers(), &ledger, &mux, false)
        .await
        .unwrap();
    assert!(second.mentions.is_empty());
    assert_eq!(second.skipped_seen, 3);
    assert_eq!(subjects.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn ordering_contract_puts_largest_amount_first() {
    let cfg = TrackerConfig::default();
    let rules = default_rules();
    let ledger = MemoryLedger::new();
    let mux = NotifierMux::default();

    let report = run_cycle(&cfg, &rules, &providers(), &ledger, &mux, false)
        .await
        .unwrap();
    let amounts: Vec<f64> = report.mentions.iter().map(|m| m.amount_millions).collect();
    let mut sorted = amounts.clone();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
    assert_eq!(amounts, sorted);
}
