// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use metrics::counter;
use std::collections::HashSet;

use crate::ingest::types::{Article, SourceProvider};

/// Fetch the latest articles from every provider. Provider failures are
/// per-provider warnings, never fatal to the batch; duplicate canonical ids
/// within the batch are collapsed (first occurrence wins).
pub async fn fetch_all(providers: &[Box<dyn SourceProvider>]) -> Vec<Article> {
    let mut out: Vec<Article> = Vec::new();
    let mut seen_ids = HashSet::new();

    for p in providers {
        match p.fetch_latest().await {
            Ok(articles) => {
                for a in articles {
                    if seen_ids.insert(a.id.clone()) {
                        out.push(a);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = ?e, provider = p.name(), "provider error");
                counter!("tracker_provider_errors_total").increment(1);
            }
        }
    }

    out
}
