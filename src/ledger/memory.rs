// src/ledger/memory.rs
//! In-memory ledger for tests and single-shot library use. Same semantics as
//! the durable store, minus persistence.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Ledger, LedgerError, LedgerStats};
use crate::ingest::types::ArticleId;

#[derive(Debug, Default)]
struct State {
    seen: HashMap<String, DateTime<Utc>>,
    alerted: HashMap<(String, String), DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<State>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for MemoryLedger {
    fn is_seen(&self, article_id: &ArticleId) -> Result<bool, LedgerError> {
        let s = self.inner.lock().expect("ledger mutex poisoned");
        Ok(s.seen.contains_key(article_id.as_str()))
    }

    fn mark_seen(
        &self,
        article_id: &ArticleId,
        analyzed_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let mut s = self.inner.lock().expect("ledger mutex poisoned");
        s.seen
            .entry(article_id.as_str().to_string())
            .or_insert(analyzed_at);
        Ok(())
    }

    fn is_alerted(&self, article_id: &ArticleId, dedup_key: &str) -> Result<bool, LedgerError> {
        let s = self.inner.lock().expect("ledger mutex poisoned");
        Ok(s.alerted
            .contains_key(&(article_id.as_str().to_string(), dedup_key.to_string())))
    }

    fn mark_alerted(
        &self,
        article_id: &ArticleId,
        dedup_key: &str,
        alerted_at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let mut s = self.inner.lock().expect("ledger mutex poisoned");
        let key = (article_id.as_str().to_string(), dedup_key.to_string());
        if s.alerted.contains_key(&key) {
            return Ok(false);
        }
        s.alerted.insert(key, alerted_at);
        Ok(true)
    }

    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError> {
        let mut s = self.inner.lock().expect("ledger mutex poisoned");
        let before = s.seen.len() + s.alerted.len();
        s.seen.retain(|_, ts| *ts >= cutoff);
        s.alerted.retain(|_, ts| *ts >= cutoff);
        Ok(before - (s.seen.len() + s.alerted.len()))
    }

    fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let s = self.inner.lock().expect("ledger mutex poisoned");
        Ok(LedgerStats {
            seen_articles: s.seen.len(),
            alerted_mentions: s.alerted.len(),
        })
    }
}
