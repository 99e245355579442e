// src/ledger/mod.rs
//! Persistent record of which articles were analyzed and which mentions have
//! already alerted: the sole source of cross-run state for the pipeline.
//!
//! `mark_alerted` is the single authoritative gate against double-alerting:
//! it is an atomic check-and-set, checked immediately before a mention is
//! handed to the alerting collaborator. All operations are idempotent;
//! marking an already-marked entry is a no-op, not an error.

pub mod file;
pub mod memory;

pub use file::JsonFileLedger;
pub use memory::MemoryLedger;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::ingest::types::ArticleId;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger state corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerStats {
    pub seen_articles: usize,
    pub alerted_mentions: usize,
}

pub trait Ledger: Send + Sync {
    fn is_seen(&self, article_id: &ArticleId) -> Result<bool, LedgerError>;

    fn mark_seen(&self, article_id: &ArticleId, analyzed_at: DateTime<Utc>)
        -> Result<(), LedgerError>;

    fn is_alerted(&self, article_id: &ArticleId, dedup_key: &str) -> Result<bool, LedgerError>;

    /// Atomic check-and-set for the `(article_id, dedup_key)` pair.
    /// `Ok(true)` means the pair was newly recorded and the caller may alert;
    /// `Ok(false)` means it had already alerted and must stay suppressed.
    fn mark_alerted(
        &self,
        article_id: &ArticleId,
        dedup_key: &str,
        alerted_at: DateTime<Utc>,
    ) -> Result<bool, LedgerError>;

    /// Retention policy: drop entries recorded before `cutoff`. Returns the
    /// number of removed entries.
    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError>;

    fn stats(&self) -> Result<LedgerStats, LedgerError>;
}
