// src/ledger/file.rs
//! Durable ledger backed by a JSON state file. Mutations persist before the
//! call returns, via write-to-temp + rename, so a crash mid-cycle can not
//! double-alert after restart. One process owns the state file at a time;
//! in-process concurrency is serialized by the mutex.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{Ledger, LedgerError, LedgerStats};
use crate::ingest::types::ArticleId;

pub const DEFAULT_STATE_PATH: &str = "state/ledger.json";
pub const ENV_STATE_PATH: &str = "TRACKER_STATE_PATH";

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerState {
    #[serde(default)]
    seen: BTreeMap<String, DateTime<Utc>>,
    /// article id → dedup key → alerted-at.
    #[serde(default)]
    alerted: BTreeMap<String, BTreeMap<String, DateTime<Utc>>>,
}

#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    inner: Mutex<LedgerState>,
}

impl JsonFileLedger {
    /// Open (or create) the ledger at `path`. A missing file is an empty
    /// ledger; a corrupt file is an error, since silently starting fresh would
    /// re-alert everything.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerState::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            inner: Mutex::new(state),
        })
    }

    /// Resolve the state path from `TRACKER_STATE_PATH`, falling back to
    /// `state/ledger.json`.
    pub fn open_default() -> Result<Self, LedgerError> {
        let path = std::env::var(ENV_STATE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_PATH));
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &LedgerState) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Ledger for JsonFileLedger {
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
        if s.seen.contains_key(article_id.as_str()) {
            return Ok(());
        }
        s.seen.insert(article_id.as_str().to_string(), analyzed_at);
        self.persist(&s)
    }

    fn is_alerted(&self, article_id: &ArticleId, dedup_key: &str) -> Result<bool, LedgerError> {
        let s = self.inner.lock().expect("ledger mutex poisoned");
        Ok(s.alerted
            .get(article_id.as_str())
            .is_some_and(|keys| keys.contains_key(dedup_key)))
    }

    fn mark_alerted(
        &self,
        article_id: &ArticleId,
        dedup_key: &str,
        alerted_at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let mut s = self.inner.lock().expect("ledger mutex poisoned");
        let keys = s.alerted.entry(article_id.as_str().to_string()).or_default();
        if keys.contains_key(dedup_key) {
            return Ok(false);
        }
        keys.insert(dedup_key.to_string(), alerted_at);
        self.persist(&s)?;
        Ok(true)
    }

    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError> {
        let mut s = self.inner.lock().expect("ledger mutex poisoned");
        let before: usize =
            s.seen.len() + s.alerted.values().map(BTreeMap::len).sum::<usize>();

        s.seen.retain(|_, ts| *ts >= cutoff);
        for keys in s.alerted.values_mut() {
            keys.retain(|_, ts| *ts >= cutoff);
        }
        s.alerted.retain(|_, keys| !keys.is_empty());

        let after: usize = s.seen.len() + s.alerted.values().map(BTreeMap::len).sum::<usize>();
        let removed = before - after;
        if removed > 0 {
            self.persist(&s)?;
        }
        Ok(removed)
    }

    fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let s = self.inner.lock().expect("ledger mutex poisoned");
        Ok(LedgerStats {
            seen_articles: s.seen.len(),
            alerted_mentions: s.alerted.values().map(BTreeMap::len).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aid(n: &str) -> ArticleId {
        ArticleId::from_url(&format!("https://example.com/{n}"))
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let now = Utc::now();
        {
            let ledger = JsonFileLedger::open(&path).unwrap();
            ledger.mark_seen(&aid("a"), now).unwrap();
            assert!(ledger.mark_alerted(&aid("a"), "techcorp|arr|75", now).unwrap());
        }
        let reopened = JsonFileLedger::open(&path).unwrap();
        assert!(reopened.is_seen(&aid("a")).unwrap());
        assert!(reopened.is_alerted(&aid("a"), "techcorp|arr|75").unwrap());
        assert!(!reopened.mark_alerted(&aid("a"), "techcorp|arr|75", now).unwrap());
    }

    #[test]
    fn corrupt_state_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFileLedger::open(&path),
            Err(LedgerError::Corrupt(_))
        ));
    }

    #[test]
    fn concurrent_mark_alerted_admits_exactly_one() {
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(JsonFileLedger::open(dir.path().join("ledger.json")).unwrap());
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    ledger
                        .mark_alerted(&aid("a"), "cloudco|bookings|30", now)
                        .unwrap()
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
