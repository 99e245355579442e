// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod analyze;
pub mod config;
pub mod ingest;
pub mod ledger;
pub mod notify;
pub mod pipeline;

// ---- Re-exports for stable public API ----
pub use crate::analyze::amount::{AmountCandidate, AmountKind, AmountRule};
pub use crate::analyze::assemble::RevenueMention;
pub use crate::analyze::normalize::{NormalizedText, Span};
pub use crate::config::{ConfigError, TrackerConfig};
pub use crate::ingest::types::{Article, ArticleId, Source, SourceProvider};
pub use crate::ledger::{JsonFileLedger, Ledger, LedgerError, LedgerStats, MemoryLedger};
pub use crate::notify::{AlertBatch, AlertSink, NotifierMux};
pub use crate::pipeline::{run_batch, PipelineError, RunReport};
