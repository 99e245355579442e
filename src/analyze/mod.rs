// src/analyze/mod.rs
//! Per-article extraction pipeline: normalize → extract amounts → resolve
//! companies → assemble mentions. Pure aside from config reads; soft
//! failures (malformed numbers, unresolved companies) shrink the output
//! instead of erroring, so a batch never aborts on one bad article.

pub mod amount;
pub mod assemble;
pub mod company;
pub mod normalize;

use tracing::debug;

use crate::analyze::amount::AmountRule;
use crate::analyze::assemble::RevenueMention;
use crate::config::TrackerConfig;
use crate::ingest::types::Article;

// Re-export convenient types.
pub use crate::analyze::amount::{AmountCandidate, AmountKind};
pub use crate::analyze::company::ResolvedCompany;
pub use crate::analyze::normalize::{NormalizedText, Span};

/// Anonymized fingerprint for log lines; raw article text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Run the full extraction pipeline on one article.
pub fn analyze_article(
    article: &Article,
    cfg: &TrackerConfig,
    rules: &[AmountRule],
) -> Vec<RevenueMention> {
    let text = normalize::normalize_with(&article.full_text(), cfg.min_content_line_chars);
    let candidates = amount::extract(&text, rules);
    let total = candidates.len();

    let mut unresolved = 0usize;
    let resolved: Vec<_> = candidates
        .into_iter()
        .map(|c| {
            let comp = company::resolve(
                &c.span,
                &text,
                cfg.context_window_tokens,
                &cfg.company_blocklist,
            );
            if comp.is_none() {
                unresolved += 1;
            }
            (c, comp)
        })
        .collect();

    let mentions = assemble::assemble(&article.id, resolved, cfg.threshold_millions);

    debug!(
        article = %anon_hash(article.id.as_str()),
        candidates = total,
        unresolved,
        mentions = mentions.len(),
        "analyzed article"
    );
    mentions
}
