// src/analyze/assemble.rs
//! Joins extractor and resolver outputs into `RevenueMention` records:
//! threshold filter, per-article dedup by key, contract ordering.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::analyze::amount::{AmountCandidate, AmountKind};
use crate::analyze::company::ResolvedCompany;
use crate::analyze::normalize::Span;
use crate::ingest::types::ArticleId;

/// The unit of output and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueMention {
    pub article_id: ArticleId,
    pub company: String,
    pub amount_millions: f64,
    pub kind: AmountKind,
    /// Bounded score in [0,1] from company resolution.
    pub confidence: f32,
    pub dedup_key: String,
    /// Offsets of the matched amount in the normalized article text.
    pub span: Span,
}

/// Deterministic fingerprint of company + kind + rounded amount. Two mentions
/// with the same key in one article collapse to one.
pub fn dedup_key(company: &str, kind: AmountKind, amount_millions: f64) -> String {
    format!(
        "{}|{}|{}",
        company.to_lowercase(),
        kind.as_str(),
        amount_millions.round() as i64
    )
}

/// Assemble mentions for one article.
///
/// Drops candidates without a resolved company and candidates below the
/// threshold (inclusive lower bound: exactly `threshold_millions` passes).
/// Per dedup key only the highest-confidence mention survives, earliest span
/// winning ties. Output is sorted descending by amount, ties by first
/// appearance; alerting relies on this ordering.
pub fn assemble(
    article_id: &ArticleId,
    resolved: Vec<(AmountCandidate, Option<ResolvedCompany>)>,
    threshold_millions: f64,
) -> Vec<RevenueMention> {
    let mut by_key: HashMap<String, RevenueMention> = HashMap::new();

    for (candidate, company) in resolved {
        let Some(company) = company else {
            continue;
        };
        if candidate.value_millions < threshold_millions || candidate.value_millions <= 0.0 {
            continue;
        }
        let key = dedup_key(&company.name, candidate.kind, candidate.value_millions);
        let mention = RevenueMention {
            article_id: article_id.clone(),
            company: company.name,
            amount_millions: candidate.value_millions,
            kind: candidate.kind,
            confidence: company.confidence.clamp(0.0, 1.0),
            dedup_key: key.clone(),
            span: candidate.span,
        };
        // Input arrives in span order, so replacing only on strictly higher
        // confidence keeps the earliest span among equal confidences.
        let dominated = by_key
            .get(&key)
            .is_some_and(|existing| existing.confidence >= mention.confidence);
        if !dominated {
            by_key.insert(key, mention);
        }
    }

    let mut out: Vec<RevenueMention> = by_key.into_values().collect();
    out.sort_by(|a, b| {
        b.amount_millions
            .partial_cmp(&a.amount_millions)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.span.start.cmp(&b.span.start))
    });
    out
}
