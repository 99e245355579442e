// src/analyze/amount.rs
//! Monetary-figure extraction. Rules are explicit data (regex + priority),
//! evaluated per sentence in priority order; overlapping matches resolve
//! longest-match-wins, then by rule priority.
//!
//! Values normalize to millions of currency units: "$75M", "$0.075B" and
//! "$75,000K" all come out as 75.0. Malformed numbers never raise; the rule
//! simply yields one candidate fewer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::analyze::normalize::{NormalizedText, Span};
use crate::config::ConfigError;

/// What the surrounding lexical context says the figure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountKind {
    Revenue,
    Arr,
    Bookings,
    Sales,
    Unknown,
}

impl AmountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmountKind::Revenue => "revenue",
            AmountKind::Arr => "arr",
            AmountKind::Bookings => "bookings",
            AmountKind::Sales => "sales",
            AmountKind::Unknown => "unknown",
        }
    }

    fn from_keyword(kw: &str) -> Self {
        let k = kw.to_ascii_lowercase();
        if k == "arr" || k.contains("annual") {
            AmountKind::Arr
        } else if k.contains("revenue") {
            AmountKind::Revenue
        } else if k.contains("booking") {
            AmountKind::Bookings
        } else if k.contains("sales") {
            AmountKind::Sales
        } else {
            AmountKind::Unknown
        }
    }
}

impl std::fmt::Display for AmountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pre-filter extraction result; offsets index the normalized text.
#[derive(Debug, Clone)]
pub struct AmountCandidate {
    pub raw_text: String,
    pub value_millions: f64,
    pub kind: AmountKind,
    pub span: Span,
}

/// One pattern rule. Regexes must expose `amount` and `unit` named groups;
/// `kind` is optional (absent means the rule classifies as `unknown`).
#[derive(Debug)]
pub struct AmountRule {
    pub name: String,
    /// Lower wins when two matches cover spans of equal length.
    pub priority: u32,
    re: Regex,
}

#[derive(Debug, Deserialize)]
struct RuleSpec {
    name: String,
    pattern: String,
    priority: u32,
}

impl AmountRule {
    pub fn new(name: &str, pattern: &str, priority: u32) -> Result<Self, ConfigError> {
        let re = Regex::new(pattern).map_err(|e| ConfigError::BadRule {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        let has = |g: &str| re.capture_names().any(|n| n == Some(g));
        if !has("amount") || !has("unit") {
            return Err(ConfigError::BadRule {
                name: name.to_string(),
                message: "pattern must define `amount` and `unit` named groups".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            priority,
            re,
        })
    }
}

const AMOUNT: &str = r"(?P<amount>\d+(?:,\d{3})*(?:\.\d+)?)";
const UNIT: &str = r"(?P<unit>billion|million|thousand|bn|mn|[bmk])\b";
const UNIT_WORD: &str = r"(?P<unit>billion|million|thousand)\b";
const KIND: &str = r"(?P<kind>annual\s+recurring\s+revenue|revenue|arr|bookings|sales)\b";

/// Built-in rule set. Kind-keyword rules carry lower priority numbers than
/// the generic-currency rule, so they win span-length ties.
pub fn default_rules() -> Vec<AmountRule> {
    let specs = [
        (
            "currency-then-kind",
            format!(r"(?i)\${AMOUNT}\s*{UNIT}\s*(?:(?:usd|dollars?)\s+)?(?:(?:in|of)\s+)?{KIND}"),
            10,
        ),
        (
            "number-then-kind",
            format!(
                r"(?i)\b{AMOUNT}\s*{UNIT_WORD}\s+(?:(?:usd|dollars?)\s+)?(?:(?:in|of)\s+)?{KIND}"
            ),
            20,
        ),
        (
            "kind-then-currency",
            format!(
                r"(?i)\b{KIND}\s+(?:(?:of|at|reached|hit|topped|crossed|grew\s+to|climbed\s+to)\s+)?\$?{AMOUNT}\s*{UNIT}"
            ),
            30,
        ),
        (
            // Untyped run-rate/top-line figures still surface, just as `unknown`.
            "currency-run-rate",
            format!(r"(?i)\${AMOUNT}\s*{UNIT}\s*(?:(?:annualized|annual)\s+)?(?:run[\s-]rate|top[\s-]line)"),
            40,
        ),
    ];
    specs
        .into_iter()
        .map(|(name, pat, prio)| {
            AmountRule::new(name, &pat, prio).expect("built-in amount rule compiles")
        })
        .collect()
}

/// Load a replacement rule set from a JSON file:
/// `[{ "name": "...", "pattern": "...", "priority": 10 }, ...]`.
pub fn load_rules_file(path: &Path) -> Result<Vec<AmountRule>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let specs: Vec<RuleSpec> = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut rules = Vec::with_capacity(specs.len());
    for s in specs {
        rules.push(AmountRule::new(&s.name, &s.pattern, s.priority)?);
    }
    if rules.is_empty() {
        return Err(ConfigError::EmptyRuleSet);
    }
    Ok(rules)
}

/// Multiplier mapping a unit word to millions.
fn unit_to_millions(unit: &str) -> Option<f64> {
    match unit.to_ascii_lowercase().as_str() {
        "k" | "thousand" => Some(0.001),
        "m" | "mn" | "million" => Some(1.0),
        "b" | "bn" | "billion" => Some(1000.0),
        _ => None,
    }
}

/// Extract candidates in left-to-right order of appearance, not deduplicated.
pub fn extract(text: &NormalizedText, rules: &[AmountRule]) -> Vec<AmountCandidate> {
    let mut matches: Vec<(u32, AmountCandidate)> = Vec::new();

    for sent in text.sentences() {
        let slice = text.sentence_text(sent);
        for rule in rules {
            for caps in rule.re.captures_iter(slice) {
                let m = caps.get(0).expect("regex match has a whole-match group");
                let Some(candidate) = candidate_from_captures(&caps, sent.start, m) else {
                    debug!(rule = %rule.name, "discarded malformed amount match");
                    continue;
                };
                matches.push((rule.priority, candidate));
            }
        }
    }

    resolve_overlaps(matches)
}

fn candidate_from_captures(
    caps: &regex::Captures<'_>,
    sentence_start: usize,
    m: regex::Match<'_>,
) -> Option<AmountCandidate> {
    let digits = caps.name("amount")?.as_str().replace(',', "");
    let value: f64 = digits.parse().ok()?;
    let multiplier = unit_to_millions(caps.name("unit")?.as_str())?;
    let value_millions = value * multiplier;
    if !value_millions.is_finite() || value_millions <= 0.0 {
        return None;
    }
    let kind = caps
        .name("kind")
        .map(|k| AmountKind::from_keyword(k.as_str()))
        .unwrap_or(AmountKind::Unknown);
    Some(AmountCandidate {
        raw_text: m.as_str().to_string(),
        value_millions,
        kind,
        span: Span::new(sentence_start + m.start(), sentence_start + m.end()),
    })
}

/// Keep the most specific match per overlapping region: longest span wins,
/// ties broken by rule priority (kind-keyword rules first).
fn resolve_overlaps(mut matches: Vec<(u32, AmountCandidate)>) -> Vec<AmountCandidate> {
    matches.sort_by(|(pa, a), (pb, b)| {
        let len_a = a.span.end - a.span.start;
        let len_b = b.span.end - b.span.start;
        len_b.cmp(&len_a).then(pa.cmp(pb)).then(a.span.start.cmp(&b.span.start))
    });

    let mut kept: Vec<AmountCandidate> = Vec::new();
    for (_prio, cand) in matches {
        if kept.iter().all(|k| !k.span.overlaps(&cand.span)) {
            kept.push(cand);
        }
    }
    kept.sort_by_key(|c| c.span.start);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::normalize::normalize;

    fn extract_str(text: &str) -> Vec<AmountCandidate> {
        extract(&normalize(text), &default_rules())
    }

    #[test]
    fn currency_kind_forms_normalize_to_millions() {
        for text in [
            "The startup posted $75M in ARR.",
            "The startup posted $0.075B in ARR.",
            "The startup posted $75,000K in ARR.",
        ] {
            let out = extract_str(text);
            assert_eq!(out.len(), 1, "one candidate for {text:?}");
            assert!(
                (out[0].value_millions - 75.0).abs() < 1e-9,
                "normalized {} for {text:?}",
                out[0].value_millions
            );
            assert_eq!(out[0].kind, AmountKind::Arr);
        }
    }

    #[test]
    fn kind_first_phrasing_matches() {
        let out = extract_str("Revenue of $120 million was a record for the firm.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, AmountKind::Revenue);
        assert!((out[0].value_millions - 120.0).abs() < 1e-9);
    }

    #[test]
    fn spelled_out_units_work() {
        let out = extract_str("CloudCo reached 2.5 billion dollars in sales last year.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, AmountKind::Sales);
        assert!((out[0].value_millions - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn annual_recurring_revenue_maps_to_arr() {
        let out = extract_str("They announced $42M in annual recurring revenue.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, AmountKind::Arr);
    }

    #[test]
    fn run_rate_is_kind_unknown() {
        let out = extract_str("The company touts a $90M run-rate going into the IPO.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, AmountKind::Unknown);
        assert!((out[0].value_millions - 90.0).abs() < 1e-9);
    }

    #[test]
    fn no_figure_means_no_candidates() {
        let out = extract_str("The company's revenue grew but no figure was disclosed.");
        assert!(out.is_empty());
    }

    #[test]
    fn plain_funding_amounts_are_not_candidates() {
        let out = extract_str("The startup raised $50M from three venture funds.");
        assert!(out.is_empty());
    }

    #[test]
    fn overlapping_rules_keep_longest_match() {
        // "revenue of $75 million" (kind-first) covers more text than any
        // competing parse of the same region; only one candidate survives.
        let out = extract_str("Quarterly revenue of $75 million beat expectations.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, AmountKind::Revenue);
        assert!(out[0].raw_text.to_lowercase().starts_with("revenue"));
    }

    #[test]
    fn candidates_come_out_left_to_right() {
        let out = extract_str(
            "AlphaSoft reported $75M in ARR. Later, BetaWorks posted revenue of $32 million.",
        );
        assert_eq!(out.len(), 2);
        assert!(out[0].span.start < out[1].span.start);
        assert_eq!(out[0].kind, AmountKind::Arr);
        assert_eq!(out[1].kind, AmountKind::Revenue);
    }

    #[test]
    fn thousands_separators_parse() {
        let out = extract_str("Bookings of $1,250 million were disclosed.");
        assert_eq!(out.len(), 1);
        assert!((out[0].value_millions - 1250.0).abs() < 1e-9);
        assert_eq!(out[0].kind, AmountKind::Bookings);
    }

    #[test]
    fn rules_require_named_groups() {
        let err = AmountRule::new("bad", r"(?i)\$\d+", 1);
        assert!(err.is_err());
    }
}
