// src/analyze/company.rs
//! Company-name resolution around an extracted amount.
//!
//! Heuristic, not NLP: capitalized multi-token phrases inside a bounded token
//! window, with subject-position phrases (immediately before a reporting
//! verb) preferred over merely-nearby ones. Known to false-positive on
//! capitalized section headers; confidence scoring is best-effort.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::analyze::normalize::{NormalizedText, Span};

/// Confidence for a phrase sitting in subject position before a reporting verb.
pub const CONFIDENCE_SUBJECT: f32 = 1.0;
/// Confidence for a capitalized phrase that is merely inside the window.
pub const CONFIDENCE_PROXIMITY: f32 = 0.6;

const MAX_PHRASE_TOKENS: usize = 4;
const BLOCKLIST_SIMILARITY: f64 = 0.92;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCompany {
    pub name: String,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    start: usize,
    end: usize,
}

/// Basic, Unicode-friendly tokenizer with byte spans.
fn tokenize(input: &str) -> Vec<Token> {
    static RE_WORD: OnceCell<Regex> = OnceCell::new();
    let re = RE_WORD.get_or_init(|| Regex::new(r"(?u)\b\w+\b").unwrap());
    re.find_iter(input)
        .map(|m| Token {
            text: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Common sentence-initial words that start capitalized without naming anyone.
fn is_stopword(tok: &str) -> bool {
    matches!(
        tok,
        "The" | "This" | "That" | "These" | "Those" | "A" | "An" | "And" | "But" | "Or" | "So"
            | "Yet" | "In" | "On" | "At" | "For" | "By" | "From" | "With" | "As" | "It" | "Its"
            | "According" | "Meanwhile" | "However" | "While" | "After" | "Before" | "During"
            | "Last" | "Next" | "Earlier" | "Later" | "Now" | "Today" | "Yesterday"
    )
}

/// Calendar and finance boilerplate that is capitalized but never a company.
fn is_boilerplate(tok: &str) -> bool {
    matches!(
        tok,
        "January" | "February" | "March" | "April" | "May" | "June" | "July" | "August"
            | "September" | "October" | "November" | "December" | "Monday" | "Tuesday"
            | "Wednesday" | "Thursday" | "Friday" | "Saturday" | "Sunday" | "Q1" | "Q2" | "Q3"
            | "Q4" | "CEO" | "CFO" | "CTO" | "COO" | "IPO" | "USD" | "ARR" | "Series"
    )
}

fn is_reporting_verb(tok: &str) -> bool {
    matches!(
        tok,
        "reported" | "reports" | "announced" | "announces" | "posted" | "posts" | "hit" | "hits"
            | "reached" | "reaches" | "generated" | "generates" | "disclosed" | "discloses"
            | "said" | "says" | "recorded" | "records" | "touts" | "touted"
    )
}

/// Token eligible to participate in a company phrase: starts uppercase (or is
/// a 2+-letter all-caps acronym) and is neither a stopword nor boilerplate.
fn is_name_token(tok: &str) -> bool {
    if is_stopword(tok) || is_boilerplate(tok) {
        return false;
    }
    // Digit-led tokens like "75M" or "2024" fail the uppercase check.
    tok.chars().next().is_some_and(char::is_uppercase)
}

fn matches_blocklist(phrase: &str, blocklist: &[String]) -> bool {
    let p = phrase.to_lowercase();
    blocklist.iter().any(|b| {
        let b = b.to_lowercase();
        p == b || strsim::jaro_winkler(&p, &b) >= BLOCKLIST_SIMILARITY
    })
}

#[derive(Debug)]
struct Phrase {
    text: String,
    first_idx: usize,
    last_idx: usize,
}

/// Resolve the most likely subject company for a candidate span.
/// Returns `None` when no eligible phrase exists inside the window; the
/// assembler drops such candidates; this is a soft failure, never an error.
pub fn resolve(
    candidate_span: &Span,
    text: &NormalizedText,
    window_tokens: usize,
    blocklist: &[String],
) -> Option<ResolvedCompany> {
    let tokens = tokenize(text.as_str());
    if tokens.is_empty() {
        return None;
    }

    // Anchor token range covered by the amount span.
    let anchor_first = tokens
        .iter()
        .position(|t| t.end > candidate_span.start)
        .unwrap_or(tokens.len().saturating_sub(1));
    let anchor_last = tokens
        .iter()
        .rposition(|t| t.start < candidate_span.end)
        .unwrap_or(anchor_first);

    let lo = anchor_first.saturating_sub(window_tokens);
    let hi = (anchor_last + window_tokens).min(tokens.len() - 1);

    let phrases = collect_phrases(&tokens, lo, hi, candidate_span, blocklist);
    if phrases.is_empty() {
        return None;
    }

    // Subject position first: phrase immediately followed by a reporting verb.
    let subject = phrases
        .iter()
        .filter(|p| {
            tokens
                .get(p.last_idx + 1)
                .is_some_and(|t| is_reporting_verb(&t.text))
        })
        .min_by_key(|p| token_distance(p, anchor_first, anchor_last));
    if let Some(p) = subject {
        return Some(ResolvedCompany {
            name: p.text.clone(),
            confidence: CONFIDENCE_SUBJECT,
        });
    }

    // Otherwise the nearest eligible phrase, preferring the one before the
    // amount on equal distance.
    let nearest = phrases
        .iter()
        .min_by_key(|p| (token_distance(p, anchor_first, anchor_last), p.first_idx))?;
    Some(ResolvedCompany {
        name: nearest.text.clone(),
        confidence: CONFIDENCE_PROXIMITY,
    })
}

fn token_distance(p: &Phrase, anchor_first: usize, anchor_last: usize) -> usize {
    if p.last_idx < anchor_first {
        anchor_first - p.last_idx
    } else if p.first_idx > anchor_last {
        p.first_idx - anchor_last
    } else {
        0
    }
}

fn collect_phrases(
    tokens: &[Token],
    lo: usize,
    hi: usize,
    candidate_span: &Span,
    blocklist: &[String],
) -> Vec<Phrase> {
    let mut out = Vec::new();
    let mut i = lo;
    while i <= hi {
        if !is_name_token(&tokens[i].text) || candidate_span.contains(tokens[i].start) {
            i += 1;
            continue;
        }
        let mut j = i;
        while j + 1 <= hi
            && j + 1 - i < MAX_PHRASE_TOKENS
            && is_name_token(&tokens[j + 1].text)
            && !candidate_span.contains(tokens[j + 1].start)
        {
            j += 1;
        }
        let text = tokens[i..=j]
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if text.chars().count() > 2 && !matches_blocklist(&text, blocklist) {
            out.push(Phrase {
                text,
                first_idx: i,
                last_idx: j,
            });
        }
        i = j + 1;
    }
    out
}
