// src/analyze/normalize.rs
//! Canonical text form for pattern matching: entity decoding, tag stripping,
//! whitespace collapse, boilerplate removal, sentence segmentation.
//!
//! All downstream spans (amount candidates, company context windows) are byte
//! offsets into [`NormalizedText::as_str`]; normalization happens exactly
//! once per article, so offsets stay valid across the whole pipeline.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_CONTENT_LINE_CHARS: usize = 40;

/// Byte range into [`NormalizedText::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedText {
    text: String,
    sentences: Vec<Span>,
}

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn sentences(&self) -> &[Span] {
        &self.sentences
    }

    pub fn sentence_text(&self, s: &Span) -> &str {
        &self.text[s.start..s.end]
    }
}

/// Normalize with the default boilerplate line length.
pub fn normalize(raw: &str) -> NormalizedText {
    normalize_with(raw, DEFAULT_MIN_CONTENT_LINE_CHARS)
}

/// Clean `raw` into a canonical form and segment it into sentences.
/// Best-effort: zero segments fall back to the whole text as one sentence;
/// this never errors.
pub fn normalize_with(raw: &str, min_content_line_chars: usize) -> NormalizedText {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(raw).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, " ").to_string();

    // 3) Fold typographic quotes to ASCII
    let folded = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Drop boilerplate lines: short, with no terminal punctuation
    //    (navigation fragments, bylines, "Read more" stubs).
    let mut kept_lines: Vec<&str> = Vec::new();
    for line in folded.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let ends_like_content = line
            .chars()
            .last()
            .is_some_and(|c| matches!(c, '.' | '!' | '?' | '"' | '\''));
        if line.chars().count() < min_content_line_chars && !ends_like_content {
            continue;
        }
        kept_lines.push(line);
    }
    let joined = kept_lines.join(" ");

    // 5) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    let text = re_ws.replace_all(&joined, " ").trim().to_string();

    let sentences = segment_sentences(&text);
    NormalizedText { text, sentences }
}

/// Sentence boundaries: `.`, `!` or `?` followed by whitespace and an
/// uppercase letter (or a quote opening one). Abbreviation handling is out of
/// scope for this heuristic; a missed boundary only widens one segment.
fn segment_sentences(text: &str) -> Vec<Span> {
    if text.is_empty() {
        return vec![Span::new(0, 0)];
    }

    static RE_BOUNDARY: OnceCell<Regex> = OnceCell::new();
    let re = RE_BOUNDARY.get_or_init(|| Regex::new(r#"[.!?]["']?\s+["']?\p{Lu}"#).unwrap());

    let mut spans = Vec::new();
    let mut start = 0usize;
    for m in re.find_iter(text) {
        // Split after the punctuation (+ optional closing quote), keeping the
        // uppercase opener in the next sentence.
        let punct_end = m.start()
            + text[m.start()..m.end()]
                .char_indices()
                .take_while(|(_, c)| !c.is_whitespace())
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(1);
        if punct_end > start {
            spans.push(Span::new(start, punct_end));
        }
        // Next sentence starts at the first non-whitespace char after the gap.
        start = m.start()
            + text[m.start()..m.end()]
                .char_indices()
                .find(|(_, c)| c.is_whitespace())
                .map(|(i, _)| i)
                .unwrap_or(0);
        start += text[start..m.end()]
            .char_indices()
            .take_while(|(_, c)| c.is_whitespace())
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
    }
    if start < text.len() {
        spans.push(Span::new(start, text.len()));
    }

    if spans.is_empty() {
        // Soft fallback: single segment over the whole text.
        spans.push(Span::new(0, text.len()));
    }
    spans
}
