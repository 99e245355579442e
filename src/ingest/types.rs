// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable article identity derived from the canonical URL (query params,
/// fragment and trailing slashes stripped; scheme and host lowercased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    pub fn from_url(url: &str) -> Self {
        Self(canonicalize_url(url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical URL form. Two fetches of the same story through different
/// tracking params must map to one identity.
pub fn canonicalize_url(url: &str) -> String {
    let mut s = url.trim();
    if let Some(i) = s.find('#') {
        s = &s[..i];
    }
    if let Some(i) = s.find('?') {
        s = &s[..i];
    }
    let s = s.trim_end_matches('/');

    // Lowercase scheme and host only; the path is case-sensitive.
    match s.find("://") {
        Some(scheme_end) => {
            let after = &s[scheme_end + 3..];
            let host_end = after.find('/').unwrap_or(after.len());
            let mut out = s[..scheme_end + 3].to_ascii_lowercase();
            out.push_str(&after[..host_end].to_ascii_lowercase());
            out.push_str(&after[host_end..]);
            out
        }
        None => s.to_string(),
    }
}

/// Known publishers the tracker monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    TechCrunch,
    CrunchbaseNews,
    Forbes,
    Fortune,
    BusinessInsider,
    Axios,
    Bloomberg,
    PitchBook,
    Other,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::TechCrunch => "techcrunch",
            Source::CrunchbaseNews => "crunchbase_news",
            Source::Forbes => "forbes",
            Source::Fortune => "fortune",
            Source::BusinessInsider => "business_insider",
            Source::Axios => "axios",
            Source::Bloomberg => "bloomberg",
            Source::PitchBook => "pitchbook",
            Source::Other => "other",
        }
    }

    /// Lenient mapping from a config-file name; unrecognized names become
    /// `Other` rather than failing the whole config.
    pub fn from_name(name: &str) -> Self {
        let n = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match n.as_str() {
            "techcrunch" => Source::TechCrunch,
            "crunchbase" | "crunchbase_news" => Source::CrunchbaseNews,
            "forbes" => Source::Forbes,
            "fortune" => Source::Fortune,
            "business_insider" | "businessinsider" => Source::BusinessInsider,
            "axios" => Source::Axios,
            "bloomberg" => Source::Bloomberg,
            "pitchbook" => Source::PitchBook,
            _ => Source::Other,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External input to the pipeline; immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub source: Source,
    pub title: String,
    pub body: String,
    /// Absent when the feed carried no usable date; the pipeline falls back
    /// to `fetched_at`.
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

impl Article {
    /// Title and body joined for analysis; headlines often carry the figure.
    pub fn full_text(&self) -> String {
        if self.title.is_empty() {
            self.body.clone()
        } else {
            format!("{}. {}", self.title.trim_end_matches('.'), self.body)
        }
    }

    pub fn effective_published_at(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.fetched_at)
    }
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &'static str;
}
