// src/config.rs
//! Tracker configuration: TOML file + env overrides, validated before any
//! article is processed (fail fast rather than silently extracting nothing).

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/tracker.toml";
pub const ENV_CONFIG_PATH: &str = "TRACKER_CONFIG_PATH";
pub const ENV_THRESHOLD: &str = "TRACKER_THRESHOLD_MILLIONS";
pub const ENV_CONTEXT_WINDOW: &str = "TRACKER_CONTEXT_WINDOW_TOKENS";

pub const DEFAULT_THRESHOLD_MILLIONS: f64 = 30.0;
pub const DEFAULT_CONTEXT_WINDOW_TOKENS: usize = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("revenue threshold must be positive, got {0}")]
    NonPositiveThreshold(f64),
    #[error("context window must be at least 1 token")]
    EmptyContextWindow,
    #[error("amount rule set is empty")]
    EmptyRuleSet,
    #[error("amount rule `{name}`: {message}")]
    BadRule { name: String, message: String },
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {message}")]
    Parse { path: String, message: String },
}

/// One feed the scrape cycle polls.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    pub name: String,
    pub feed_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum amount (in millions) that produces an alert. Inclusive.
    pub threshold_millions: f64,
    /// Half-width of the company-resolution token window around an amount.
    pub context_window_tokens: usize,
    /// Lines shorter than this with no terminal punctuation are treated as
    /// boilerplate (navigation, bylines) and dropped by the normalizer.
    pub min_content_line_chars: usize,
    /// Ledger entries older than this are expired by the cycle's prune step.
    pub retention_days: i64,
    /// Seconds between scheduled scrape cycles.
    pub scrape_interval_secs: u64,
    /// Feeds to poll. Empty is allowed (e.g. library use with custom providers).
    pub sources: Vec<FeedConfig>,
    /// Capitalized phrases matching these are never resolved as companies.
    pub company_blocklist: Vec<String>,
    /// Optional JSON file with amount rules replacing the built-in set.
    pub amount_rules_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            threshold_millions: DEFAULT_THRESHOLD_MILLIONS,
            context_window_tokens: DEFAULT_CONTEXT_WINDOW_TOKENS,
            min_content_line_chars: 40,
            retention_days: 180,
            scrape_interval_secs: 7 * 24 * 3600,
            sources: default_sources(),
            company_blocklist: default_blocklist(),
            amount_rules_path: None,
        }
    }
}

fn default_sources() -> Vec<FeedConfig> {
    [
        ("techcrunch", "https://techcrunch.com/feed/"),
        ("crunchbase_news", "https://news.crunchbase.com/feed/"),
        ("forbes", "https://www.forbes.com/innovation/feed2/"),
    ]
    .into_iter()
    .map(|(name, url)| FeedConfig {
        name: name.to_string(),
        feed_url: url.to_string(),
    })
    .collect()
}

fn default_blocklist() -> Vec<String> {
    [
        "TechCrunch",
        "Crunchbase",
        "Crunchbase News",
        "Forbes",
        "Fortune",
        "Business Insider",
        "Axios",
        "Bloomberg",
        "PitchBook",
        "Reuters",
        "Wall Street Journal",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl TrackerConfig {
    /// Load configuration using env + fallbacks:
    /// 1) $TRACKER_CONFIG_PATH
    /// 2) config/tracker.toml
    /// 3) built-in defaults
    /// Individual env overrides are applied on top in all three cases.
    pub fn load_default() -> Result<Self, ConfigError> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            Self::load_from(Path::new(&p))?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from(&fallback)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = parse_env_f64(ENV_THRESHOLD) {
            self.threshold_millions = v;
        }
        if let Some(v) = parse_env_usize(ENV_CONTEXT_WINDOW) {
            self.context_window_tokens = v;
        }
    }

    /// Fatal at pipeline start; surfaced before any article is processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.threshold_millions > 0.0) {
            return Err(ConfigError::NonPositiveThreshold(self.threshold_millions));
        }
        if self.context_window_tokens == 0 {
            return Err(ConfigError::EmptyContextWindow);
        }
        Ok(())
    }
}

fn parse_env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn parse_env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
