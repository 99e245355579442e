// src/notify/mod.rs
//! Alerting collaborators. The pipeline's only contract toward sinks is the
//! ordering and uniqueness of the mention list; everything here is rendering
//! and transport.

pub mod email;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::warn;

use crate::analyze::assemble::RevenueMention;
use crate::ingest::types::{Article, ArticleId};

pub use email::EmailSender;

/// One run's alert payload: mentions (already ordered and deduplicated by
/// the pipeline) plus the articles they came from, for headlines and links.
pub struct AlertBatch<'a> {
    pub mentions: &'a [RevenueMention],
    pub threshold_millions: f64,
    pub ts: DateTime<Utc>,
    articles: HashMap<&'a ArticleId, &'a Article>,
}

impl<'a> AlertBatch<'a> {
    pub fn new(
        mentions: &'a [RevenueMention],
        articles: &'a [Article],
        threshold_millions: f64,
    ) -> Self {
        Self {
            mentions,
            threshold_millions,
            ts: Utc::now(),
            articles: articles.iter().map(|a| (&a.id, a)).collect(),
        }
    }

    pub fn article(&self, id: &ArticleId) -> Option<&Article> {
        self.articles.get(id).copied()
    }

    pub fn total_millions(&self) -> f64 {
        self.mentions.iter().map(|m| m.amount_millions).sum()
    }

    pub fn subject(&self) -> String {
        let n = self.mentions.len();
        format!(
            "{n} startup revenue alert{} - ${:.1}M total",
            if n == 1 { "" } else { "s" },
            self.total_millions()
        )
    }

    pub fn render_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<h2>Startup Revenue Alerts</h2>\n");
        html.push_str(&format!(
            "<p>Found {} revenue announcement(s) over ${:.0}M:</p>\n",
            self.mentions.len(),
            self.threshold_millions
        ));
        for m in self.mentions {
            let (title, url) = match self.article(&m.article_id) {
                Some(a) => (a.title.as_str(), a.id.as_str()),
                None => ("(article unavailable)", m.article_id.as_str()),
            };
            html.push_str(
                "<div style='margin-bottom: 20px; padding: 15px; border-left: 3px solid #007cba;'>\n",
            );
            html.push_str(&format!(
                "<h3><a href='{}'>{}</a></h3>\n",
                url,
                escape_html(title)
            ));
            html.push_str(&format!(
                "<p><strong>Company:</strong> {}</p>\n",
                escape_html(&m.company)
            ));
            html.push_str(&format!(
                "<p><strong>Amount:</strong> ${:.1}M ({})</p>\n",
                m.amount_millions, m.kind
            ));
            if let Some(a) = self.article(&m.article_id) {
                html.push_str(&format!("<p><strong>Source:</strong> {}</p>\n", a.source));
                html.push_str(&format!(
                    "<p><strong>Date:</strong> {}</p>\n",
                    a.effective_published_at().format("%Y-%m-%d")
                ));
            }
            html.push_str("</div>\n");
        }
        html
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for m in self.mentions {
            let url = self
                .article(&m.article_id)
                .map(|a| a.id.as_str())
                .unwrap_or(m.article_id.as_str());
            out.push_str(&format!(
                "{}: ${:.1}M {} (confidence {:.2})\n  {}\n",
                m.company, m.amount_millions, m.kind, m.confidence, url
            ));
        }
        out
    }
}

fn escape_html(s: &str) -> String {
    html_escape::encode_text(s).to_string()
}

#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, batch: &AlertBatch<'_>) -> anyhow::Result<()>;
    fn name(&self) -> &'static str;
}

/// Fans one batch out to every configured sink. Sink failures are warnings;
/// a broken mailer must not abort the cycle (the ledger has already recorded
/// the alerts, so they will not repeat).
#[derive(Default)]
pub struct NotifierMux {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl NotifierMux {
    /// Build from the environment: email when SMTP settings are present.
    pub fn from_env() -> Self {
        let mut mux = Self::default();
        if std::env::var(email::ENV_SMTP_HOST).is_ok() {
            match EmailSender::from_env() {
                Ok(sender) => mux.sinks.push(Box::new(sender)),
                Err(e) => warn!(error = %e, "email sink not configured"),
            }
        }
        mux
    }

    pub fn with_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn notify(&self, batch: &AlertBatch<'_>) {
        if batch.mentions.is_empty() {
            return;
        }
        for sink in &self.sinks {
            if let Err(e) = sink.send(batch).await {
                warn!(error = ?e, sink = sink.name(), "alert sink failed");
            }
        }
    }
}
