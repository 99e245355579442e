// src/notify/email.rs
use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{AlertBatch, AlertSink};

pub const ENV_SMTP_HOST: &str = "SMTP_HOST";
pub const ENV_SMTP_USER: &str = "SMTP_USER";
pub const ENV_SMTP_PASS: &str = "SMTP_PASS";
pub const ENV_EMAIL_FROM: &str = "ALERT_EMAIL_FROM";
pub const ENV_EMAIL_TO: &str = "ALERT_EMAIL_TO";

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var(ENV_SMTP_HOST).context("SMTP_HOST missing")?;
        let user = std::env::var(ENV_SMTP_USER).context("SMTP_USER missing")?;
        let pass = std::env::var(ENV_SMTP_PASS).context("SMTP_PASS missing")?;
        let from_addr = std::env::var(ENV_EMAIL_FROM).context("ALERT_EMAIL_FROM missing")?;
        let to_addr = std::env::var(ENV_EMAIL_TO).context("ALERT_EMAIL_TO missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid ALERT_EMAIL_FROM")?;
        let to = to_addr.parse().context("invalid ALERT_EMAIL_TO")?;

        Ok(Self { mailer, from, to })
    }
}

#[async_trait::async_trait]
impl AlertSink for EmailSender {
    async fn send(&self, batch: &AlertBatch<'_>) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(batch.subject())
            .header(header::ContentType::TEXT_HTML)
            .body(batch.render_html())
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
