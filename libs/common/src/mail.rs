//! Outgoing mail delivery
//!
//! Two transports implement [`Mailer`]: SMTP via `lettre`, and an in-memory
//! outbox that only records and logs messages.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

/// Error type for mail delivery
#[derive(Error, Debug)]
pub enum MailError {
    /// A sender or recipient address could not be parsed
    #[error("Invalid email address '{0}'")]
    Address(String),

    /// The message could not be assembled
    #[error("Failed to build email: {0}")]
    Build(String),

    /// The transport failed to deliver the message
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// The outbox was told to refuse messages
    #[error("{0}")]
    Rejected(String),
}

/// Type alias for Result with MailError
pub type MailResult<T> = Result<T, MailError>;

/// A plain-text email ready to be sent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Sends outgoing emails
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> MailResult<()>;
}

/// Which transport to build from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    Smtp,
    #[default]
    Outbox,
}

/// Mail configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub transport: MailTransport,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_from")]
    pub from: String,
    /// Messages allowed per day, reported by the quota endpoints
    #[serde(default = "default_daily_quota")]
    pub daily_quota: u32,
}

fn default_smtp_port() -> u16 {
    465
}

fn default_from() -> String {
    "Lake Illawong Maintenance <irc.mtceteam@gmail.com>".to_string()
}

fn default_daily_quota() -> u32 {
    300
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::default(),
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: default_from(),
            daily_quota: default_daily_quota(),
        }
    }
}

/// Build the mailer selected by the configuration
pub fn build_mailer(config: &MailConfig) -> MailResult<Arc<dyn Mailer>> {
    match config.transport {
        MailTransport::Smtp => Ok(Arc::new(SmtpMailer::new(config)?)),
        MailTransport::Outbox => Ok(Arc::new(OutboxMailer::new())),
    }
}

/// Mailer delivering through an SMTP relay over implicit TLS
#[derive(Clone)]
pub struct SmtpMailer {
    smtp: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> MailResult<Self> {
        if config.smtp_host.is_empty() {
            return Err(MailError::Transport("SMTP host is not configured".to_string()));
        }

        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let tls_parameters = TlsParameters::new(config.smtp_host.clone())
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let smtp = SmtpTransport::relay(&config.smtp_host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .credentials(creds)
            .port(config.smtp_port)
            .tls(Tls::Wrapper(tls_parameters))
            .build();

        let from = config
            .from
            .parse()
            .map_err(|_| MailError::Address(config.from.clone()))?;

        Ok(Self { smtp, from })
    }

    fn build_message(&self, email: &OutgoingEmail) -> MailResult<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(email.subject.as_str());

        for to in &email.to {
            let mailbox: Mailbox = to.parse().map_err(|_| MailError::Address(to.clone()))?;
            builder = builder.to(mailbox);
        }

        builder
            .body(email.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> MailResult<()> {
        let message = self.build_message(email)?;
        let smtp = self.smtp.clone();

        tokio::task::spawn_blocking(move || smtp.send(&message))
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?
            .map_err(|e| MailError::Transport(e.to_string()))?;

        info!("Sent '{}' to {}", email.subject, email.to.join(", "));
        Ok(())
    }
}

/// Mailer that keeps messages in memory instead of sending them
#[derive(Clone, Default)]
pub struct OutboxMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Make every following send fail with `reason`, or succeed again with `None`
    pub fn set_failure(&self, reason: Option<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = reason;
        }
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: &OutgoingEmail) -> MailResult<()> {
        let failure = self.failure.lock().ok().and_then(|f| f.clone());
        if let Some(reason) = failure {
            warn!("Outbox refused '{}': {}", email.subject, reason);
            return Err(MailError::Rejected(reason));
        }

        info!("Outbox recorded '{}' for {}", email.subject, email.to.join(", "));
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}
