//! Mail relay seam and the SMTP implementation.

use async_trait::async_trait;
use lettre::address::Address;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use super::message::build_message;
use crate::config::RelayConfig;
use crate::error::{DispatchError, ValidationError};

/// Relay login supplied per campaign run. Never persisted.
#[derive(Debug, Clone)]
pub struct RelayCredentials {
    pub username: String,
    pub password: SecretString,
}

impl RelayCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Username and password present, username a mailbox address.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() || self.password.expose_secret().is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        self.username
            .trim()
            .parse::<Address>()
            .map_err(|e| ValidationError::InvalidCredentials(format!("username: {e}")))?;
        Ok(())
    }
}

/// One file carried by an outbound message.
#[derive(Debug, Clone)]
pub struct OutboundAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Set for images referenced from the body as `cid:{id}`.
    pub content_id: Option<String>,
}

/// A fully resolved message, ready for the relay.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub from_name: String,
    pub from_address: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<OutboundAttachment>,
}

impl OutboundEmail {
    pub fn inline_parts(&self) -> impl Iterator<Item = &OutboundAttachment> {
        self.attachments.iter().filter(|a| a.content_id.is_some())
    }

    pub fn regular_parts(&self) -> impl Iterator<Item = &OutboundAttachment> {
        self.attachments.iter().filter(|a| a.content_id.is_none())
    }
}

/// Delivers outbound mail. Exactly one attempt per call.
#[async_trait]
pub trait MailRelay: Send + Sync {
    async fn send(
        &self,
        email: OutboundEmail,
        credentials: &RelayCredentials,
    ) -> Result<(), DispatchError>;
}

/// SMTP over STARTTLS via lettre's blocking transport.
pub struct SmtpRelay {
    config: RelayConfig,
}

impl SmtpRelay {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailRelay for SmtpRelay {
    async fn send(
        &self,
        email: OutboundEmail,
        credentials: &RelayCredentials,
    ) -> Result<(), DispatchError> {
        let message = build_message(&email)?;
        let config = self.config.clone();
        let creds = Credentials::new(
            credentials.username.clone(),
            credentials.password.expose_secret().to_string(),
        );

        tokio::task::spawn_blocking(move || {
            let transport = SmtpTransport::starttls_relay(&config.host)
                .map_err(|e| DispatchError::Transport(format!("SMTP relay error: {e}")))?
                .port(config.port)
                .credentials(creds)
                .build();

            transport.send(&message).map(|_| ()).map_err(classify_smtp_error)
        })
        .await
        .map_err(|e| DispatchError::Transport(format!("send task failed: {e}")))??;

        tracing::info!(to = %email.to, "Email sent");
        Ok(())
    }
}

fn classify_smtp_error(e: lettre::transport::smtp::Error) -> DispatchError {
    let code = e.status().map(|c| c.to_string());
    match code.as_deref() {
        Some("530" | "534" | "535") => DispatchError::Auth(e.to_string()),
        _ => DispatchError::Transport(format!("SMTP send failed: {e}")),
    }
}
