//! Configuration types, built from environment variables.

use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Who the campaign emails are written as.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderIdentity {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl SenderIdentity {
    pub fn new(name: Option<String>, email: Option<String>) -> Self {
        Self { name, email }
    }

    /// Name to write as: the display name, else the email, else a neutral label.
    pub fn display(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or("the applicant")
    }
}

/// Generation tuning.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// SMTP relay location. Credentials are never part of this; they are
/// supplied per campaign run.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: std::env::var("SMTP_HOST").unwrap_or(defaults.host),
            port: parse_env("SMTP_PORT")?.unwrap_or(defaults.port),
        })
    }
}

/// Files used to seed a terminal review session.
#[derive(Debug, Clone, Default)]
pub struct SessionInputs {
    pub contacts_csv: Option<PathBuf>,
    pub template_file: Option<PathBuf>,
    pub attachments_dir: Option<PathBuf>,
    pub inline_image: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub owner_id: String,
    pub sender: SenderIdentity,
    pub llm: LlmConfig,
    pub generation: GenerationConfig,
    pub relay: RelayConfig,
    pub inputs: SessionInputs,
    pub api_port: u16,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend: LlmBackend = std::env::var("OUTREACH_LLM_BACKEND")
            .unwrap_or_else(|_| "anthropic".to_string())
            .parse()
            .map_err(|message| ConfigError::InvalidValue {
                key: "OUTREACH_LLM_BACKEND".to_string(),
                message,
            })?;

        let key_var = backend.key_var();
        let api_key = std::env::var(key_var)
            .map_err(|_| ConfigError::MissingEnvVar(key_var.to_string()))?;
        let model = std::env::var("OUTREACH_MODEL")
            .unwrap_or_else(|_| backend.default_model().to_string());

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            temperature: parse_env("OUTREACH_TEMPERATURE")?.unwrap_or(defaults.temperature),
            max_tokens: parse_env("OUTREACH_MAX_TOKENS")?.unwrap_or(defaults.max_tokens),
        };

        let sender_email = std::env::var("OUTREACH_SENDER_EMAIL")
            .ok()
            .or_else(|| std::env::var("SMTP_USERNAME").ok());

        Ok(Self {
            owner_id: std::env::var("OUTREACH_OWNER").unwrap_or_else(|_| "local".to_string()),
            sender: SenderIdentity::new(std::env::var("OUTREACH_SENDER_NAME").ok(), sender_email),
            llm: LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
            },
            generation,
            relay: RelayConfig::from_env()?,
            inputs: SessionInputs {
                contacts_csv: std::env::var("OUTREACH_CONTACTS_CSV").ok().map(PathBuf::from),
                template_file: std::env::var("OUTREACH_TEMPLATE_FILE").ok().map(PathBuf::from),
                attachments_dir: std::env::var("OUTREACH_ATTACHMENTS_DIR")
                    .ok()
                    .map(PathBuf::from),
                inline_image: std::env::var("OUTREACH_INLINE_IMAGE").ok(),
            },
            api_port: parse_env("OUTREACH_API_PORT")?.unwrap_or(8080),
            log_dir: std::env::var("OUTREACH_LOG_DIR").ok().map(PathBuf::from),
        })
    }
}

/// Parse an optional environment variable, rejecting values that don't parse.
fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
