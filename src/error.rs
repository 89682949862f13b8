//! Error types for the outreach pipeline.

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Import error: {0}")]
    Parse(#[from] ParseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Campaign error: {0}")]
    Campaign(#[from] CampaignError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the contact/template/attachment stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected input: bad campaign start requests and invalid templates.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No contacts selected")]
    EmptySelection,

    #[error("No template selected")]
    MissingTemplate,

    #[error("Relay credentials are missing")]
    MissingCredentials,

    #[error("Relay credentials are invalid: {0}")]
    InvalidCredentials(String),

    #[error("Unknown contact {0}")]
    UnknownContact(Uuid),

    #[error("Unknown template {0}")]
    UnknownTemplate(Uuid),

    #[error("Unknown attachment {0}")]
    UnknownAttachment(Uuid),

    #[error("Inline image '{0}' is not an image")]
    NotAnImage(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
}

/// Contact import failures.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Import payload is empty")]
    Empty,

    #[error("Import payload has no readable header row: {0}")]
    Header(String),

    #[error("Import payload is missing required column '{0}'")]
    MissingColumn(String),
}

/// Text-generation provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// A draft could not be produced for one recipient.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Model output contained no JSON object")]
    NoJsonObject,

    #[error("Model output is missing string field '{0}'")]
    MissingField(&'static str),
}

/// The relay (or message assembly before it) rejected a send.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Failed to load attachment {name}: {reason}")]
    Attachment { name: String, reason: String },

    #[error("Relay authentication failed: {0}")]
    Auth(String),

    #[error("Relay transport failed: {0}")]
    Transport(String),
}

/// Campaign orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Cannot {action} while campaign is {state}")]
    InvalidTransition { state: String, action: String },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
