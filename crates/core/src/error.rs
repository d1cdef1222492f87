//! Error types for the voicebot

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type shared by every crate in the workspace
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed call-initiation request
    #[error("Validation error on \"{field}\": {message}")]
    Validation { field: String, message: String },

    /// Missing or incorrect webhook token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Carrier API failure while placing a call
    #[error("Provider error: {0}")]
    Provider(String),

    /// Webhook referenced a call id that is not in the store
    #[error("Unknown call: {0}")]
    UnknownCall(String),

    /// Call store refused a new entry
    #[error("Call store at capacity ({0} calls)")]
    CapacityExceeded(usize),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a validation error for a request field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field name for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}
