//! Configuration management for the voicebot
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (`VOICEBOT__` prefix, `__` separator)
//! - The flat carrier/webhook variables (`PUBLIC_BASE_URL`, `TWILIO_*`, ...)
//!
//! The dialogue script (keyword sets and spoken texts) is configuration too,
//! so the conversation can be localized without code changes.

pub mod settings;
pub mod script;

pub use settings::{
    load_settings, AuthConfig, ObservabilityConfig, ServerConfig, Settings, StoreConfig,
    TelephonyConfig, VoiceConfig,
};
pub use script::{DialogueScript, KeywordSets, ObjectionPatterns, Replies};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for voicebot_core::Error {
    fn from(err: ConfigError) -> Self {
        voicebot_core::Error::Config(err.to_string())
    }
}
