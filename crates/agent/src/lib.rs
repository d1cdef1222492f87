//! Sales dialogue framework
//!
//! Features:
//! - Keyword-based objection classification
//! - Fixed rebuttal catalog
//! - Stage-based dialogue engine with attempt-limited pitching
//! - In-memory call state store with TTL eviction
//! - Call flow service tying store, engine and recovery policy together

pub mod classifier;
pub mod catalog;
pub mod engine;
pub mod store;
pub mod flow;

pub use classifier::{KeywordSet, UtteranceClassifier};
pub use catalog::ResponseCatalog;
pub use engine::{DialogueEngine, NextStep, Route, Turn, MAX_PITCH_ATTEMPTS, MAX_SCHEDULE_RETRIES, REFUSAL_EXIT_ATTEMPTS};
pub use store::InMemoryCallStore;
pub use flow::{is_machine_answer, CallFlow, RecoveryPolicy, StartedCall};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid pattern in {set}: {message}")]
    InvalidPattern { set: String, message: String },

    #[error("Script error: {0}")]
    Script(String),
}

impl From<voicebot_config::ConfigError> for AgentError {
    fn from(err: voicebot_config::ConfigError) -> Self {
        AgentError::Script(err.to_string())
    }
}

impl From<AgentError> for voicebot_core::Error {
    fn from(err: AgentError) -> Self {
        voicebot_core::Error::Config(err.to_string())
    }
}
