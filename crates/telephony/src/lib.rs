//! Telephony plumbing
//!
//! - `twiml`: voice-markup tree and its XML encoder
//! - `webhook`: callback URLs handed to the carrier and turn rendering
//! - `twilio`: REST client placing outbound calls

pub mod twiml;
pub mod webhook;
pub mod twilio;

pub use twiml::{GatherOptions, Verb, VoiceResponse};
pub use webhook::{TurnRenderer, WebhookUrls};
pub use twilio::TwilioClient;

use thiserror::Error;

/// Telephony errors
#[derive(Error, Debug)]
pub enum TelephonyError {
    #[error("Carrier not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Carrier rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl From<TelephonyError> for voicebot_core::Error {
    fn from(err: TelephonyError) -> Self {
        match err {
            TelephonyError::InvalidUrl(msg) => voicebot_core::Error::Config(msg),
            TelephonyError::Rejected { message, .. } => voicebot_core::Error::Provider(message),
            other => voicebot_core::Error::Provider(other.to_string()),
        }
    }
}
