//! Core types and traits for the outbound sales voicebot
//!
//! This crate provides foundational types used across all other crates:
//! - Error taxonomy
//! - Conversation stages and per-call state
//! - Objection categories
//! - Call-initiation request validation
//! - Traits for the call store and the telephony carrier

pub mod error;
pub mod conversation;
pub mod objection;
pub mod request;
pub mod traits;

pub use error::{Error, Result};
pub use conversation::{CallState, Stage};
pub use objection::ObjectionKind;
pub use request::{InitiateCallRequest, ValidCallRequest};

pub use traits::{CallStore, CallProvider, OutboundCall, PlacedCall};
