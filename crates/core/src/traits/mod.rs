//! Core traits for the voicebot
//!
//! Collaborators the dialogue flow depends on are traits so they can be
//! swapped (in-memory vs. shared store, real carrier vs. test double).
//!
//! ```text
//! State:
//!   - CallStore: call id → CallState
//!
//! Telephony:
//!   - CallProvider: place an outbound call through a carrier
//! ```

mod store;
mod provider;

pub use store::CallStore;
pub use provider::{CallProvider, OutboundCall, PlacedCall};
