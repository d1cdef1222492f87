//! Carrier call-placement trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Outbound call to place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    /// Callee number
    pub to: String,
    /// Webhook the carrier fetches once the call is answered
    pub answer_url: String,
    /// Enable answering-machine detection
    pub machine_detection: bool,
    /// Answering-machine detection timeout, seconds
    pub machine_detection_timeout_secs: u32,
}

/// Carrier's acknowledgement of a placed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedCall {
    /// Carrier call identifier
    pub sid: String,
    /// Carrier call status, e.g. `queued`
    pub status: String,
}

/// Telephony carrier able to place outbound calls
///
/// Implementations:
/// - `TwilioClient` - Twilio Programmable Voice REST API
#[async_trait]
pub trait CallProvider: Send + Sync + 'static {
    /// Place the call. Carrier failures surface as `Error::Provider`.
    async fn place_call(&self, call: OutboundCall) -> Result<PlacedCall>;

    /// Provider name for logs
    fn name(&self) -> &str;
}
