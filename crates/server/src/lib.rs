//! Voicebot Server
//!
//! HTTP API for placing calls and the carrier's voice webhooks.

pub mod auth;
pub mod calls;
pub mod http;
pub mod metrics;
pub mod state;
pub mod voice;

pub use auth::webhook_auth;
pub use http::create_router;
pub use crate::metrics::{init_metrics, metrics_handler};
pub use state::AppState;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{field} {message}")]
    Validation { field: String, message: String },

    #[error("Unauthorized")]
    Auth,

    #[error("Failed to create call: {0}")]
    Provider(String),

    #[error("Call not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServerError::Auth => StatusCode::UNAUTHORIZED,
            ServerError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<voicebot_core::Error> for ServerError {
    fn from(err: voicebot_core::Error) -> Self {
        use voicebot_core::Error;
        match err {
            Error::Validation { field, message } => ServerError::Validation { field, message },
            Error::Auth(_) => ServerError::Auth,
            Error::Provider(message) => ServerError::Provider(message),
            Error::UnknownCall(call_id) => ServerError::NotFound(call_id),
            err @ Error::CapacityExceeded(_) => ServerError::Unavailable(err.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<voicebot_telephony::TelephonyError> for ServerError {
    fn from(err: voicebot_telephony::TelephonyError) -> Self {
        voicebot_core::Error::from(err).into()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServerError::Validation { field, .. } => serde_json::json!({
                "error": self.to_string(),
                "field": field,
            }),
            ServerError::Auth => return (status, "Unauthorized").into_response(),
            ServerError::Provider(details) => serde_json::json!({
                "error": "Failed to create call",
                "details": details,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status() {
        let err: ServerError = voicebot_core::Error::validation("phoneNumber", "is invalid").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "phoneNumber is invalid");

        let err: ServerError = voicebot_core::Error::Provider("Authenticate".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: ServerError = voicebot_core::Error::CapacityExceeded(10).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ServerError = voicebot_core::Error::Auth("bad token".into()).into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
