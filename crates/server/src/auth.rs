//! Webhook Authentication Middleware
//!
//! The carrier echoes back the URLs we hand it, so the shared secret rides
//! along as a `token` query parameter. An `X-Webhook-Token` header is
//! accepted as well for callers that can set headers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;
use crate::ServerError;

/// Header alternative to the `token` query parameter
pub const TOKEN_HEADER: &str = "x-webhook-token";

/// Track if we've warned about auth being disabled (warn once only)
static AUTH_DISABLED_WARNED: AtomicBool = AtomicBool::new(false);

/// Reject voice webhooks that do not carry the configured token
///
/// Passes everything through when no secret is configured.
pub async fn webhook_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.config.server.auth.secret() else {
        if !AUTH_DISABLED_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "Webhook authentication is DISABLED! Set WEBHOOK_AUTH_TOKEN for production."
            );
        }
        return next.run(request).await;
    };

    match provided_token(&request) {
        Some(token) if constant_time_compare(token.as_bytes(), expected.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => {
            tracing::warn!(
                path = %request.uri().path(),
                forwarded_for = ?request.headers().get("X-Forwarded-For"),
                "Invalid webhook token"
            );
            ServerError::Auth.into_response()
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "Missing webhook token");
            ServerError::Auth.into_response()
        }
    }
}

fn provided_token(request: &Request) -> Option<String> {
    let from_query = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove("token"));

    from_query.or_else(|| {
        request
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
