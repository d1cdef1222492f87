//! Observability Metrics
//!
//! Prometheus exposition at `/metrics`.

use std::sync::OnceLock;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use voicebot_agent::{Route, Turn};
use voicebot_core::ObjectionKind;

use crate::state::AppState;

/// Global Prometheus handle
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder
///
/// Must be called once at startup before recording any metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_default_metrics();
    METRICS_HANDLE.get_or_init(|| handle.clone());
    Ok(handle)
}

/// Get the global metrics handle
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

fn register_default_metrics() {
    gauge!("voicebot_calls_stored").set(0.0);
    counter!("voicebot_calls_placed_total").absolute(0);
    counter!("voicebot_provider_failures_total").absolute(0);

    for route in [Route::Answer, Route::Qualify, Route::Handle, Route::Schedule] {
        counter!("voicebot_webhook_turns_total", "route" => route.as_str()).absolute(0);
    }
    for kind in ObjectionKind::ALL {
        counter!("voicebot_objections_total", "kind" => kind.as_str()).absolute(0);
    }
}

/// Carrier accepted a call
pub fn record_call_placed() {
    counter!("voicebot_calls_placed_total").increment(1);
}

/// Carrier rejected a call or was unreachable
pub fn record_provider_failure() {
    counter!("voicebot_provider_failures_total").increment(1);
}

/// One webhook turn, with its stage transition and objection
pub fn record_turn(route: Route, turn: &Turn) {
    counter!("voicebot_webhook_turns_total", "route" => route.as_str()).increment(1);
    if turn.from != turn.to {
        counter!(
            "voicebot_stage_transitions_total",
            "from" => turn.from.as_str(),
            "to" => turn.to.as_str()
        )
        .increment(1);
    }
    if let Some(kind) = turn.objection {
        counter!("voicebot_objections_total", "kind" => kind.as_str()).increment(1);
    }
}

/// Stored calls gauge
pub fn record_stored_calls(count: usize) {
    gauge!("voicebot_calls_stored").set(count as f64);
}

/// Metrics endpoint handler
///
/// Returns Prometheus-formatted metrics.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    record_stored_calls(state.call_count());

    match get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Metrics not initialized".to_string(),
        ),
    }
}
