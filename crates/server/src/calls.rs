//! Call initiation API

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use voicebot_core::{CallState, InitiateCallRequest, OutboundCall, ValidCallRequest};

use crate::metrics::{record_call_placed, record_provider_failure};
use crate::state::AppState;
use crate::ServerError;

/// Body returned once the carrier accepted the call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCreated {
    pub call_id: String,
    pub sid: String,
    pub status: String,
}

/// `POST /api/call`
pub async fn create_call(
    State(state): State<AppState>,
    body: Result<Json<InitiateCallRequest>, JsonRejection>,
) -> Result<Json<CallCreated>, ServerError> {
    let Json(request) = body.map_err(|rejection| ServerError::Validation {
        field: "body".to_string(),
        message: rejection.body_text(),
    })?;

    let urls = state.urls().clone();
    let telephony = &state.config.telephony;
    let dial = |call: &CallState, request: &ValidCallRequest| -> voicebot_core::Result<OutboundCall> {
        Ok(OutboundCall {
            to: request.phone_number.clone(),
            answer_url: urls.answer_url(&call.call_id)?,
            machine_detection: telephony.machine_detection,
            machine_detection_timeout_secs: telephony.machine_detection_timeout_secs,
        })
    };

    let started = match state.flow.start_call(request, state.provider.as_ref(), dial).await {
        Ok(started) => started,
        Err(err @ voicebot_core::Error::Provider(_)) => {
            record_provider_failure();
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };
    record_call_placed();

    Ok(Json(CallCreated {
        call_id: started.state.call_id,
        sid: started.placed.sid,
        status: started.placed.status,
    }))
}

/// `GET /api/calls/:call_id`
pub async fn get_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallState>, ServerError> {
    state
        .flow
        .get(&call_id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound(call_id))
}
