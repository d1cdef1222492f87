//! Carrier voice webhooks
//!
//! Each handler runs one dialogue turn and replies with voice markup.

use axum::{
    extract::{rejection::FormRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use voicebot_agent::{Route, Turn};
use voicebot_telephony::VoiceResponse;

use crate::metrics::record_turn;
use crate::state::AppState;
use crate::ServerError;

/// Query string the carrier echoes back
#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    #[serde(rename = "callId")]
    pub call_id: Option<String>,
}

/// Form fields posted by the carrier; everything else is ignored
#[derive(Debug, Default, Deserialize)]
pub struct VoiceForm {
    #[serde(rename = "SpeechResult", default)]
    pub speech_result: Option<String>,
    #[serde(rename = "AnsweredBy", default)]
    pub answered_by: Option<String>,
}

/// Voice markup response with `text/xml` content type
pub struct Xml(pub VoiceResponse);

impl IntoResponse for Xml {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "text/xml")], self.0.to_xml()).into_response()
    }
}

fn call_id(query: WebhookQuery) -> Result<String, ServerError> {
    query
        .call_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ServerError::Validation {
            field: "callId".to_string(),
            message: "is required".to_string(),
        })
}

fn form(form: Result<Form<VoiceForm>, FormRejection>) -> VoiceForm {
    form.map(|Form(form)| form).unwrap_or_default()
}

/// Render a turn, or a spoken apology when the turn failed
fn respond(state: &AppState, call_id: &str, route: Route, turn: voicebot_core::Result<Turn>) -> Xml {
    let rendered = turn.and_then(|turn| {
        record_turn(route, &turn);
        Ok(state.renderer.render(call_id, &turn)?)
    });

    match rendered {
        Ok(markup) => Xml(markup),
        Err(e) => {
            tracing::error!(call_id = %call_id, route = %route, error = %e, "Webhook turn failed");
            let text = state.flow.engine().catalog().generic_close();
            Xml(state.renderer.apology(&text))
        }
    }
}

/// `POST /voice/answer`
pub async fn answer(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    body: Result<Form<VoiceForm>, FormRejection>,
) -> Result<Xml, ServerError> {
    let call_id = call_id(query)?;
    let form = form(body);
    let turn = state.flow.answer(&call_id, form.answered_by.as_deref()).await;
    Ok(respond(&state, &call_id, Route::Answer, turn))
}

async fn speech_turn(
    state: AppState,
    route: Route,
    query: WebhookQuery,
    body: Result<Form<VoiceForm>, FormRejection>,
) -> Result<Xml, ServerError> {
    let call_id = call_id(query)?;
    let transcript = form(body).speech_result.unwrap_or_default();
    tracing::debug!(call_id = %call_id, route = %route, transcript = %transcript, "Speech result");

    let turn = state.flow.turn(&call_id, route, &transcript).await;
    Ok(respond(&state, &call_id, route, turn))
}

/// `POST /voice/qualify`
pub async fn qualify(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    body: Result<Form<VoiceForm>, FormRejection>,
) -> Result<Xml, ServerError> {
    speech_turn(state, Route::Qualify, query, body).await
}

/// `POST /voice/handle`
pub async fn handle(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    body: Result<Form<VoiceForm>, FormRejection>,
) -> Result<Xml, ServerError> {
    speech_turn(state, Route::Handle, query, body).await
}

/// `POST /voice/schedule`
pub async fn schedule(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    body: Result<Form<VoiceForm>, FormRejection>,
) -> Result<Xml, ServerError> {
    speech_turn(state, Route::Schedule, query, body).await
}
