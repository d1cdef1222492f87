//! End-to-end tests driving the router with a fake carrier

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use parking_lot::Mutex;
use tower::ServiceExt;

use voicebot_config::{DialogueScript, Settings};
use voicebot_core::{CallProvider, Error, OutboundCall, PlacedCall, Stage};
use voicebot_server::{create_router, AppState};

#[derive(Default)]
struct FakeCarrier {
    fail_with: Option<String>,
    placed: Mutex<Vec<OutboundCall>>,
}

#[async_trait]
impl CallProvider for FakeCarrier {
    async fn place_call(&self, call: OutboundCall) -> voicebot_core::Result<PlacedCall> {
        if let Some(message) = &self.fail_with {
            return Err(Error::Provider(message.clone()));
        }
        self.placed.lock().push(call);
        Ok(PlacedCall {
            sid: "CA0001".to_string(),
            status: "queued".to_string(),
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

fn settings(token: Option<&str>) -> Settings {
    let mut settings = Settings::default();
    settings.server.public_base_url = Some("https://bot.example.com".to_string());
    settings.server.auth.webhook_token = token.map(str::to_string);
    settings
}

fn app_with(settings: Settings, carrier: Arc<FakeCarrier>) -> (Router, AppState) {
    let state = AppState::new(settings, &DialogueScript::default(), carrier).unwrap();
    (create_router(state.clone()), state)
}

fn app(token: Option<&str>) -> (Router, AppState, Arc<FakeCarrier>) {
    let carrier = Arc::new(FakeCarrier::default());
    let (router, state) = app_with(settings(token), carrier.clone());
    (router, state, carrier)
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn create_call_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/call")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn webhook(route: &str, call_id: &str, token: Option<&str>, form: &str) -> Request<Body> {
    let mut uri = format!("/voice/{}?callId={}", route, call_id);
    if let Some(token) = token {
        uri.push_str(&format!("&token={}", token));
    }
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

async fn start_call(router: &Router) -> String {
    let response = send(
        router,
        create_call_request(serde_json::json!({
            "companyName": "Gostilna Pri Lipi",
            "phoneNumber": "+386 41 555 123"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["callId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (router, _, _) = app(None);
    let response = send(&router, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({ "ok": true }));
}

#[tokio::test]
async fn test_security_headers() {
    let (router, _, _) = app(None);
    let response = send(&router, Request::get("/health").body(Body::empty()).unwrap()).await;
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["referrer-policy"], "no-referrer");
}

#[tokio::test]
async fn test_ready_reports_store_size() {
    let (router, _, _) = app(None);
    start_call(&router).await;
    let response = send(&router, Request::get("/ready").body(Body::empty()).unwrap()).await;
    let json = body_json(response).await;
    assert_eq!(json["calls"], 1);
    assert_eq!(json["carrier"], "fake");
}

#[tokio::test]
async fn test_create_call() {
    let (router, state, carrier) = app(Some("s3cret"));
    let response = send(
        &router,
        create_call_request(serde_json::json!({
            "companyName": "Gostilna Pri Lipi",
            "phoneNumber": "+386 41 555 123"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["sid"], "CA0001");
    assert_eq!(json["status"], "queued");
    let call_id = json["callId"].as_str().unwrap();

    let stored = state.flow.get(call_id).await.unwrap().unwrap();
    assert_eq!(stored.stage, Stage::Intro);
    assert_eq!(stored.attempts, 0);
    assert_eq!(stored.company_name, "Gostilna Pri Lipi");

    let placed = carrier.placed.lock();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].to, "+386 41 555 123");
    assert_eq!(
        placed[0].answer_url,
        format!("https://bot.example.com/voice/answer?callId={}&token=s3cret", call_id)
    );
    assert!(placed[0].machine_detection);
    assert_eq!(placed[0].machine_detection_timeout_secs, 6);
}

#[tokio::test]
async fn test_create_call_validation() {
    let (router, state, carrier) = app(None);
    let response = send(
        &router,
        create_call_request(serde_json::json!({
            "companyName": "Gostilna Pri Lipi",
            "phoneNumber": "abc"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["field"], "phoneNumber");
    assert!(json["error"].as_str().unwrap().starts_with("phoneNumber"));

    let response = send(
        &router,
        create_call_request(serde_json::json!({ "companyName": "A", "phoneNumber": "+38641555123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "companyName");

    assert_eq!(state.call_count(), 0);
    assert!(carrier.placed.lock().is_empty());
}

#[tokio::test]
async fn test_create_call_malformed_body() {
    let (router, _, _) = app(None);
    let request = Request::builder()
        .method("POST")
        .uri("/api/call")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "body");
}

#[tokio::test]
async fn test_create_call_provider_failure() {
    let carrier = Arc::new(FakeCarrier {
        fail_with: Some("The 'To' number is not a valid phone number.".to_string()),
        ..FakeCarrier::default()
    });
    let (router, state) = app_with(settings(None), carrier);

    let response = send(
        &router,
        create_call_request(serde_json::json!({
            "companyName": "Gostilna Pri Lipi",
            "phoneNumber": "+38641555123"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to create call");
    assert_eq!(json["details"], "The 'To' number is not a valid phone number.");

    // State was persisted before the carrier failed
    assert_eq!(state.call_count(), 1);
}

#[tokio::test]
async fn test_create_call_without_public_base_url() {
    let carrier = Arc::new(FakeCarrier::default());
    let (router, _) = app_with(Settings::default(), carrier.clone());
    let response = send(
        &router,
        create_call_request(serde_json::json!({
            "companyName": "Gostilna Pri Lipi",
            "phoneNumber": "+38641555123"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Failed to create call");
    assert!(carrier.placed.lock().is_empty());
}

#[tokio::test]
async fn test_get_call() {
    let (router, _, _) = app(None);
    let call_id = start_call(&router).await;

    let response = send(
        &router,
        Request::get(format!("/api/calls/{}", call_id)).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["callId"], call_id.as_str());
    assert_eq!(json["stage"], "intro");
    assert_eq!(json["companyName"], "Gostilna Pri Lipi");

    let response = send(&router, Request::get("/api/calls/nope").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_requires_token() {
    let (router, _, _) = app(Some("s3cret"));
    let call_id = start_call(&router).await;

    let response = send(&router, webhook("answer", &call_id, None, "")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await, "Unauthorized");

    let response = send(&router, webhook("answer", &call_id, Some("wrong"), "")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&router, webhook("answer", &call_id, Some("s3cret"), "")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_token_header() {
    let (router, _, _) = app(Some("s3cret"));
    let call_id = start_call(&router).await;

    let mut request = webhook("answer", &call_id, None, "");
    request
        .headers_mut()
        .insert("X-Webhook-Token", "s3cret".parse().unwrap());
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_answer_markup() {
    let (router, _, _) = app(Some("s3cret"));
    let call_id = start_call(&router).await;

    let response = send(&router, webhook("answer", &call_id, Some("s3cret"), "AnsweredBy=human")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/xml");

    let xml = body_string(response).await;
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#));
    assert!(xml.contains("Gostilna Pri Lipi"));
    assert!(xml.contains(r#"<Say language="sl-SI" voice="Polly.Joanna">"#));
    assert!(xml.contains(&format!(
        r#"action="https://bot.example.com/voice/qualify?callId={}&amp;token=s3cret""#,
        call_id
    )));
    assert!(xml.contains(r#"speechModel="phone_call""#));
}

#[tokio::test]
async fn test_answering_machine_hangs_up() {
    let (router, state, _) = app(None);
    let call_id = start_call(&router).await;

    let response = send(&router, webhook("answer", &call_id, None, "AnsweredBy=machine_start")).await;
    let xml = body_string(response).await;
    assert!(xml.ends_with("<Hangup /></Response>"));
    assert_eq!(state.flow.get(&call_id).await.unwrap().unwrap().stage, Stage::Wrap);
}

#[tokio::test]
async fn test_conversation_to_booking() {
    let (router, state, _) = app(None);
    let call_id = start_call(&router).await;

    send(&router, webhook("answer", &call_id, None, "")).await;
    send(&router, webhook("qualify", &call_id, None, "SpeechResult=")).await;

    let xml = body_string(
        send(
            &router,
            webhook("qualify", &call_id, None, "SpeechResult=nimamo+spletne+strani"),
        )
        .await,
    )
    .await;
    assert!(xml.contains("/voice/handle?callId="));
    assert_eq!(state.flow.get(&call_id).await.unwrap().unwrap().stage, Stage::PitchNoSite);

    let xml = body_string(
        send(&router, webhook("handle", &call_id, None, "SpeechResult=ja%2C+zanima+me")).await,
    )
    .await;
    assert!(xml.contains("/voice/schedule?callId="));

    let xml = body_string(
        send(&router, webhook("schedule", &call_id, None, "SpeechResult=jutri+dopoldne")).await,
    )
    .await;
    assert!(xml.ends_with("<Hangup /></Response>"));

    let stored = state.flow.get(&call_id).await.unwrap().unwrap();
    assert_eq!(stored.stage, Stage::Wrap);
    assert_eq!(stored.attempts, 1);
}

#[tokio::test]
async fn test_repeated_refusal_wraps_up() {
    let (router, state, _) = app(None);
    let call_id = start_call(&router).await;

    send(&router, webhook("answer", &call_id, None, "")).await;
    send(&router, webhook("qualify", &call_id, None, "")).await;
    send(&router, webhook("qualify", &call_id, None, "SpeechResult=imamo+stran")).await;

    let xml = body_string(send(&router, webhook("handle", &call_id, None, "SpeechResult=ne%2C+hvala")).await).await;
    assert!(xml.contains("<Gather"));

    let xml = body_string(send(&router, webhook("handle", &call_id, None, "SpeechResult=ne%2C+hvala")).await).await;
    assert!(xml.ends_with("<Hangup /></Response>"));
    assert_eq!(state.flow.get(&call_id).await.unwrap().unwrap().stage, Stage::Wrap);
}

#[tokio::test]
async fn test_silent_schedule_ends_the_call() {
    let (router, state, _) = app(None);
    let call_id = start_call(&router).await;

    send(&router, webhook("answer", &call_id, None, "")).await;
    send(&router, webhook("qualify", &call_id, None, "SpeechResult=imamo+stran")).await;
    let xml = body_string(send(&router, webhook("handle", &call_id, None, "SpeechResult=ja")).await).await;
    assert!(xml.contains("/voice/schedule?callId="));

    for _ in 0..voicebot_agent::MAX_SCHEDULE_RETRIES {
        let xml = body_string(send(&router, webhook("schedule", &call_id, None, "SpeechResult=")).await).await;
        assert!(xml.ends_with("</Gather></Response>"));
        assert!(!xml.contains("<Redirect"));
    }

    let xml = body_string(send(&router, webhook("schedule", &call_id, None, "")).await).await;
    assert!(xml.ends_with("<Hangup /></Response>"));
    assert!(!xml.contains("<Gather"));
    assert_eq!(state.flow.get(&call_id).await.unwrap().unwrap().stage, Stage::Wrap);
}

#[tokio::test]
async fn test_unknown_call_recovers_on_handle() {
    let (router, state, _) = app(None);
    let response = send(&router, webhook("handle", "lost-call", None, "SpeechResult=ja")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_string(response).await;
    assert!(xml.contains("/voice/schedule?callId=lost-call"));

    let stored = state.flow.get("lost-call").await.unwrap().unwrap();
    assert!(stored.recovered);
    assert_eq!(stored.stage, Stage::Schedule);
}

#[tokio::test]
async fn test_unknown_call_answer_not_stored() {
    let (router, state, _) = app(None);
    let response = send(&router, webhook("answer", "lost-call", None, "")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("/voice/qualify?callId=lost-call"));
    assert!(state.flow.get("lost-call").await.unwrap().is_none());
}

#[tokio::test]
async fn test_webhook_missing_call_id() {
    let (router, _, _) = app(None);
    let request = Request::builder()
        .method("POST")
        .uri("/voice/qualify")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "callId");
}
