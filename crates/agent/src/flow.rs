//! Call flow
//!
//! Loads call state, runs one engine turn and writes the state back. Owns
//! the recovery policy for webhooks that reference a call the store does
//! not know (e.g. after a restart wiped memory).

use std::sync::Arc;

use voicebot_core::{
    CallProvider, CallState, CallStore, InitiateCallRequest, OutboundCall, PlacedCall, Result, Stage,
    ValidCallRequest,
};

use crate::engine::{DialogueEngine, Route, Turn};

/// How to rebuild state for an unknown call id
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    /// Company name spoken in place of the real one
    pub company_name: String,
}

impl RecoveryPolicy {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
        }
    }

    /// Stage the conversation most plausibly is in, given the webhook hit
    pub fn stage_for(route: Route) -> Stage {
        match route {
            Route::Answer | Route::Qualify => Stage::Intro,
            Route::Handle => Stage::PitchUpgrade,
            Route::Schedule => Stage::Schedule,
        }
    }

    /// Default state for `call_id` arriving on `route`
    pub fn recover(&self, call_id: &str, route: Route) -> CallState {
        CallState::recovered(call_id, self.company_name.clone(), Self::stage_for(route))
    }
}

/// Carrier `AnsweredBy` values that mean no human picked up
pub fn is_machine_answer(answered_by: &str) -> bool {
    let answered_by = answered_by.trim().to_ascii_lowercase();
    answered_by.starts_with("machine") || answered_by == "fax"
}

/// A call that the carrier accepted
#[derive(Debug, Clone)]
pub struct StartedCall {
    pub state: CallState,
    pub placed: PlacedCall,
}

/// Store + engine, one webhook turn at a time
#[derive(Clone)]
pub struct CallFlow {
    store: Arc<dyn CallStore>,
    engine: Arc<DialogueEngine>,
    recovery: RecoveryPolicy,
}

impl CallFlow {
    pub fn new(store: Arc<dyn CallStore>, engine: Arc<DialogueEngine>, recovery: RecoveryPolicy) -> Self {
        Self {
            store,
            engine,
            recovery,
        }
    }

    pub fn store(&self) -> &Arc<dyn CallStore> {
        &self.store
    }

    pub fn engine(&self) -> &DialogueEngine {
        &self.engine
    }

    /// Create and persist the state for a call about to be placed
    pub async fn create_call(&self, request: &ValidCallRequest) -> Result<CallState> {
        let state = CallState::create(request.company_name.clone());
        self.store.put(state.clone()).await?;
        tracing::info!(
            call_id = %state.call_id,
            company = %state.company_name,
            "Created call state"
        );
        Ok(state)
    }

    /// Validate, persist and hand the call to the carrier
    ///
    /// `dial` builds the carrier request for the freshly created state. When
    /// the carrier fails the state stays in the store until TTL eviction.
    pub async fn start_call<F>(
        &self,
        request: InitiateCallRequest,
        provider: &dyn CallProvider,
        dial: F,
    ) -> Result<StartedCall>
    where
        F: FnOnce(&CallState, &ValidCallRequest) -> Result<OutboundCall>,
    {
        let request = request.validate()?;
        let state = self.create_call(&request).await?;
        let outbound = dial(&state, &request)?;

        match provider.place_call(outbound).await {
            Ok(placed) => {
                tracing::info!(
                    call_id = %state.call_id,
                    provider = provider.name(),
                    sid = %placed.sid,
                    status = %placed.status,
                    "Call placed"
                );
                Ok(StartedCall { state, placed })
            }
            Err(e) => {
                tracing::error!(
                    call_id = %state.call_id,
                    provider = provider.name(),
                    error = %e,
                    "Failed to place call"
                );
                Err(e)
            }
        }
    }

    /// Look up a call without touching it
    pub async fn get(&self, call_id: &str) -> Result<Option<CallState>> {
        self.store.get(call_id).await
    }

    /// Carrier connected the call
    ///
    /// Unknown calls get the anonymous opener and nothing is persisted; the
    /// qualify webhook recovers them.
    pub async fn answer(&self, call_id: &str, answered_by: Option<&str>) -> Result<Turn> {
        let machine = answered_by.is_some_and(is_machine_answer);

        let Some(mut state) = self.store.get(call_id).await? else {
            tracing::warn!(call_id = %call_id, "Answer webhook for unknown call");
            if machine {
                let mut state = self.recovery.recover(call_id, Route::Answer);
                return Ok(self.engine.machine_answered(&mut state));
            }
            return Ok(self.engine.answer_unknown());
        };

        let turn = if machine {
            tracing::info!(
                call_id = %call_id,
                answered_by = answered_by.unwrap_or_default(),
                "Answering machine detected"
            );
            self.engine.machine_answered(&mut state)
        } else {
            self.engine.answer(&mut state)
        };
        self.store.put(state).await?;
        Ok(turn)
    }

    /// Run one conversation turn for a speech webhook
    pub async fn turn(&self, call_id: &str, route: Route, transcript: &str) -> Result<Turn> {
        let mut state = match self.store.get(call_id).await? {
            Some(state) => state,
            None => {
                let state = self.recovery.recover(call_id, route);
                tracing::warn!(
                    call_id = %call_id,
                    route = %route,
                    stage = %state.stage,
                    "Unknown call, continuing from default state"
                );
                state
            }
        };

        let turn = self.engine.advance(&mut state, transcript);
        self.store.put(state).await?;
        Ok(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use voicebot_config::DialogueScript;

    use crate::engine::NextStep;
    use crate::store::InMemoryCallStore;

    fn flow() -> CallFlow {
        let store: Arc<dyn CallStore> =
            Arc::new(InMemoryCallStore::new(100, Duration::from_secs(60)));
        let engine = Arc::new(DialogueEngine::new(&DialogueScript::default()).unwrap());
        CallFlow::new(store, engine, RecoveryPolicy::new("podjetje"))
    }

    fn request() -> ValidCallRequest {
        ValidCallRequest {
            company_name: "Pekarna Zrno".to_string(),
            phone_number: "+38641000000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_call_persists_intro_state() {
        let flow = flow();
        let state = flow.create_call(&request()).await.unwrap();
        assert_eq!(flow.store().len(), 1);

        let stored = flow.get(&state.call_id).await.unwrap().unwrap();
        assert_eq!(stored.stage, Stage::Intro);
        assert_eq!(stored.attempts, 0);
        assert!(stored.objections.is_empty());
        assert_eq!(stored.company_name, "Pekarna Zrno");
    }

    #[tokio::test]
    async fn test_full_conversation_to_schedule() {
        let flow = flow();
        let id = flow.create_call(&request()).await.unwrap().call_id;

        let t = flow.answer(&id, Some("human")).await.unwrap();
        assert_eq!(t.next, NextStep::Listen(Route::Qualify));

        let t = flow.turn(&id, Route::Qualify, "").await.unwrap();
        assert_eq!(t.to, Stage::Qualify);

        let t = flow.turn(&id, Route::Qualify, "nimamo spletne strani").await.unwrap();
        assert_eq!(t.to, Stage::PitchNoSite);

        let t = flow.turn(&id, Route::Handle, "predrago").await.unwrap();
        assert_eq!(t.to, Stage::PitchNoSite);

        let t = flow.turn(&id, Route::Handle, "ja, zanima me").await.unwrap();
        assert_eq!(t.next, NextStep::Listen(Route::Schedule));

        let t = flow.turn(&id, Route::Schedule, "v torek popoldne").await.unwrap();
        assert!(t.is_hangup());

        let stored = flow.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.stage, Stage::Wrap);
        assert_eq!(stored.attempts, 2);
        assert_eq!(
            stored.objections,
            vec![voicebot_core::ObjectionKind::Price, voicebot_core::ObjectionKind::Generic]
        );
    }

    #[tokio::test]
    async fn test_unknown_call_recovers() {
        let flow = flow();
        let t = flow.turn("ghost", Route::Handle, "ja").await.unwrap();
        assert_eq!(t.from, Stage::PitchUpgrade);
        assert_eq!(t.to, Stage::Schedule);

        let stored = flow.get("ghost").await.unwrap().unwrap();
        assert!(stored.recovered);
        assert_eq!(stored.company_name, "podjetje");
    }

    #[tokio::test]
    async fn test_unknown_answer_not_persisted() {
        let flow = flow();
        let t = flow.answer("ghost", None).await.unwrap();
        assert_eq!(t.next, NextStep::Listen(Route::Qualify));
        assert_eq!(t.speech, flow.engine().catalog().greeting_unknown());
        assert!(flow.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_machine_answer_wraps() {
        let flow = flow();
        let id = flow.create_call(&request()).await.unwrap().call_id;
        let t = flow.answer(&id, Some("machine_start")).await.unwrap();
        assert!(t.is_hangup());
        assert_eq!(flow.get(&id).await.unwrap().unwrap().stage, Stage::Wrap);
    }

    struct FakeProvider {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl CallProvider for FakeProvider {
        async fn place_call(&self, call: OutboundCall) -> Result<PlacedCall> {
            if self.fail {
                return Err(voicebot_core::Error::Provider("Authenticate".to_string()));
            }
            assert!(call.answer_url.contains("callId="));
            Ok(PlacedCall {
                sid: "CA1".to_string(),
                status: "queued".to_string(),
            })
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn dial(state: &CallState, request: &ValidCallRequest) -> Result<OutboundCall> {
        Ok(OutboundCall {
            to: request.phone_number.clone(),
            answer_url: format!("https://bot.example.com/voice/answer?callId={}", state.call_id),
            machine_detection: true,
            machine_detection_timeout_secs: 6,
        })
    }

    #[tokio::test]
    async fn test_start_call() {
        let flow = flow();
        let started = flow
            .start_call(
                InitiateCallRequest::new("Frizerski salon Lana", "+386 41 123 456"),
                &FakeProvider { fail: false },
                dial,
            )
            .await
            .unwrap();
        assert_eq!(started.placed.sid, "CA1");
        assert_eq!(started.state.stage, Stage::Intro);
        assert!(flow.get(&started.state.call_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_start_call_validation_persists_nothing() {
        let flow = flow();
        let err = flow
            .start_call(
                InitiateCallRequest::new("X", "+38641000000"),
                &FakeProvider { fail: false },
                dial,
            )
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("companyName"));
        assert!(flow.store().is_empty());
    }

    #[tokio::test]
    async fn test_start_call_provider_failure_keeps_state() {
        let flow = flow();
        let err = flow
            .start_call(
                InitiateCallRequest::new("Frizerski salon Lana", "+38641000000"),
                &FakeProvider { fail: true },
                dial,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, voicebot_core::Error::Provider(_)));
        assert_eq!(flow.store().len(), 1);
    }

    #[test]
    fn test_recovery_stages() {
        assert_eq!(RecoveryPolicy::stage_for(Route::Qualify), Stage::Intro);
        assert_eq!(RecoveryPolicy::stage_for(Route::Handle), Stage::PitchUpgrade);
        assert_eq!(RecoveryPolicy::stage_for(Route::Schedule), Stage::Schedule);
    }

    #[test]
    fn test_machine_answer_values() {
        assert!(is_machine_answer("machine_end_beep"));
        assert!(is_machine_answer("fax"));
        assert!(!is_machine_answer("human"));
        assert!(!is_machine_answer("unknown"));
    }
}
