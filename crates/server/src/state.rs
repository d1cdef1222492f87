//! Application State

use std::sync::Arc;
use std::time::Duration;

use voicebot_agent::{CallFlow, DialogueEngine, InMemoryCallStore, RecoveryPolicy};
use voicebot_config::{DialogueScript, Settings};
use voicebot_core::{CallProvider, CallStore};
use voicebot_telephony::{TurnRenderer, WebhookUrls};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Settings, fixed for the process lifetime
    pub config: Arc<Settings>,
    /// Store + engine
    pub flow: CallFlow,
    /// Carrier used to place calls
    pub provider: Arc<dyn CallProvider>,
    /// Engine turn to voice markup
    pub renderer: TurnRenderer,
    /// Concrete store, kept for the cleanup task and readiness
    pub store: Arc<InMemoryCallStore>,
}

impl AppState {
    /// Build state from settings, a dialogue script and a carrier
    pub fn new(
        config: Settings,
        script: &DialogueScript,
        provider: Arc<dyn CallProvider>,
    ) -> voicebot_core::Result<Self> {
        let store = Arc::new(InMemoryCallStore::new(
            config.store.max_calls,
            Duration::from_secs(config.store.ttl_seconds),
        ));
        let engine = Arc::new(DialogueEngine::new(script)?);
        let recovery = RecoveryPolicy::new(script.fallback_company_name.clone());
        let flow = CallFlow::new(store.clone() as Arc<dyn CallStore>, engine, recovery);

        let urls = WebhookUrls::new(
            config.public_base_url(),
            config.server.auth.secret().map(str::to_string),
        );
        let renderer = TurnRenderer::new(urls, config.voice.clone());

        Ok(Self {
            config: Arc::new(config),
            flow,
            provider,
            renderer,
            store,
        })
    }

    pub fn urls(&self) -> &WebhookUrls {
        self.renderer.urls()
    }

    /// Stored call count
    pub fn call_count(&self) -> usize {
        self.store.len()
    }
}
