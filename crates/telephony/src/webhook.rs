//! Webhook URLs and turn rendering
//!
//! Every URL handed to the carrier carries the call id and, when webhook
//! auth is on, the shared token. Without a public base URL the gather
//! actions fall back to relative paths, which the carrier resolves against
//! the request it just made.

use reqwest::Url;
use voicebot_agent::{NextStep, Route, Turn};
use voicebot_config::VoiceConfig;

use crate::twiml::{GatherOptions, VoiceResponse};
use crate::TelephonyError;

const RELATIVE_BASE: &str = "http://relative.invalid";

/// Builds `{base}/voice/{route}?callId=..&token=..`
#[derive(Debug, Clone, Default)]
pub struct WebhookUrls {
    base: String,
    token: Option<String>,
}

impl WebhookUrls {
    pub fn new(base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn has_base(&self) -> bool {
        !self.base.is_empty()
    }

    /// URL for `route`, relative when no base is configured
    pub fn url(&self, route: Route, call_id: &str) -> Result<String, TelephonyError> {
        if !self.has_base() {
            let url = self.build(RELATIVE_BASE, route, call_id)?;
            return Ok(match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            });
        }
        Ok(self.build(&self.base, route, call_id)?.into())
    }

    /// Absolute answer URL given to the carrier when placing a call
    pub fn answer_url(&self, call_id: &str) -> Result<String, TelephonyError> {
        if !self.has_base() {
            return Err(TelephonyError::NotConfigured("public base URL"));
        }
        self.url(Route::Answer, call_id)
    }

    fn build(&self, base: &str, route: Route, call_id: &str) -> Result<Url, TelephonyError> {
        let endpoint = format!("{}/voice/{}", base, route.as_str());
        let mut params = vec![("callId", call_id)];
        if let Some(token) = &self.token {
            params.push(("token", token.as_str()));
        }
        Url::parse_with_params(&endpoint, &params)
            .map_err(|e| TelephonyError::InvalidUrl(format!("{}: {}", endpoint, e)))
    }
}

/// Turns engine output into voice markup
#[derive(Debug, Clone)]
pub struct TurnRenderer {
    urls: WebhookUrls,
    voice: VoiceConfig,
}

impl TurnRenderer {
    pub fn new(urls: WebhookUrls, voice: VoiceConfig) -> Self {
        Self { urls, voice }
    }

    pub fn urls(&self) -> &WebhookUrls {
        &self.urls
    }

    /// Speak the turn, then listen or hang up
    ///
    /// Nothing follows the gather, so a caller who stays silent runs off the
    /// end of the document and the carrier ends the call.
    pub fn render(&self, call_id: &str, turn: &Turn) -> Result<VoiceResponse, TelephonyError> {
        let response = VoiceResponse::new().say(&turn.speech, &self.voice.language, &self.voice.voice);

        match turn.next {
            NextStep::Hangup => Ok(response.hangup()),
            NextStep::Listen(route) => {
                let action = self.urls.url(route, call_id)?;
                let options = GatherOptions::new(action)
                    .with_timeout(self.voice.gather_timeout_secs)
                    .with_speech_timeout(&self.voice.speech_timeout)
                    .with_hints(self.voice.hints().map(str::to_string));
                Ok(response.gather(options))
            }
        }
    }

    /// Markup for a request that cannot be served
    pub fn apology(&self, text: &str) -> VoiceResponse {
        VoiceResponse::new()
            .say(text, &self.voice.language, &self.voice.voice)
            .hangup()
    }
}
