//! Twilio REST client
//!
//! Places outbound calls through `POST /Accounts/{sid}/Calls.json` with the
//! account's basic-auth credentials.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use voicebot_config::TelephonyConfig;
use voicebot_core::{CallProvider, OutboundCall, PlacedCall};

use crate::TelephonyError;

/// Call resource returned on success
#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Error body returned on rejection
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
struct Credentials {
    account_sid: String,
    auth_token: String,
    caller_number: String,
}

/// Carrier client
#[derive(Debug, Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    api_base_url: String,
    credentials: Option<Credentials>,
}

impl TwilioClient {
    /// Build a client from configuration
    ///
    /// Missing credentials are not an error here; `place_call` reports them
    /// so the server can still start and answer webhooks.
    pub fn new(config: &TelephonyConfig) -> Result<Self, TelephonyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let credentials = if config.is_configured() {
            Some(Credentials {
                account_sid: config.account_sid.clone().unwrap_or_default(),
                auth_token: config.auth_token.clone().unwrap_or_default(),
                caller_number: config.caller_number.clone().unwrap_or_default(),
            })
        } else {
            None
        };

        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn credentials(&self) -> Result<&Credentials, TelephonyError> {
        self.credentials
            .as_ref()
            .ok_or(TelephonyError::NotConfigured("account SID, auth token or caller number"))
    }

    fn calls_endpoint(&self, account_sid: &str) -> String {
        format!("{}/Accounts/{}/Calls.json", self.api_base_url, account_sid)
    }

    /// Form body for a call-creation request
    pub fn form_params(call: &OutboundCall, from: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("To", call.to.clone()),
            ("From", from.to_string()),
            ("Url", call.answer_url.clone()),
            ("Method", "POST".to_string()),
        ];
        if call.machine_detection {
            params.push(("MachineDetection", "Enable".to_string()));
            params.push((
                "MachineDetectionTimeout",
                call.machine_detection_timeout_secs.to_string(),
            ));
        }
        params
    }

    async fn create_call(&self, call: &OutboundCall) -> Result<PlacedCall, TelephonyError> {
        let credentials = self.credentials()?;
        let params = Self::form_params(call, &credentials.caller_number);

        let response = self
            .http
            .post(self.calls_endpoint(&credentials.account_sid))
            .basic_auth(&credentials.account_sid, Some(&credentials.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiError>(&body) {
                Ok(ApiError {
                    message: Some(message),
                    code,
                }) => match code {
                    Some(code) => format!("{} (code {})", message, code),
                    None => message,
                },
                _ if body.is_empty() => status.to_string(),
                _ => body,
            };
            tracing::error!(status = status.as_u16(), error = %message, "Carrier rejected call");
            return Err(TelephonyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let resource: CallResource = response.json().await?;
        tracing::info!(sid = %resource.sid, status = ?resource.status, "Outbound call created");
        Ok(PlacedCall {
            sid: resource.sid,
            status: resource.status.unwrap_or_else(|| "queued".to_string()),
        })
    }
}

#[async_trait]
impl CallProvider for TwilioClient {
    async fn place_call(&self, call: OutboundCall) -> voicebot_core::Result<PlacedCall> {
        Ok(self.create_call(&call).await?)
    }

    fn name(&self) -> &str {
        "twilio"
    }
}
