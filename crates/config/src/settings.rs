//! Main settings module

use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Deployment environment name
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Carrier account configuration
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Spoken language, voice and speech recognition
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Call state store
    #[serde(default)]
    pub store: StoreConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Optional YAML dialogue script replacing the built-in one
    #[serde(default)]
    pub script_path: Option<String>,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            telephony: TelephonyConfig::default(),
            voice: VoiceConfig::default(),
            store: StoreConfig::default(),
            observability: ObservabilityConfig::default(),
            script_path: None,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    ///
    /// Hard errors for values the server cannot run with; warnings for
    /// values that only break the carrier round trip.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }

        if self.store.ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store.ttl_seconds".to_string(),
                message: "TTL must be at least one second".to_string(),
            });
        }

        if self.store.max_calls == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store.max_calls".to_string(),
                message: "store must hold at least one call".to_string(),
            });
        }

        if let Some(base) = &self.server.public_base_url {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "server.public_base_url".to_string(),
                    message: format!("expected an http(s) URL, got '{}'", base),
                });
            }
        }

        let mut warnings = Vec::new();
        if self.server.public_base_url.is_none() {
            warnings.push("PUBLIC_BASE_URL is not set. Webhooks will not be reachable by the carrier.");
        }
        if !self.telephony.is_configured() {
            warnings.push("Carrier credentials or caller number missing. Outbound calls will fail.");
        }
        if self.server.auth.webhook_token.is_none() {
            warnings.push("WEBHOOK_AUTH_TOKEN is not set. Voice webhooks are unauthenticated.");
        }
        for warning in warnings {
            tracing::warn!("{}", warning);
        }

        Ok(())
    }

    /// Public base URL without a trailing slash
    pub fn public_base_url(&self) -> &str {
        self.server
            .public_base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or("")
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Publicly reachable base URL the carrier calls back on
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Webhook authentication
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Webhook authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Shared secret carried as `token` query parameter or `X-Webhook-Token`
    /// header. Authentication is off when unset.
    #[serde(default)]
    pub webhook_token: Option<String>,
}

impl AuthConfig {
    /// Configured, non-empty secret
    pub fn secret(&self) -> Option<&str> {
        self.webhook_token.as_deref().filter(|t| !t.is_empty())
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
            timeout_seconds: default_timeout(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
            auth: AuthConfig::default(),
        }
    }
}

/// Carrier account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// Account SID
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Account auth token
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Caller number presented to the callee
    #[serde(default)]
    pub caller_number: Option<String>,

    /// REST API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Enable answering-machine detection
    #[serde(default = "default_true")]
    pub machine_detection: bool,

    /// Answering-machine detection timeout (seconds)
    #[serde(default = "default_machine_detection_timeout")]
    pub machine_detection_timeout_secs: u32,

    /// Timeout for the call-placement request (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}
fn default_machine_detection_timeout() -> u32 {
    6
}
fn default_request_timeout() -> u64 {
    15
}

impl TelephonyConfig {
    /// Credentials and caller number are all present
    pub fn is_configured(&self) -> bool {
        [&self.account_sid, &self.auth_token, &self.caller_number]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            caller_number: None,
            api_base_url: default_api_base_url(),
            machine_detection: true,
            machine_detection_timeout_secs: default_machine_detection_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Spoken language, voice and speech recognition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Language tag for speech synthesis
    #[serde(default = "default_language")]
    pub language: String,

    /// Synthesis voice name
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Speech-recognition hint phrases, comma separated
    #[serde(default)]
    pub asr_hints: String,

    /// Seconds to wait for the callee to start speaking
    #[serde(default = "default_gather_timeout")]
    pub gather_timeout_secs: u32,

    /// End-of-speech detection, `auto` or seconds
    #[serde(default = "default_speech_timeout")]
    pub speech_timeout: String,
}

fn default_language() -> String {
    "sl-SI".to_string()
}
fn default_voice() -> String {
    "Polly.Joanna".to_string()
}
fn default_gather_timeout() -> u32 {
    6
}
fn default_speech_timeout() -> String {
    "auto".to_string()
}

impl VoiceConfig {
    /// Hints, or `None` when no hint is configured
    pub fn hints(&self) -> Option<&str> {
        let hints = self.asr_hints.trim();
        (!hints.is_empty()).then_some(hints)
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            voice: default_voice(),
            asr_hints: String::new(),
            gather_timeout_secs: default_gather_timeout(),
            speech_timeout: default_speech_timeout(),
        }
    }
}

/// Call state store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Seconds a call is kept after its last webhook
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,

    /// Seconds between eviction sweeps
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,

    /// Maximum stored calls
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,
}

fn default_ttl() -> u64 {
    3600 // 1 hour
}
fn default_cleanup_interval() -> u64 {
    300 // 5 minutes
}
fn default_max_calls() -> usize {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
            max_calls: default_max_calls(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable the Prometheus endpoint
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Flat environment variables and the settings key each one fills
const LEGACY_ENV: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("PUBLIC_BASE_URL", "server.public_base_url"),
    ("WEBHOOK_AUTH_TOKEN", "server.auth.webhook_token"),
    ("TWILIO_ACCOUNT_SID", "telephony.account_sid"),
    ("TWILIO_AUTH_TOKEN", "telephony.auth_token"),
    ("TWILIO_CALLER_NUMBER", "telephony.caller_number"),
    ("TWILIO_LANGUAGE", "voice.language"),
    ("TWILIO_VOICE", "voice.voice"),
    ("ASR_HINTS", "voice.asr_hints"),
];

/// Overlay the flat variables onto the builder; empty values are ignored
fn apply_legacy_env<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in LEGACY_ENV {
        let value = lookup(var).filter(|v| !v.is_empty());
        builder = builder.set_override_option(*key, value)?;
    }
    Ok(builder)
}

fn build_settings<F>(env: Option<&str>, lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("VOICEBOT")
            .separator("__")
            .try_parsing(true),
    );

    builder = apply_legacy_env(builder, lookup)?;

    let config = builder.build()?;
    let mut settings: Settings = config.try_deserialize()?;
    if let Some(env_name) = env {
        settings.environment = env_name.to_string();
    }

    settings.validate()?;

    Ok(settings)
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Flat variables (`PUBLIC_BASE_URL`, `TWILIO_ACCOUNT_SID`, ...)
/// 2. Environment variables (`VOICEBOT__SECTION__KEY`)
/// 3. config/{env}.yaml (if env specified)
/// 4. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    build_settings(env, |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.voice.language, "sl-SI");
        assert_eq!(settings.voice.voice, "Polly.Joanna");
        assert_eq!(settings.telephony.machine_detection_timeout_secs, 6);
        assert!(settings.telephony.machine_detection);
        assert!(settings.server.auth.secret().is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.store.ttl_seconds = 0;
        assert!(settings.validate().is_err());

        settings.store.ttl_seconds = 60;
        settings.server.public_base_url = Some("ftp://example.com".into());
        assert!(settings.validate().is_err());

        settings.server.public_base_url = Some("https://bot.example.com/".into());
        assert!(settings.validate().is_ok());
        assert_eq!(settings.public_base_url(), "https://bot.example.com");
    }

    #[test]
    fn test_legacy_env_overrides() {
        let lookup = lookup_from(&[
            ("PORT", "8081"),
            ("PUBLIC_BASE_URL", "https://bot.example.com"),
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_CALLER_NUMBER", "+38640111222"),
            ("WEBHOOK_AUTH_TOKEN", "hook"),
            ("ASR_HINTS", "spletna stran, termin"),
            ("TWILIO_VOICE", ""),
        ]);
        let settings = build_settings(None, lookup).unwrap();
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.public_base_url(), "https://bot.example.com");
        assert!(settings.telephony.is_configured());
        assert_eq!(settings.server.auth.secret(), Some("hook"));
        assert_eq!(settings.voice.hints(), Some("spletna stran, termin"));
        // Empty values fall back to defaults
        assert_eq!(settings.voice.voice, "Polly.Joanna");
    }

    #[test]
    fn test_invalid_env_is_an_error() {
        let lookup = lookup_from(&[
            ("PUBLIC_BASE_URL", "bot.example.com"),
            ("WEBHOOK_AUTH_TOKEN", "s3cret"),
        ]);
        match build_settings(None, lookup) {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "server.public_base_url"),
            other => panic!("expected an invalid base URL, got {:?}", other.map(|s| s.server.port)),
        }
    }

    #[test]
    fn test_empty_secret_disables_auth() {
        let auth = AuthConfig {
            webhook_token: Some(String::new()),
        };
        assert!(auth.secret().is_none());
    }

    #[test]
    fn test_hints_trimmed() {
        let mut voice = VoiceConfig::default();
        assert!(voice.hints().is_none());
        voice.asr_hints = "   ".into();
        assert!(voice.hints().is_none());
    }
}
