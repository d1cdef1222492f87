//! Voicebot Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use voicebot_config::{load_settings, DialogueScript, Settings};
use voicebot_core::CallProvider;
use voicebot_server::{create_router, init_metrics, AppState};
use voicebot_telephony::TwilioClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("VOICEBOT_ENV").ok();
    let config = load_settings(env.as_deref()).context("failed to load configuration")?;

    init_tracing(&config);

    tracing::info!("Starting voicebot server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = %config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );
    // Re-run now that warnings reach the subscriber
    config.validate().context("invalid configuration")?;

    let script = match &config.script_path {
        Some(path) => {
            let script = DialogueScript::from_yaml_file(path)
                .with_context(|| format!("failed to load dialogue script from {}", path))?;
            tracing::info!(path = %path, "Loaded dialogue script");
            script
        }
        None => DialogueScript::default(),
    };

    if config.observability.metrics_enabled {
        match init_metrics() {
            Ok(_) => tracing::info!("Initialized Prometheus metrics at /metrics"),
            Err(e) => tracing::warn!(error = %e, "Failed to install metrics recorder"),
        }
    }

    let provider: Arc<dyn CallProvider> =
        Arc::new(TwilioClient::new(&config.telephony).context("failed to build carrier client")?);

    let state = AppState::new(config.clone(), &script, provider).context("failed to build application state")?;
    tracing::info!(
        max_calls = config.store.max_calls,
        ttl_seconds = config.store.ttl_seconds,
        auth = config.server.auth.secret().is_some(),
        "Initialized application state"
    );

    let cleanup = state
        .store
        .start_cleanup_task(Duration::from_secs(config.store.cleanup_interval_seconds));

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = cleanup.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("voicebot={level},voicebot_server={level},voicebot_agent={level},voicebot_telephony={level},tower_http=debug").into()
    });

    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
}
