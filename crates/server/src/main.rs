//! Chat Agent Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use chat_agent_agent::{AgentContext, AiClient, Orchestrator};
use chat_agent_config::{constants::env, load_settings, AiConfig, AiConfigFile, Settings, TriggerSet};
use chat_agent_pipeline::{AudioPipeline, EdgeTts, EdgeTtsConfig, WhisperCliStt, WhisperConfig};
use chat_agent_server::{
    create_router, init_metrics, AppState, ConnectionLifecycle, ConnectionState, GatewayClient,
    GatewayControl, ServerError,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config_bot.json > config/{env} > config/default > defaults
    let env_name = std::env::var(env::ENVIRONMENT).ok();
    let config = match load_settings(env_name.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!(
                "Loaded configuration from files (env: {})",
                env_name.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting Chat Agent v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        bot = %config.bot.name,
        "Configuration loaded"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        match init_metrics() {
            Ok(handle) => {
                tracing::info!("Initialized Prometheus metrics at /metrics");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let triggers = match TriggerSet::load(&config.paths.triggers_file) {
        Ok(triggers) => triggers,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load triggers, continuing without any");
            TriggerSet::default()
        }
    };

    let ai_config = match AiConfig::load(&config.paths.ai_config_file) {
        Ok(ai) => ai,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read AI config file, using defaults");
            AiConfig::resolve(AiConfigFile::default(), std::env::var(env::API_KEY).ok())
        }
    };

    let store = chat_agent_persistence::init(&config).await;

    let gateway = Arc::new(GatewayClient::new(&config.gateway)?);
    tracing::info!(url = %gateway.base_url(), "Gateway client ready");

    let stt = Arc::new(WhisperCliStt::new(WhisperConfig::from_settings(
        &config.audio,
        &config.paths,
    )));
    let tts = Arc::new(EdgeTts::new(EdgeTtsConfig::from_settings(
        &config.audio,
        &config.paths,
    )));
    let audio = AudioPipeline::from_settings(&config, gateway.clone(), stt, tts);
    let ai = AiClient::from_config(&config.llm, &ai_config, store.clone());

    let ctx = AgentContext::new(&config, Arc::new(triggers), gateway.clone(), audio, ai);
    let orchestrator = Orchestrator::new(ctx);

    let lifecycle = Arc::new(ConnectionLifecycle::new());
    let supervisor = tokio::spawn(lifecycle.clone().supervise(
        gateway.clone() as Arc<dyn GatewayControl>,
        config.gateway.reconnect_delay(),
        config.gateway.status_poll_interval(),
    ));

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port)
        .parse()
        .map_err(|e| ServerError::Config(format!("invalid listen address: {}", e)))?;

    let mut state = AppState::new(config, orchestrator, lifecycle.clone());
    if let Some(handle) = metrics_handle {
        state = state.with_metrics(handle);
    }
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(supervisor))
        .await?;

    if let Err(e) = store.flush().await {
        tracing::error!(error = %e, "Failed to flush conversation history");
    }

    if lifecycle.current() == ConnectionState::LoggedOut {
        tracing::error!("Session logged out, re-link the account and restart");
        return Err(ServerError::LoggedOut.into());
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C, SIGTERM or the session logging out)
async fn shutdown_signal(supervisor: tokio::task::JoinHandle<ConnectionState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
        state = supervisor => {
            tracing::info!(final_state = ?state.ok(), "Connection supervisor stopped, shutting down...");
        }
    }
}

/// Initialize console tracing
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("chat_agent={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
