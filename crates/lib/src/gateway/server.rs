//! Gateway HTTP server: LINE webhook endpoint plus a health probe (single port).

use crate::channels::{signature, ChannelHandle, LineClient, WebhookPayload};
use crate::config::{Config, Credentials};
use crate::gateway::dispatch::Dispatcher;
use crate::llm::{Completion, GeminiClient};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Path LINE is configured to POST webhooks to.
pub const WEBHOOK_PATH: &str = "/webhook";

/// Shared state for the gateway. Read-only after startup.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub credentials: Arc<Credentials>,
    pub dispatcher: Dispatcher,
}

impl GatewayState {
    /// Build the LINE and Gemini clients from config and the resolved secrets.
    pub fn new(config: Config, credentials: Credentials) -> Self {
        let line: Arc<dyn ChannelHandle> = Arc::new(LineClient::new(
            credentials.channel_access_token.clone(),
            config.channels.line.api_base.clone(),
            config.channels.line.data_api_base.clone(),
        ));
        let gemini = GeminiClient::new(
            credentials.gemini_api_key.clone(),
            config.agents.gemini.model.clone(),
            config.agents.gemini.api_base.clone(),
        );
        log::info!("completions use gemini model {}", gemini.model());
        let completion: Arc<dyn Completion> = Arc::new(gemini);
        Self {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            dispatcher: Dispatcher::new(completion, line),
        }
    }
}

/// Routes: `GET /` health, `POST /webhook` LINE events (any other method is 405).
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route(
            WEBHOOK_PATH,
            post(line_webhook).fallback(method_not_allowed),
        )
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config, credentials: Credentials) -> Result<()> {
    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let app = router(GatewayState::new(config, credentials));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {} (webhook at {})", bind_addr, WEBHOOK_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// In-flight webhook requests are allowed to finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining in-flight requests");
}

/// POST /webhook — verify x-line-signature over the raw body, parse, dispatch all events, report.
async fn line_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let provided = headers
        .get(signature::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !signature::verify(&body, &state.credentials.channel_secret, provided) {
        log::warn!("line webhook: rejected request with invalid signature");
        return (StatusCode::UNAUTHORIZED, "Invalid signature");
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("line webhook: cannot parse body: {}", e);
            return (StatusCode::BAD_REQUEST, "Bad Request");
        }
    };
    let events = payload.into_events();
    log::debug!("line webhook: {} event(s)", events.len());

    match state.dispatcher.run(&events).await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            log::error!("line webhook: error handling events: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
    }))
}
