//! SSO Gateway
//!
//! Single-binary Rust service that:
//! 1. Loads the SSO application registration and environment
//! 2. Redirects browsers into the v2 (PKCE) SSO login
//! 3. Exchanges the callback code, verifies the character and resolves its
//!    affiliation
//! 4. Hands the result back to the caller, who owns persistence

mod config;
mod error;
mod login;
mod metrics;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use eve_sso::{SsoClient, SsoEnvironment};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::login::LoginState;

/// State for the operational endpoints
#[derive(Clone)]
struct AppState {
    environment: SsoEnvironment,
    started_at: Instant,
    login: LoginState,
    prometheus: PrometheusHandle,
}

/// Build the router with operational and login routes.
///
/// `max_connections` bounds in-flight requests across every route.
fn build_router(state: AppState, max_connections: usize) -> Router {
    let login = login::build_login_router(state.login.clone());
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .merge(login)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
}

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs, LOG_LEVEL / RUST_LOG filter
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting sso-gateway");

    let prometheus = metrics::install_recorder();

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        environment = %config.sso.environment,
        listen_addr = %config.server.listen_addr,
        callback_url = %config.sso.callback_url,
        scopes = config.sso.scopes.len(),
        legacy_enabled = config.sso.secret_key.is_some(),
        "configuration loaded"
    );

    // Timeouts live on the transport; the SSO client attaches credentials
    // per request and never mutates this client.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.server.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let sso = SsoClient::new(http, config.sso.environment, config.sso.settings())
        .context("invalid SSO settings")?;

    let state = AppState {
        environment: config.sso.environment,
        started_at: Instant::now(),
        login: LoginState::new(
            sso,
            config.sso.scopes.clone(),
            config.server.max_pending_logins,
        ),
        prometheus,
    };
    let app = build_router(state, config.server.max_connections);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: environment, uptime and in-flight logins.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "environment": state.environment.to_string(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "pending_logins": state.login.pending_count().await,
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
