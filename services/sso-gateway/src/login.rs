//! Browser login flow over the v2 (PKCE) SSO endpoints
//!
//! Endpoints:
//! - GET  /login   : start a flow, redirect to the SSO authorize page
//! - GET  /callback: exchange the code, verify, resolve affiliation
//! - POST /refresh : trade a refresh token for a new token pair
//!
//! The gateway keeps only the in-flight PKCE verifiers. Tokens and identities
//! are handed back to the caller and never stored.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use eve_sso::{AuthorizedCharacterData, PkcePair, SsoClient, SsoToken};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::metrics;

/// In-flight login, created by /login and consumed by /callback.
struct PendingLogin {
    verifier: String,
    created_at: Instant,
}

/// Maximum age of a pending login before its state is rejected.
const LOGIN_EXPIRY: Duration = Duration::from_secs(600);

/// Shared state for login handlers.
#[derive(Clone)]
pub struct LoginState {
    sso: SsoClient,
    scopes: Arc<Vec<String>>,
    pending: Arc<Mutex<HashMap<String, PendingLogin>>>,
    max_pending: usize,
}

impl LoginState {
    pub fn new(sso: SsoClient, scopes: Vec<String>, max_pending: usize) -> Self {
        Self {
            sso,
            scopes: Arc::new(scopes),
            pending: Arc::new(Mutex::new(HashMap::new())),
            max_pending,
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

pub fn build_login_router(state: LoginState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/refresh", post(refresh))
        .with_state(state)
}

/// GET /login: generate PKCE pair + state and redirect to the SSO.
async fn login(State(state): State<LoginState>) -> Result<impl IntoResponse> {
    let pkce = PkcePair::generate();
    let csrf_state = uuid::Uuid::new_v4().simple().to_string();
    let scopes: Vec<&str> = state.scopes.iter().map(String::as_str).collect();
    let url = state
        .sso
        .authorization_url_v2(&scopes, &pkce, &csrf_state)?;

    let mut pending = state.pending.lock().await;
    // Lazy cleanup: drop expired entries while holding the lock
    pending.retain(|_, p| p.created_at.elapsed() < LOGIN_EXPIRY);
    if pending.len() >= state.max_pending {
        warn!(pending = pending.len(), "pending login table full, rejecting /login");
        return Err(Error::TooManyLogins);
    }
    pending.insert(
        csrf_state.clone(),
        PendingLogin {
            verifier: pkce.verifier,
            created_at: Instant::now(),
        },
    );

    info!(state = %csrf_state, "login started");
    Ok(Redirect::to(url.as_str()))
}

/// Query string the SSO appends to the callback URL.
#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /callback: finish the flow and return the authorized character.
async fn callback(
    State(state): State<LoginState>,
    Query(params): Query<CallbackParams>,
) -> Result<axum::Json<AuthorizedCharacterData>> {
    let started = Instant::now();

    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        warn!(error = %error, description = %description, "SSO returned an error to the callback");
        if let Some(csrf_state) = &params.state {
            state.pending.lock().await.remove(csrf_state);
        }
        return Err(Error::Denied(format!("{error}: {description}")));
    }

    let csrf_state = params.state.ok_or(Error::UnknownState)?;
    let code = params
        .code
        .ok_or_else(|| Error::Denied("callback is missing the authorization code".into()))?;

    let pending = {
        let mut pending = state.pending.lock().await;
        pending.remove(&csrf_state)
    };
    let pending = pending.ok_or(Error::UnknownState)?;
    if pending.created_at.elapsed() >= LOGIN_EXPIRY {
        return Err(Error::ExpiredState);
    }

    let token = state.sso.exchange_code_v2(&code, &pending.verifier).await;
    metrics::record_token_exchange("authorization_code", metrics::outcome_label(&token));
    let token = token
        .inspect_err(|e| warn!(state = %csrf_state, error = %e, "code exchange failed"))?;

    let character = state.sso.authorize_character(&token).await?;
    metrics::record_affiliation(character.has_affiliation());
    metrics::record_login_duration(started.elapsed().as_secs_f64());

    info!(
        character_id = character.character_id,
        character_name = %character.character_name,
        affiliated = character.has_affiliation(),
        "login completed"
    );
    Ok(axum::Json(character))
}

/// Request body for POST /refresh.
#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
    #[serde(default)]
    scopes: Vec<String>,
}

/// POST /refresh: v2 refresh, optionally narrowing scopes.
async fn refresh(
    State(state): State<LoginState>,
    axum::Json(body): axum::Json<RefreshRequest>,
) -> Result<axum::Json<SsoToken>> {
    let scopes: Vec<&str> = body.scopes.iter().map(String::as_str).collect();
    let token = state.sso.refresh_token_v2(&body.refresh_token, &scopes).await;
    metrics::record_token_exchange("refresh_token", metrics::outcome_label(&token));
    Ok(axum::Json(token?))
}
