//! Token endpoint exchanges
//!
//! Two grant types (authorization code, refresh token) against two endpoint
//! generations:
//! - legacy `{sso}/oauth/token`: HTTP Basic `client_id:secret_key`
//! - v2 `{sso}/v2/oauth/token`: `client_id` in the form body, plus the
//!   encoded PKCE verifier for code exchanges
//!
//! Both generations share one status policy. A non-success response is an
//! `Error::Protocol` carrying status and body, never an empty token.

use std::fmt;
use std::time::{Duration, SystemTime};

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{SsoClient, send_json};
use crate::error::{Error, Result};
use crate::pkce::encode_verifier;

/// Token pair issued by the SSO token endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SsoToken {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: u64,
}

impl SsoToken {
    /// Absolute expiry given the time the response was received.
    ///
    /// `None` when `expires_in` lies beyond what `SystemTime` can represent.
    pub fn expires_at(&self, received_at: SystemTime) -> Option<SystemTime> {
        received_at.checked_add(Duration::from_secs(self.expires_in))
    }
}

impl fmt::Debug for SsoToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsoToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// What is being traded for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant<'a> {
    AuthorizationCode(&'a str),
    RefreshToken(&'a str),
}

impl Grant<'_> {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode(_) => "authorization_code",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }

    fn params(&self) -> (&'static str, String) {
        match self {
            Grant::AuthorizationCode(code) => ("code", code.to_string()),
            Grant::RefreshToken(token) => ("refresh_token", token.to_string()),
        }
    }
}

/// Form body for the legacy token endpoint.
pub fn legacy_form(grant: Grant<'_>) -> Vec<(&'static str, String)> {
    vec![("grant_type", grant.grant_type().to_string()), grant.params()]
}

/// Form body for the v2 token endpoint.
///
/// `verifier` is the raw PKCE verifier; it is sent encoded. It is ignored for
/// refresh grants, and `scopes` is ignored for code grants.
pub fn v2_form(
    client_id: &str,
    grant: Grant<'_>,
    verifier: Option<&str>,
    scopes: &[&str],
) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("grant_type", grant.grant_type().to_string()),
        ("client_id", client_id.to_string()),
        grant.params(),
    ];
    match grant {
        Grant::AuthorizationCode(_) => {
            if let Some(verifier) = verifier {
                form.push(("code_verifier", encode_verifier(verifier)));
            }
        }
        Grant::RefreshToken(_) => {
            if !scopes.is_empty() {
                form.push(("scope", scopes.join(" ")));
            }
        }
    }
    form
}

impl SsoClient {
    /// Legacy flow: exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<SsoToken> {
        self.legacy_token_request(Grant::AuthorizationCode(code))
            .await
    }

    /// Legacy flow: refresh an access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<SsoToken> {
        self.legacy_token_request(Grant::RefreshToken(refresh_token))
            .await
    }

    /// V2 flow: exchange an authorization code, proving possession of the
    /// verifier whose challenge went into the authorization URL.
    pub async fn exchange_code_v2(&self, code: &str, verifier: &str) -> Result<SsoToken> {
        let form = v2_form(
            &self.settings.client_id,
            Grant::AuthorizationCode(code),
            Some(verifier),
            &[],
        );
        self.v2_token_request(Grant::AuthorizationCode(code), form)
            .await
    }

    /// V2 flow: refresh an access token, optionally narrowing its scopes.
    pub async fn refresh_token_v2(&self, refresh_token: &str, scopes: &[&str]) -> Result<SsoToken> {
        let grant = Grant::RefreshToken(refresh_token);
        let form = v2_form(&self.settings.client_id, grant, None, scopes);
        self.v2_token_request(grant, form).await
    }

    async fn legacy_token_request(&self, grant: Grant<'_>) -> Result<SsoToken> {
        let credentials = self.basic_credentials()?;
        let url = self.endpoints.token_url();
        debug!(grant_type = grant.grant_type(), url = %url, "legacy token request");

        let request = self
            .http
            .post(&url)
            .header(AUTHORIZATION, credentials)
            .header(ACCEPT, "application/json")
            .form(&legacy_form(grant));
        finish(send_json(request, "token").await, grant)
    }

    async fn v2_token_request(
        &self,
        grant: Grant<'_>,
        form: Vec<(&'static str, String)>,
    ) -> Result<SsoToken> {
        let url = self.endpoints.token_url_v2();
        debug!(grant_type = grant.grant_type(), url = %url, "v2 token request");

        let request = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&form);
        finish(send_json(request, "token").await, grant)
    }
}

fn finish(result: Result<SsoToken>, grant: Grant<'_>) -> Result<SsoToken> {
    let token = result?;
    if token.access_token.is_empty() {
        return Err(Error::EmptyToken);
    }
    info!(
        grant_type = grant.grant_type(),
        expires_in = token.expires_in,
        "token issued"
    );
    Ok(token)
}
