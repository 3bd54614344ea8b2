//! Authorization redirect URLs
//!
//! Two generations of the authorize endpoint:
//! - legacy: `{sso}/oauth/authorize/`, no PKCE, the code is later exchanged
//!   with the application's secret key
//! - v2: `{sso}/v2/oauth/authorize/`, carries a PKCE challenge and an opaque
//!   `state` the caller must check on the callback
//!
//! Query values go through the `url` form serializer, so `redirect_uri` is
//! percent-encoded and the space-joined `scope` decodes back to exactly
//! `scopes.join(" ")`.

use url::Url;

use crate::client::SsoClient;
use crate::environment::Endpoints;
use crate::error::{Error, Result};
use crate::pkce::{CODE_CHALLENGE_METHOD, PkcePair};

/// Legacy authorization URL.
///
/// `scope` is only present when `scopes` is non-empty.
pub fn build_authorization_url(
    endpoints: &Endpoints,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[&str],
) -> Result<Url> {
    let mut url = parse_endpoint(&endpoints.authorize_url())?;
    append_base_params(&mut url, client_id, redirect_uri, scopes);
    Ok(url)
}

/// V2 authorization URL with PKCE challenge and CSRF state.
///
/// This core only transmits `state`; comparing it on the callback is the
/// caller's job.
pub fn build_authorization_url_v2(
    endpoints: &Endpoints,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[&str],
    pkce: &PkcePair,
    state: &str,
) -> Result<Url> {
    let mut url = parse_endpoint(&endpoints.authorize_url_v2())?;
    append_base_params(&mut url, client_id, redirect_uri, scopes);
    url.query_pairs_mut()
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD)
        .append_pair("state", state);
    Ok(url)
}

fn append_base_params(url: &mut Url, client_id: &str, redirect_uri: &str, scopes: &[&str]) {
    let mut query = url.query_pairs_mut();
    query
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("client_id", client_id);
    if !scopes.is_empty() {
        query.append_pair("scope", &scopes.join(" "));
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    Url::parse(endpoint)
        .map_err(|e| Error::Config(format!("invalid authorize endpoint {endpoint:?}: {e}")))
}

impl SsoClient {
    /// Legacy authorization URL for this application.
    pub fn authorization_url(&self, scopes: &[&str]) -> Result<Url> {
        build_authorization_url(
            &self.endpoints,
            &self.settings.client_id,
            &self.settings.callback_url,
            scopes,
        )
    }

    /// V2 (PKCE) authorization URL for this application.
    pub fn authorization_url_v2(
        &self,
        scopes: &[&str],
        pkce: &PkcePair,
        state: &str,
    ) -> Result<Url> {
        build_authorization_url_v2(
            &self.endpoints,
            &self.settings.client_id,
            &self.settings.callback_url,
            scopes,
            pkce,
            state,
        )
    }
}
