//! SSO client: settings, resolved endpoints and the shared HTTP client
//!
//! `SsoClient` is cheap to clone and safe to share across tasks. It never
//! mutates the underlying `reqwest::Client`; credentials (Basic for the
//! legacy token endpoint, Bearer for verify/ESI) are attached to each
//! outgoing request builder individually.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::Secret;
use serde::de::DeserializeOwned;
use url::Url;

use crate::environment::{Endpoints, SsoEnvironment};
use crate::error::{Error, Result};

/// Application registration with the SSO provider.
#[derive(Debug, Clone)]
pub struct SsoSettings {
    pub client_id: String,
    /// Only required by the legacy token endpoint (HTTP Basic auth).
    pub secret_key: Option<Secret<String>>,
    /// Redirect URI registered for the application.
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct SsoClient {
    pub(crate) http: reqwest::Client,
    pub(crate) endpoints: Endpoints,
    pub(crate) settings: SsoSettings,
}

impl SsoClient {
    /// Client for one of the fixed environments.
    pub fn new(
        http: reqwest::Client,
        environment: SsoEnvironment,
        settings: SsoSettings,
    ) -> Result<Self> {
        Self::with_endpoints(http, Endpoints::for_environment(environment), settings)
    }

    /// Client against explicit hosts.
    ///
    /// Fails fast on an empty client id, an unparseable callback URL or
    /// unparseable base URLs, so the URL builders and token calls never hit
    /// a configuration problem mid-flow.
    pub fn with_endpoints(
        http: reqwest::Client,
        endpoints: Endpoints,
        settings: SsoSettings,
    ) -> Result<Self> {
        if settings.client_id.trim().is_empty() {
            return Err(Error::Config("client_id must not be empty".into()));
        }
        Url::parse(&settings.callback_url).map_err(|e| {
            Error::Config(format!(
                "invalid callback_url {:?}: {e}",
                settings.callback_url
            ))
        })?;
        for base in [&endpoints.sso_base, &endpoints.esi_base] {
            Url::parse(base)
                .map_err(|e| Error::Config(format!("invalid base URL {base:?}: {e}")))?;
        }

        Ok(Self {
            http,
            endpoints,
            settings,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn client_id(&self) -> &str {
        &self.settings.client_id
    }

    pub fn callback_url(&self) -> &str {
        &self.settings.callback_url
    }

    /// `Basic base64(client_id:secret_key)` for the legacy token endpoint.
    pub(crate) fn basic_credentials(&self) -> Result<String> {
        let secret = self.settings.secret_key.as_ref().ok_or_else(|| {
            Error::Config("legacy token exchange requires a secret_key".into())
        })?;
        Ok(encode_basic_credentials(
            &self.settings.client_id,
            secret.expose(),
        ))
    }
}

/// Encode client credentials as an HTTP Basic auth header value.
pub fn encode_basic_credentials(client_id: &str, secret_key: &str) -> String {
    let encoded = STANDARD.encode(format!("{client_id}:{secret_key}"));
    format!("Basic {encoded}")
}

/// Send a prepared request and decode a JSON body from a success response.
///
/// Non-success statuses become `Error::Protocol` with the response body,
/// transport failures `Error::Http`, malformed bodies `Error::Parse`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    endpoint: &'static str,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::Http(format!("{endpoint} request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading {endpoint} response: {e}")))?;

    if !status.is_success() {
        return Err(Error::Protocol {
            endpoint,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Parse {
        endpoint,
        message: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) fn test_settings(secret: Option<&str>) -> SsoSettings {
    SsoSettings {
        client_id: "my-client".into(),
        secret_key: secret.map(|s| Secret::new(s.to_string())),
        callback_url: "http://localhost:8080/callback".into(),
    }
}
