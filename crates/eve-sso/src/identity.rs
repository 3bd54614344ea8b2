//! Identity verification and affiliation enrichment
//!
//! After a token exchange the caller learns who authenticated by calling the
//! SSO verify endpoint with the access token. The result is then enriched
//! with alliance/corporation/faction ids from an ESI affiliation lookup.
//!
//! Verification failures propagate. A failed affiliation lookup does not:
//! the identity is returned without affiliation ids rather than guessed ones.

use std::fmt;

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::{SsoClient, send_json};
use crate::error::{Error, Result};
use crate::token::SsoToken;

/// Body of `GET {sso}/oauth/verify`.
#[derive(Debug, Clone, Deserialize)]
struct VerifyResponse {
    #[serde(rename = "CharacterID")]
    character_id: i64,
    #[serde(rename = "CharacterName")]
    character_name: String,
    #[serde(rename = "ExpiresOn", default)]
    expires_on: Option<String>,
    #[serde(rename = "Scopes", default)]
    scopes: Option<String>,
    #[serde(rename = "TokenType", default)]
    token_type: Option<String>,
    #[serde(rename = "CharacterOwnerHash", default)]
    character_owner_hash: Option<String>,
}

/// The authenticated character, stamped with the token pair that proved it.
///
/// Returned to the caller, who owns persistence. Nothing here is cached.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedCharacterData {
    pub character_id: i64,
    pub character_name: String,
    pub token: String,
    pub refresh_token: String,
    pub alliance_id: Option<i64>,
    pub corporation_id: Option<i64>,
    pub faction_id: Option<i64>,
    /// Verify-endpoint metadata, when the provider sends it
    pub expires_on: Option<String>,
    pub scopes: Option<String>,
    pub token_type: Option<String>,
    pub character_owner_hash: Option<String>,
}

impl AuthorizedCharacterData {
    fn from_verify(response: VerifyResponse, token: &SsoToken) -> Self {
        Self {
            character_id: response.character_id,
            character_name: response.character_name,
            token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            alliance_id: None,
            corporation_id: None,
            faction_id: None,
            expires_on: response.expires_on,
            scopes: response.scopes,
            token_type: response.token_type,
            character_owner_hash: response.character_owner_hash,
        }
    }

    /// Copy affiliation ids onto the identity.
    pub fn apply_affiliation(&mut self, affiliation: &Affiliation) {
        self.alliance_id = affiliation.alliance_id;
        self.corporation_id = Some(affiliation.corporation_id);
        self.faction_id = affiliation.faction_id;
    }

    /// Whether the affiliation lookup succeeded for this identity.
    pub fn has_affiliation(&self) -> bool {
        self.corporation_id.is_some()
    }

    /// Granted scopes as a list (the verify endpoint sends them space-joined).
    pub fn scope_list(&self) -> Vec<&str> {
        self.scopes
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for AuthorizedCharacterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedCharacterData")
            .field("character_id", &self.character_id)
            .field("character_name", &self.character_name)
            .field("token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("alliance_id", &self.alliance_id)
            .field("corporation_id", &self.corporation_id)
            .field("faction_id", &self.faction_id)
            .field("expires_on", &self.expires_on)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

/// One element of the ESI affiliation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    pub character_id: i64,
    pub corporation_id: i64,
    #[serde(default)]
    pub alliance_id: Option<i64>,
    #[serde(default)]
    pub faction_id: Option<i64>,
}

impl SsoClient {
    /// Resolve the base identity behind an access token.
    ///
    /// Error statuses and unparseable bodies are returned as errors.
    pub async fn verify(&self, token: &SsoToken) -> Result<AuthorizedCharacterData> {
        let url = self.endpoints.verify_url();
        debug!(url = %url, "verifying access token");

        let request = self
            .http
            .get(&url)
            .bearer_auth(&token.access_token)
            .header(ACCEPT, "application/json");
        let response: VerifyResponse = send_json(request, "verify").await?;

        info!(
            character_id = response.character_id,
            character_name = %response.character_name,
            "access token verified"
        );
        Ok(AuthorizedCharacterData::from_verify(response, token))
    }

    /// Fill alliance/corporation/faction ids from the ESI affiliation lookup.
    ///
    /// A non-success status, a transport failure or an empty result leave the
    /// ids unset and return the identity as-is. A success response with an
    /// unparseable body is an error.
    pub async fn resolve_affiliation(
        &self,
        mut character: AuthorizedCharacterData,
    ) -> Result<AuthorizedCharacterData> {
        let url = self.endpoints.affiliation_url();
        debug!(character_id = character.character_id, url = %url, "affiliation lookup");

        let request = self
            .http
            .post(&url)
            .bearer_auth(&character.token)
            .header(ACCEPT, "application/json")
            .json(&[character.character_id]);

        let affiliations: Vec<Affiliation> = match send_json(request, "affiliation").await {
            Ok(list) => list,
            Err(e @ Error::Parse { .. }) => return Err(e),
            Err(e) => {
                warn!(
                    character_id = character.character_id,
                    error = %e,
                    "affiliation lookup failed, continuing without affiliation"
                );
                return Ok(character);
            }
        };

        match affiliations.first() {
            Some(affiliation) => {
                if affiliation.character_id != character.character_id {
                    warn!(
                        requested = character.character_id,
                        returned = affiliation.character_id,
                        "affiliation lookup returned a different character"
                    );
                }
                character.apply_affiliation(affiliation);
                debug!(
                    character_id = character.character_id,
                    corporation_id = affiliation.corporation_id,
                    "affiliation resolved"
                );
            }
            None => warn!(
                character_id = character.character_id,
                "affiliation lookup returned no entries"
            ),
        }
        Ok(character)
    }

    /// Verify a token and enrich the identity with its affiliation.
    pub async fn authorize_character(&self, token: &SsoToken) -> Result<AuthorizedCharacterData> {
        let character = self.verify(token).await?;
        self.resolve_affiliation(character).await
    }
}
