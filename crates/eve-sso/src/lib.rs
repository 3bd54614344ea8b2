//! EVE single sign-on client library
//!
//! Implements both generations of the SSO authorization code flow and the
//! post-login identity lookup. Provides authorization URL construction, PKCE
//! challenge derivation, token exchange/refresh, token verification and ESI
//! affiliation enrichment. This crate holds no long-lived state; callers own
//! token persistence and refresh timing.
//!
//! V2 flow:
//! 1. Caller creates a `pkce::PkcePair` and an opaque `state`
//! 2. User is redirected to `SsoClient::authorization_url_v2()`
//! 3. The callback's code is traded via `SsoClient::exchange_code_v2()`
//! 4. `SsoClient::authorize_character()` verifies the token and resolves
//!    alliance/corporation/faction
//! 5. Later, `SsoClient::refresh_token_v2()` renews the access token
//!
//! The legacy flow replaces steps 2-3 with `authorization_url()` and
//! `exchange_code()`, authenticating with the application's secret key.

pub mod authorize;
pub mod client;
pub mod environment;
pub mod error;
pub mod identity;
pub mod pkce;
pub mod token;

pub use authorize::{build_authorization_url, build_authorization_url_v2};
pub use client::{SsoClient, SsoSettings, encode_basic_credentials};
pub use environment::{Endpoints, SsoEnvironment};
pub use error::{Error, Result};
pub use identity::{Affiliation, AuthorizedCharacterData};
pub use pkce::{PkcePair, compute_challenge, encode_verifier, generate_verifier};
pub use token::{Grant, SsoToken};
