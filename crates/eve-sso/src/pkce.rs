//! PKCE (Proof Key for Code Exchange) for the v2 flow
//!
//! The provider expects a two-step transform rather than the literal RFC 7636
//! S256 method: the verifier is first base64url-encoded, and the challenge is
//! the SHA-256 of that encoded form. The encoded verifier is also what gets
//! sent as `code_verifier` during the token exchange, so the provider's
//! check `BASE64URL(SHA256(code_verifier)) == code_challenge` holds.
//!
//! Keep this transform bit-for-bit. A strictly RFC-conformant provider would
//! need `compute_challenge` to hash the raw verifier instead.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Challenge method sent alongside `code_challenge`.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Generate a random verifier: 32 random bytes, base64url without padding.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Base64url (no padding) of the verifier's raw bytes.
///
/// This is the value transmitted as `code_verifier`.
pub fn encode_verifier(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(verifier.as_bytes())
}

/// `challenge = BASE64URL(SHA256(BASE64URL(verifier)))`
pub fn compute_challenge(verifier: &str) -> String {
    let encoded = encode_verifier(verifier);
    let hash = Sha256::digest(encoded.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Verifier and challenge for one authorization round trip.
///
/// The verifier cannot be recovered from the challenge; callers keep the
/// pair (or at least the verifier) until the code has been exchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn new(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    pub fn generate() -> Self {
        Self::new(generate_verifier())
    }

    /// The form sent as `code_verifier` in the token request.
    pub fn encoded_verifier(&self) -> String {
        encode_verifier(&self.verifier)
    }
}
