//! Error types for SSO operations

/// Errors from SSO authorization, token exchange and identity calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown environment, missing client id or secret key.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection, TLS or timeout failure before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The SSO or ESI host answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Protocol {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// A success response whose body is not the expected JSON.
    #[error("invalid {endpoint} response: {message}")]
    Parse {
        endpoint: &'static str,
        message: String,
    },

    /// The token endpoint answered successfully but issued no access token.
    #[error("token endpoint issued an empty access token")]
    EmptyToken,
}

/// Result alias for SSO operations.
pub type Result<T> = std::result::Result<T, Error>;
