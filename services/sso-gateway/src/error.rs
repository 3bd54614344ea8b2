//! Handler errors and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no pending login for this state (expired or never started)")]
    UnknownState,

    #[error("login expired, start again at /login")]
    ExpiredState,

    #[error("too many logins in progress, retry later")]
    TooManyLogins,

    #[error("callback rejected by SSO: {0}")]
    Denied(String),

    #[error(transparent)]
    Sso(#[from] eve_sso::Error),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::UnknownState | Error::ExpiredState | Error::Denied(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::TooManyLogins => StatusCode::SERVICE_UNAVAILABLE,
            Error::Sso(eve_sso::Error::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Sso(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), axum::Json(body)).into_response()
    }
}
