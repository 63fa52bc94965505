//! Request-level error type shared by the auth handlers and middleware.
//!
//! Every variant except [`AuthError::Forbidden`] is terminal for the request
//! and rendered as a 500 carrying only a short summary. The full cause goes to
//! the log.

use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::directory::DirectoryError;
use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The session store could not be read or written.
    #[error("session storage failure: {0}")]
    Session(String),
    /// Missing, expired, replayed or forged flow state.
    #[error("invalid flow state: {0}")]
    InvalidFlow(String),
    #[error("token exchange failed: {0}")]
    Exchange(#[source] ProviderError),
    #[error("profile fetch failed: {0}")]
    Profile(#[source] ProviderError),
    #[error("identity resolution failed: {0}")]
    Identity(#[from] DirectoryError),
    #[error("access denied")]
    Forbidden,
    /// Request parameters that could not be read.
    #[error("malformed request: {0}")]
    Request(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn session(err: impl std::fmt::Display) -> Self {
        Self::Session(err.to_string())
    }

    pub fn request(err: FormRejection) -> Self {
        Self::Request(err.body_text())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::Session(_) => "could not save session",
            AuthError::InvalidFlow(_) => "invalid state parameter. try logging in again.",
            AuthError::Exchange(_) => "could not get auth token",
            AuthError::Profile(_) => "could not fetch profile",
            AuthError::Identity(_) => "could not resolve user",
            AuthError::Forbidden => "Forbidden",
            AuthError::Request(_) => "invalid request",
            AuthError::Internal(_) => "internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "{}", self.public_message());
        }
        (status, self.public_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::InvalidFlow("unknown state".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::Exchange(ProviderError::Timeout).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::Request("Failed to deserialize form".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err = AuthError::Exchange(ProviderError::Exchange(
            "invalid_grant: code ya29.secret".into(),
        ));
        assert!(!err.public_message().contains("ya29"));
        assert!(err.to_string().contains("invalid_grant"));
    }
}
