//! Identity provider seam.
//!
//! The callback handler only needs three things from the provider: an
//! authorization URL bound to a flow, a code exchange, and a profile lookup.
//! [`crate::google::GoogleProvider`] is the production implementation; tests
//! substitute their own.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oauth2::url::Url;
use oauth2::{PkceCodeChallenge, PkceCodeVerifier};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered the callback with `error=...` instead of a code.
    #[error("authorization denied: {0}")]
    Denied(String),
    #[error("{0}")]
    Exchange(String),
    #[error("{0}")]
    Profile(String),
    #[error("provider request timed out")]
    Timeout,
}

/// Credential returned by the token endpoint. Opaque to everything but the provider.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ProviderToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }
}

impl fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderToken")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Profile returned by the provider's userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization URL carrying `state`, the PKCE challenge, forced consent
    /// and online access.
    fn authorize_url(&self, state: &str, pkce_challenge: PkceCodeChallenge) -> Url;

    /// Exchange an authorization code. Codes are single-use: callers must not retry.
    async fn exchange(
        &self,
        code: &str,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<ProviderToken, ProviderError>;

    async fn fetch_profile(&self, token: &ProviderToken) -> Result<ProviderProfile, ProviderError>;
}
