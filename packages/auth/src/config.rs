//! OAuth client configuration and the runtime knobs of the auth layer.

use std::time::Duration;

use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use sha2::{Digest, Sha512};
use thiserror::Error;
use tower_sessions::cookie::Key;

/// Callback route registered with the provider.
pub const CALLBACK_PATH: &str = "/oauth2callback";

/// Redirect URL used when none is configured.
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:8080/oauth2callback";

/// Role granted access by [`crate::middleware::require_role`] unless overridden.
pub const DEFAULT_PRIVILEGED_ROLE: &str = "admin";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("invalid {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
}

/// OAuth provider configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
    pub redirect_url: RedirectUrl,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Google configuration. Inputs are trimmed; an empty redirect URL falls
    /// back to [`DEFAULT_REDIRECT_URL`].
    pub fn google(
        client_id: &str,
        client_secret: &str,
        redirect_url: &str,
    ) -> Result<Self, ConfigError> {
        let redirect_url = match redirect_url.trim() {
            "" => DEFAULT_REDIRECT_URL,
            url => url,
        };

        Ok(Self {
            client_id: ClientId::new(client_id.trim().to_string()),
            client_secret: ClientSecret::new(client_secret.trim().to_string()),
            auth_url: AuthUrl::new("https://accounts.google.com/o/oauth2/v2/auth".to_string())
                .map_err(|e| invalid("auth_url", e))?,
            token_url: TokenUrl::new("https://oauth2.googleapis.com/token".to_string())
                .map_err(|e| invalid("token_url", e))?,
            redirect_url: RedirectUrl::new(redirect_url.to_string())
                .map_err(|e| invalid("redirect_url", e))?,
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
        })
    }

    /// Create Google OAuth config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?;
        let redirect_url = std::env::var("OAUTH_REDIRECT_URL").unwrap_or_default();

        Self::google(&client_id, &client_secret, &redirect_url)
    }
}

fn invalid(field: &'static str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidUrl {
        field,
        reason: err.to_string(),
    }
}

/// Upper bounds on outbound calls. Exchange is never retried.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub provider: Duration,
    pub directory: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            provider: Duration::from_secs(10),
            directory: Duration::from_secs(5),
        }
    }
}

/// Derive the cookie signing key from the session secret.
///
/// An empty secret yields a random key, so sessions do not survive a restart.
pub fn session_key(secret: &str) -> Key {
    if secret.is_empty() {
        tracing::warn!("SESSION_SECRET is empty, using a random cookie signing key");
        return Key::generate();
    }
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}
