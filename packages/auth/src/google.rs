//! # Google OAuth 2.0 provider
//!
//! Implements [`IdentityProvider`] against Google's authorization-code flow.
//!
//! ## Types
//!
//! - [`ConfiguredClient`]: a fully-typed `oauth2::Client` alias with auth and token
//!   endpoints set.
//! - [`GoogleProvider`]: the provider handle wrapping an [`OAuthConfig`], the typed
//!   oauth2 client and the two HTTP clients it talks through.
//!
//! ## Flow
//!
//! 1. **[`authorize_url`](GoogleProvider::authorize_url)**: builds an authorization URL
//!    requesting the configured scopes (`openid`, `email`, `profile` by default). The
//!    CSRF `state` is supplied by the caller (it is the flow session identifier), the
//!    PKCE challenge is attached, and `prompt=consent` / `access_type=online` force
//!    re-approval without issuing offline credentials.
//!
//! 2. **[`exchange`](GoogleProvider::exchange)**: trades the code and PKCE verifier for
//!    an access token. The token request goes through a client that never follows
//!    redirects.
//!
//! 3. **[`fetch_profile`](GoogleProvider::fetch_profile)**: reads the userinfo endpoint
//!    with the bearer token.

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{
    AuthorizationCode, CsrfToken, EndpointNotSet, EndpointSet, PkceCodeChallenge,
    PkceCodeVerifier, Scope, TokenResponse,
};
use reqwest::Client;

use crate::config::OAuthConfig;
use crate::provider::{IdentityProvider, ProviderError, ProviderProfile, ProviderToken};

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Google OAuth provider.
pub struct GoogleProvider {
    config: OAuthConfig,
    client: ConfiguredClient,
    token_http: Client,
    api_http: Client,
}

impl GoogleProvider {
    pub fn new(config: OAuthConfig) -> Result<Self, reqwest::Error> {
        let client = BasicClient::new(config.client_id.clone())
            .set_client_secret(config.client_secret.clone())
            .set_auth_uri(config.auth_url.clone())
            .set_token_uri(config.token_url.clone())
            .set_redirect_uri(config.redirect_url.clone());

        // Token endpoint responses must never be followed to another host.
        let token_http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            config,
            client,
            token_http,
            api_http: Client::new(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str, pkce_challenge: PkceCodeChallenge) -> Url {
        let state = state.to_string();
        let (url, _) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(self.config.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("prompt", "consent")
            .add_extra_param("access_type", "online")
            .url();
        url
    }

    async fn exchange(
        &self,
        code: &str,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<ProviderToken, ProviderError> {
        if code.is_empty() {
            return Err(ProviderError::Exchange("missing authorization code".into()));
        }

        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.token_http)
            .await
            .map_err(|e| ProviderError::Exchange(e.to_string()))?;

        let expires_at = response
            .expires_in()
            .and_then(|d| TimeDelta::from_std(d).ok())
            .and_then(|d| Utc::now().checked_add_signed(d));

        Ok(ProviderToken {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_at,
        })
    }

    async fn fetch_profile(&self, token: &ProviderToken) -> Result<ProviderProfile, ProviderError> {
        let profile: ProviderProfile = self
            .api_http
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::Profile(e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::Profile(e.to_string()))?;

        if profile.id.is_empty() {
            return Err(ProviderError::Profile("profile has no id".into()));
        }
        Ok(profile)
    }
}
