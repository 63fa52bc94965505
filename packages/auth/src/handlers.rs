//! # Login, callback and logout endpoints
//!
//! | Route | Handler | Success |
//! |-------|---------|---------|
//! | `GET`/`POST /login` | [`login`] | 302 to the provider, flow cookie set |
//! | `GET /oauth2callback` | [`callback`] | 302 to the stored destination, session committed |
//! | `GET`/`POST /logout` | [`logout`] | 302 to `/`, session cleared |
//!
//! The callback runs its steps strictly in order (flow lookup, exchange,
//! profile, identity resolution, commit) and stops at the first failure, so the
//! persistent session is only written once every step has succeeded.

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use oauth2::{PkceCodeChallenge, PkceCodeVerifier};
use serde::Deserialize;
use tower_sessions::cookie::Cookie;
use tower_sessions::Session;
use tracing::info;

use crate::config::CALLBACK_PATH;
use crate::error::AuthError;
use crate::provider::ProviderError;
use crate::redirect;
use crate::session::{self, SessionPayload};
use crate::state::{bounded, AuthState};

/// Auth routes, ready to be merged into an application router.
pub fn router(auth: AuthState) -> Router {
    Router::new()
        .route("/login", get(login).post(login))
        .route(CALLBACK_PATH, get(callback))
        .route("/logout", get(logout).post(logout))
        .with_state(auth)
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    #[serde(default)]
    pub redirect: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code: String,
    pub error: Option<String>,
}

/// Start a login: create the flow session and send the browser to the provider.
pub async fn login(
    State(auth): State<AuthState>,
    params: Result<Form<LoginParams>, FormRejection>,
) -> Result<Response, AuthError> {
    let Form(params) = params.map_err(AuthError::request)?;
    let target = redirect::sanitize(&params.redirect);

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let flow = auth
        .flows
        .begin(&target, pkce_verifier.secret())
        .await
        .map_err(AuthError::session)?;

    let url = auth.provider.authorize_url(&flow.state, pkce_challenge);
    let mut response = found(url.as_str())?;
    append_cookie(&mut response, &flow.cookie)?;
    Ok(response)
}

/// Finish a login started by [`login`].
pub async fn callback(
    State(auth): State<AuthState>,
    session: Session,
    headers: HeaderMap,
    params: Result<Form<CallbackParams>, FormRejection>,
) -> Result<Response, AuthError> {
    let Form(params) = params.map_err(AuthError::request)?;
    let flow = auth
        .flows
        .take(&params.state, &headers)
        .await
        .map_err(|e| AuthError::InvalidFlow(e.to_string()))?;

    if let Some(error) = params.error {
        return Err(AuthError::Exchange(ProviderError::Denied(error)));
    }

    let limit = auth.timeouts.provider;
    let token = bounded(
        limit,
        auth.provider
            .exchange(&params.code, PkceCodeVerifier::new(flow.pkce_verifier)),
        || ProviderError::Timeout,
    )
    .await
    .map_err(AuthError::Exchange)?;

    let profile = bounded(limit, auth.provider.fetch_profile(&token), || {
        ProviderError::Timeout
    })
    .await
    .map_err(AuthError::Profile)?;

    let user = auth.resolve_user(&profile.id).await?;
    info!(user = %user.id, role = %user.role, "user signed in");

    let payload = SessionPayload {
        token,
        user: user.to_profile(),
    };
    let session_cookie = auth
        .sessions
        .commit(&session, payload)
        .await
        .map_err(AuthError::session)?;

    let mut response = found(&flow.redirect_target)?;
    append_cookie(&mut response, &auth.flows.removal_cookie(&params.state))?;
    if let Some(cookie) = session_cookie {
        append_cookie(&mut response, &cookie)?;
    }
    Ok(response)
}

/// Clear the authenticated session.
pub async fn logout(session: Session) -> Result<Response, AuthError> {
    session::sign_out(&session)
        .await
        .map_err(AuthError::session)?;
    info!("user signed out");
    found(redirect::ROOT)
}

/// 302 Found to `location`.
fn found(location: &str) -> Result<Response, AuthError> {
    let location =
        HeaderValue::from_str(location).map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok((StatusCode::FOUND, [(LOCATION, location)]).into_response())
}

fn append_cookie(response: &mut Response, cookie: &Cookie<'_>) -> Result<(), AuthError> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(())
}
