//! # Request middleware
//!
//! Two layers read the authenticated session written by the callback:
//!
//! - [`inject_user`] never blocks. It resolves the session's user through the
//!   directory and stores it in the request extensions as [`CurrentUser`].
//!   Anonymous requests pass through untouched.
//! - [`require_role`] gates a route on the resolved user's role matching
//!   [`AuthState::privileged_role`], answering 403 otherwise.
//!
//! Both re-resolve the user on every request instead of trusting the role cached
//! in the session, so role changes apply without a new login. Both are plain
//! `from_fn_with_state` layers; [`with_current_user`] and [`require_privileged`]
//! apply them to a router so the ordering stays visible where routes are built.
//!
//! ```rust,ignore
//! let admin = auth::require_privileged(Router::new().route("/admin", get(admin)), &state);
//! let app = auth::with_current_user(Router::new().route("/", get(home)).merge(admin), &state);
//! ```

use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::convert::Infallible;
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::models::{User, UserProfile};
use crate::session;
use crate::state::AuthState;

/// The resolved user of the current request, set by [`inject_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}

/// Cached user of the request's session. Unreadable or malformed sessions
/// count as anonymous.
async fn cached_user(session: Option<Session>) -> Option<UserProfile> {
    let session = session?;
    match session::load(&session).await {
        Ok(payload) => payload.map(|p| p.user),
        Err(e) => {
            warn!(error = %e, "could not read session, continuing as anonymous");
            None
        }
    }
}

/// Attach the resolved user to the request when the session has one.
pub async fn inject_user(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let session = request.extensions().get::<Session>().cloned();
    if let Some(cached) = cached_user(session).await.filter(|u| !u.id.is_empty()) {
        let user = auth.resolve_user(&cached.id).await?;
        request.extensions_mut().insert(CurrentUser(user));
    }
    Ok(next.run(request).await)
}

/// Let the request through only for users holding the privileged role.
pub async fn require_role(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let session = request.extensions().get::<Session>().cloned();
    let Some(cached) = cached_user(session).await.filter(|u| !u.id.is_empty()) else {
        debug!(path = %request.uri().path(), "no authenticated user");
        return Err(AuthError::Forbidden);
    };

    let user = auth.resolve_user(&cached.id).await?;
    if user.role != *auth.privileged_role {
        warn!(user = %user.id, role = %user.role, path = %request.uri().path(), "access denied");
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(request).await)
}

/// Apply [`inject_user`] to every route of `router`.
pub fn with_current_user<S>(router: Router<S>, auth: &AuthState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(auth.clone(), inject_user))
}

/// Apply [`require_role`] to every route of `router`. Unmatched paths still 404.
pub fn require_privileged<S>(router: Router<S>, auth: &AuthState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(auth.clone(), require_role))
}
