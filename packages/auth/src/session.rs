//! # Authenticated session
//!
//! After a successful callback the browser's persistent session (managed by
//! `tower-sessions`) holds a single value under [`SESSION_KEY`]: the provider
//! token and a snapshot of the user. The value is stored as versioned JSON,
//!
//! ```json
//! {"version": "1", "token": {"access_token": "..."}, "user": {"id": "108", "role": "user"}}
//! ```
//!
//! so later payload versions can be added as new [`StoredSession`] variants
//! without breaking sessions already in the store. A value that does not decode
//! is a [`SessionError::Malformed`]; readers treat it as "no session".
//!
//! Signing in rotates the session id. [`Sessions::commit`] writes the new record
//! before it deletes the old one, so a failed write leaves the previous session
//! usable.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tower_sessions::cookie::{Cookie, CookieJar, Key, SameSite};
use tower_sessions::session::{Id, Record};
use tower_sessions::{session_store, Expiry, Session, SessionManagerLayer, SessionStore};
use tracing::warn;

use crate::models::UserProfile;
use crate::provider::ProviderToken;

/// Default name of the persistent session cookie.
pub const SESSION_NAME: &str = "auth.session";

/// Key of the authenticated payload inside the session.
pub const SESSION_KEY: &str = "auth";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Store(#[from] tower_sessions::session::Error),
    #[error("session backend error: {0}")]
    Backend(#[from] session_store::Error),
    #[error("could not sign session cookie")]
    Signing,
    #[error("malformed session payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// What an authenticated session carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub token: ProviderToken,
    pub user: UserProfile,
}

/// On-store encoding of [`SessionPayload`], tagged with its schema version.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum StoredSession {
    #[serde(rename = "1")]
    V1(SessionPayload),
}

/// Read the authenticated payload, if any.
pub async fn load(session: &Session) -> Result<Option<SessionPayload>, SessionError> {
    let Some(value) = session.get_value(SESSION_KEY).await? else {
        return Ok(None);
    };
    match serde_json::from_value::<StoredSession>(value)? {
        StoredSession::V1(payload) => Ok(Some(payload)),
    }
}

/// Drop the token and user from the session and persist the result.
/// Sessions without a payload are left alone, so nothing is written for them.
pub async fn sign_out(session: &Session) -> Result<(), SessionError> {
    if session.get_value(SESSION_KEY).await?.is_none() {
        return Ok(());
    }
    session.remove_value(SESSION_KEY).await?;
    session.save().await?;
    Ok(())
}

/// Cookie settings of the persistent session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    pub secure: bool,
    pub inactivity: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: SESSION_NAME.to_string(),
            secure: false,
            inactivity: Duration::days(7),
        }
    }
}

/// Write access to the persistent sessions, sharing the store, key and cookie
/// settings of the layer installed by [`with_sessions`].
#[derive(Clone)]
pub struct Sessions {
    store: Arc<dyn SessionStore>,
    key: Key,
    config: SessionConfig,
}

impl Sessions {
    pub fn new(store: Arc<dyn SessionStore>, key: Key, config: SessionConfig) -> Self {
        Self { store, key, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace whatever the session held with `payload` under a fresh id.
    ///
    /// A session without a stored record is saved through the layer as usual.
    /// An existing session gets a new record first; the old id is deleted only
    /// once that write succeeded, and the returned cookie must be sent to point
    /// the browser at the new id.
    pub async fn commit(
        &self,
        session: &Session,
        payload: SessionPayload,
    ) -> Result<Option<Cookie<'static>>, SessionError> {
        let value = serde_json::to_value(StoredSession::V1(payload))?;

        // Loading drops the id of a cookie whose record is gone.
        session.get_value(SESSION_KEY).await?;
        let Some(previous) = session.id() else {
            session.clear().await;
            session.insert_value(SESSION_KEY, value).await?;
            session.save().await?;
            return Ok(None);
        };

        let mut record = Record {
            id: Id::default(),
            data: HashMap::from([(SESSION_KEY.to_string(), value)]),
            expiry_date: OffsetDateTime::now_utc() + self.config.inactivity,
        };
        self.store.create(&mut record).await?;
        if let Err(e) = self.store.delete(&previous).await {
            warn!(error = %e, "could not delete rotated session record");
        }

        self.signed_cookie(record.id).map(Some)
    }

    /// Session cookie for `id`, as the layer would have built it.
    fn signed_cookie(&self, id: Id) -> Result<Cookie<'static>, SessionError> {
        let cookie = Cookie::build((self.config.name.clone(), id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.config.secure)
            .max_age(self.config.inactivity)
            .build();

        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key).add(cookie);
        jar.get(&self.config.name)
            .cloned()
            .ok_or(SessionError::Signing)
    }
}

/// Wrap `router` in a signed-cookie session layer backed by `store`, which must
/// be the store `sessions` writes to.
pub fn with_sessions<St>(router: Router, store: St, sessions: &Sessions) -> Router
where
    St: SessionStore + Clone,
{
    let config = &sessions.config;
    let layer = SessionManagerLayer::new(store)
        .with_name(config.name.clone())
        .with_secure(config.secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(config.inactivity))
        .with_signed(sessions.key.clone());
    router.layer(layer)
}
