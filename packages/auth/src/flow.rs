//! # Flow sessions: the login → callback bridge
//!
//! A flow session lives for one login attempt. [`FlowSessions::begin`] stores the
//! validated post-login destination and the PKCE verifier as a session record keyed
//! by a fresh random [`Id`] (128 bits). The identifier doubles as the OAuth `state`
//! parameter, and a signed cookie named after it (`oauth_flow_<state>`) binds the
//! attempt to the browser that started it.
//!
//! [`FlowSessions::take`] is the only way back in. It requires all of:
//!
//! | Check | Failure |
//! |-------|---------|
//! | a correctly signed `oauth_flow_<state>` cookie whose value is `state` | [`FlowError::Cookie`] |
//! | a record stored under `state` | [`FlowError::Unknown`] |
//! | the record's expiry still in the future (checked here, not only by the cookie) | [`FlowError::Expired`] |
//! | string `redirect` and `pkce_verifier` fields | [`FlowError::Corrupt`] |
//!
//! The record is deleted as soon as it is loaded, so a state can be used once.
//! Records are kept in the same [`SessionStore`] backend as the persistent sessions.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use serde_json::Value;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tower_sessions::cookie::{Cookie, CookieJar, Key, SameSite};
use tower_sessions::session::{Id, Record};
use tower_sessions::{session_store, SessionStore};

/// Prefix of the per-flow cookie name.
pub const FLOW_COOKIE_PREFIX: &str = "oauth_flow_";

/// Lifetime of a flow session.
pub const FLOW_MAX_AGE: Duration = Duration::minutes(10);

const REDIRECT_KEY: &str = "redirect";
const VERIFIER_KEY: &str = "pkce_verifier";

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flow storage failure: {0}")]
    Store(#[from] session_store::Error),
    #[error("could not sign flow cookie")]
    Signing,
    #[error("missing or forged flow cookie")]
    Cookie,
    #[error("malformed state parameter")]
    MalformedState,
    #[error("unknown or already used state")]
    Unknown,
    #[error("flow expired")]
    Expired,
    #[error("flow session has no valid {0}")]
    Corrupt(&'static str),
}

/// A started flow: the `state` to send to the provider and the cookie to set.
pub struct Flow {
    pub state: String,
    pub cookie: Cookie<'static>,
}

/// What a consumed flow hands back to the callback.
#[derive(Debug)]
pub struct CompletedFlow {
    pub redirect_target: String,
    pub pkce_verifier: String,
}

#[derive(Clone)]
pub struct FlowSessions {
    store: Arc<dyn SessionStore>,
    key: Key,
    max_age: Duration,
    secure: bool,
}

impl FlowSessions {
    pub fn new(store: Arc<dyn SessionStore>, key: Key) -> Self {
        Self {
            store,
            key,
            max_age: FLOW_MAX_AGE,
            secure: false,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Mark flow cookies `Secure`. Enable behind HTTPS.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn cookie_name(state: &str) -> String {
        format!("{FLOW_COOKIE_PREFIX}{state}")
    }

    /// Create and persist a flow session.
    pub async fn begin(&self, redirect_target: &str, pkce_verifier: &str) -> Result<Flow, FlowError> {
        let data = HashMap::from([
            (REDIRECT_KEY.to_string(), Value::from(redirect_target)),
            (VERIFIER_KEY.to_string(), Value::from(pkce_verifier)),
        ]);
        let mut record = Record {
            id: Id::default(),
            data,
            expiry_date: OffsetDateTime::now_utc() + self.max_age,
        };
        // The store may replace the id on collision.
        self.store.create(&mut record).await?;

        let state = record.id.to_string();
        let cookie = self.signed_cookie(&state).ok_or(FlowError::Signing)?;
        Ok(Flow { state, cookie })
    }

    /// Consume the flow identified by `state`.
    pub async fn take(&self, state: &str, headers: &HeaderMap) -> Result<CompletedFlow, FlowError> {
        self.verify_cookie(state, headers)?;

        let id: Id = state.parse().map_err(|_| FlowError::MalformedState)?;
        let record = self.store.load(&id).await?.ok_or(FlowError::Unknown)?;
        self.store.delete(&id).await?;

        if record.expiry_date <= OffsetDateTime::now_utc() {
            return Err(FlowError::Expired);
        }

        Ok(CompletedFlow {
            redirect_target: string_field(&record, REDIRECT_KEY)?,
            pkce_verifier: string_field(&record, VERIFIER_KEY)?,
        })
    }

    /// Cookie that clears the flow cookie for `state` in the browser.
    pub fn removal_cookie(&self, state: &str) -> Cookie<'static> {
        let mut cookie = Cookie::build((Self::cookie_name(state), ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build();
        cookie.make_removal();
        cookie
    }

    fn signed_cookie(&self, state: &str) -> Option<Cookie<'static>> {
        let name = Self::cookie_name(state);
        // Lax: the provider's redirect back is a cross-site top-level GET.
        let cookie = Cookie::build((name.clone(), state.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(self.max_age)
            .build();

        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key).add(cookie);
        jar.get(&name).cloned()
    }

    fn verify_cookie(&self, state: &str, headers: &HeaderMap) -> Result<(), FlowError> {
        let name = Self::cookie_name(state);
        let mut jar = CookieJar::new();
        for value in headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse(value).flatten() {
                if cookie.name() == name {
                    jar.add_original(cookie.into_owned());
                }
            }
        }

        match jar.signed(&self.key).get(&name) {
            Some(cookie) if cookie.value() == state => Ok(()),
            _ => Err(FlowError::Cookie),
        }
    }
}

fn string_field(record: &Record, key: &'static str) -> Result<String, FlowError> {
    record
        .data
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(FlowError::Corrupt(key))
}
