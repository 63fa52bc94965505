//! # auth: OAuth2 sign-in, sessions and access control for axum
//!
//! This crate turns a third-party OAuth2 identity provider into authenticated
//! sessions for browser users and exposes the signed-in user to the rest of the
//! application.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`redirect`] | Validation of the client-chosen post-login destination |
//! | [`flow`] | Short-lived, single-use flow sessions bridging `/login` and the provider callback |
//! | [`session`] | The persistent authenticated session (`{token, user}`, versioned) and its cookie layer |
//! | [`provider`] / [`google`] | Identity provider seam and the Google implementation |
//! | [`directory`] / [`db`] | User directory seam, in-memory and PostgreSQL implementations |
//! | [`handlers`] | `/login`, `/oauth2callback`, `/logout` |
//! | [`middleware`] | [`CurrentUser`] injection and the role gate |
//! | [`store`] | In-process session store with expired-record deletion |
//! | [`config`] | OAuth client configuration, timeouts, cookie key derivation |
//!
//! ## Wiring
//!
//! ```rust,ignore
//! let key = auth::session_key(&secret);
//! let store = auth::ExpiringMemoryStore::new();
//! let flows = auth::FlowSessions::new(Arc::new(store.clone()), key.clone());
//! let sessions = auth::Sessions::new(Arc::new(store.clone()), key, auth::SessionConfig::default());
//! let state = auth::AuthState::new(provider, directory, flows, sessions.clone());
//!
//! let app = auth::with_current_user(routes.merge(auth::router(state.clone())), &state);
//! let app = auth::with_sessions(app, store, &sessions);
//! ```
//!
//! The session layer must be the outermost of the auth layers: both middleware
//! and the handlers read the session it installs.

pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod flow;
pub mod google;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod provider;
pub mod redirect;
pub mod session;
pub mod store;
mod state;

pub use config::{session_key, OAuthConfig, Timeouts, CALLBACK_PATH, DEFAULT_REDIRECT_URL};
pub use directory::{DirectoryError, MemoryDirectory, UserDirectory};
pub use error::AuthError;
pub use flow::FlowSessions;
pub use google::GoogleProvider;
pub use handlers::router;
pub use middleware::{
    inject_user, require_privileged, require_role, with_current_user, CurrentUser,
};
pub use models::{User, UserProfile};
pub use provider::{IdentityProvider, ProviderError, ProviderProfile, ProviderToken};
pub use session::{with_sessions, SessionConfig, SessionPayload, Sessions};
pub use state::AuthState;
pub use store::ExpiringMemoryStore;
