//! Shared dependencies of the auth handlers and middleware.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Timeouts, DEFAULT_PRIVILEGED_ROLE};
use crate::directory::{DirectoryError, UserDirectory};
use crate::flow::FlowSessions;
use crate::models::User;
use crate::provider::IdentityProvider;
use crate::session::Sessions;

/// Everything a request needs, injected once at router construction.
#[derive(Clone)]
pub struct AuthState {
    pub provider: Arc<dyn IdentityProvider>,
    pub directory: Arc<dyn UserDirectory>,
    pub flows: FlowSessions,
    pub sessions: Sessions,
    pub privileged_role: Arc<str>,
    pub timeouts: Timeouts,
}

impl AuthState {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn UserDirectory>,
        flows: FlowSessions,
        sessions: Sessions,
    ) -> Self {
        Self {
            provider,
            directory,
            flows,
            sessions,
            privileged_role: Arc::from(DEFAULT_PRIVILEGED_ROLE),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_privileged_role(mut self, role: &str) -> Self {
        self.privileged_role = Arc::from(role);
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Resolve the authoritative user record for `id`.
    pub async fn resolve_user(&self, id: &str) -> Result<User, DirectoryError> {
        bounded(
            self.timeouts.directory,
            self.directory.get_or_create_user(id),
            || DirectoryError::Timeout,
        )
        .await
    }
}

/// Run `fut` for at most `limit`, mapping expiry to `timed_out()`.
pub(crate) async fn bounded<T, E, F>(
    limit: Duration,
    fut: F,
    timed_out: impl FnOnce() -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| Err(timed_out()))
}
