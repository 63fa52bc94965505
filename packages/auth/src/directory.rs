//! # User directory
//!
//! [`UserDirectory`] maps a provider profile identifier to a local [`User`],
//! creating the record on first sight. The callback handler uses it to upsert the
//! signing-in user; the middleware use it to re-resolve the session's cached
//! user on every request.
//!
//! [`MemoryDirectory`] keeps records in process. The PostgreSQL implementation
//! lives in [`crate::db`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::User;

/// Role given to users created on first sign-in.
pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user id must not be empty")]
    EmptyId,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user directory timed out")]
    Timeout,
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch the user keyed by `id`, creating it with the default role if absent.
    async fn get_or_create_user(&self, id: &str) -> Result<User, DirectoryError>;
}

/// In-memory directory for tests and single-process deployments.
#[derive(Clone, Debug)]
pub struct MemoryDirectory {
    users: Arc<Mutex<HashMap<String, User>>>,
    default_role: String,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_ROLE)
    }
}

impl MemoryDirectory {
    pub fn new(default_role: impl Into<String>) -> Self {
        Self {
            users: Arc::default(),
            default_role: default_role.into(),
        }
    }

    /// Change a user's role, creating the user if needed.
    pub async fn set_role(&self, id: &str, role: &str) {
        let mut users = self.users.lock().await;
        let user = users
            .entry(id.to_string())
            .or_insert_with(|| User::new(id, role));
        user.role = role.to_string();
        user.updated_at = Utc::now();
    }

    pub async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn get_or_create_user(&self, id: &str) -> Result<User, DirectoryError> {
        if id.is_empty() {
            return Err(DirectoryError::EmptyId);
        }
        let mut users = self.users.lock().await;
        let user = users
            .entry(id.to_string())
            .or_insert_with(|| User::new(id, self.default_role.as_str()));
        Ok(user.clone())
    }
}
