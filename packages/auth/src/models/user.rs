//! # User model
//!
//! Two representations of a user:
//!
//! ## [`User`]
//!
//! The authoritative record held by the user directory. It derives [`sqlx::FromRow`]
//! so it loads straight out of the `users` table:
//!
//! - `id`: the provider-issued profile identifier; directory lookups are keyed on it.
//! - `role`: access level checked by the role gate (`"admin"` is privileged by default).
//! - `created_at` / `updated_at`: audit timestamps.
//!
//! ## [`UserProfile`]
//!
//! The snapshot cached in the authenticated session. It is never trusted for
//! access decisions: middleware re-resolves the [`User`] by `id` on each request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user record from the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            role: role.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Snapshot for session storage.
    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            role: self.role.clone(),
        }
    }
}

/// Session-cached view of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub role: String,
}
