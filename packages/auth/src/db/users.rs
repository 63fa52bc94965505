//! `users` table access.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::directory::{DirectoryError, UserDirectory, DEFAULT_ROLE};
use crate::models::User;

/// PostgreSQL user directory.
#[derive(Clone, Debug)]
pub struct PgDirectory {
    pool: PgPool,
    default_role: String,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            default_role: DEFAULT_ROLE.to_string(),
        }
    }

    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    async fn find(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT id, role, created_at, updated_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[async_trait]
impl UserDirectory for PgDirectory {
    async fn get_or_create_user(&self, id: &str) -> Result<User, DirectoryError> {
        if id.is_empty() {
            return Err(DirectoryError::EmptyId);
        }

        // Existing users take a single SELECT.
        if let Some(user) = self.find(id).await? {
            return Ok(user);
        }

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (id, role)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET updated_at = users.updated_at
            RETURNING id, role, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&self.default_role)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user = %user.id, role = %user.role, "created user");
        Ok(user)
    }
}
