//! # Database module: PostgreSQL-backed user directory
//!
//! Production deployments keep users in PostgreSQL. This module owns the pool
//! construction ([`connect`]), the embedded migrations ([`migrate`]) and the
//! [`PgDirectory`] implementation of [`crate::directory::UserDirectory`].
//!
//! The session tables used by `tower-sessions-sqlx-store` are migrated by that
//! store itself, on the same pool.

mod pool;
mod users;

pub use pool::{connect, migrate};
pub use users::PgDirectory;
