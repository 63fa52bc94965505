//! Data models for the auth layer.

mod user;

pub use user::{User, UserProfile};
