//! Credential store for passgate
//!
//! This module defines the storage trait the auth core depends on and its
//! SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{Role, User};

/// Durable username → user mapping
///
/// Implementations must enforce username uniqueness atomically: a second
/// `insert_user` with an existing username fails with
/// [`DbError::ConstraintViolation`], even when two inserts race.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by exact (case-sensitive) username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DbError>;

    /// Find a user by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DbError>;

    /// Find any one user holding the given role
    async fn find_by_role(&self, role: Role) -> Result<Option<User>, DbError>;

    /// Insert a new user
    async fn insert_user(&self, user: &User) -> Result<(), DbError>;
}
