//! Application error types for passgate
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Authentication-related errors
///
/// Every variant carries a stable machine-readable kind (see [`AuthError::kind`])
/// and a human-readable message. Infrastructure failures never carry the
/// underlying cause in their message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// Input failed shape or length checks
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Username is already registered
    #[error("Username already exists")]
    DuplicateUsername,

    /// Unknown username or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token signature did not verify
    #[error("Invalid token")]
    InvalidToken,

    /// Token is past its expiry
    #[error("Token expired")]
    TokenExpired,

    /// Token could not be parsed
    #[error("Malformed token")]
    MalformedToken,

    /// Token subject no longer exists
    #[error("User not found")]
    PrincipalNotFound,

    /// Missing authorization header
    #[error("Missing authorization header")]
    MissingAuth,

    /// Authenticated, but the role is not allowed
    #[error("Insufficient role")]
    Forbidden,

    /// Credential store failure
    #[error("Internal server error")]
    StoreFailure,

    /// Hashing, signing or task failure
    #[error("Internal server error")]
    Internal,
}

impl AuthError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation_error",
            AuthError::DuplicateUsername => "duplicate_username",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::MalformedToken => "malformed_token",
            AuthError::PrincipalNotFound => "principal_not_found",
            AuthError::MissingAuth => "missing_auth",
            AuthError::Forbidden => "forbidden",
            AuthError::StoreFailure => "store_failure",
            AuthError::Internal => "internal_error",
        }
    }

    /// Whether the caller could not be authenticated at all
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::MalformedToken
                | AuthError::PrincipalNotFound
                | AuthError::MissingAuth
        )
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection worker error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<tokio_rusqlite::Error> for DbError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::ConstraintViolation(msg.unwrap_or_else(|| e.to_string()))
            }
            tokio_rusqlite::Error::Rusqlite(e) => DbError::Sqlite(e),
            other => DbError::Connection(other.to_string()),
        }
    }
}
