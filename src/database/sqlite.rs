//! SQLite implementation of the CredentialStore trait
//!
//! This module provides a SQLite-based implementation of the CredentialStore
//! trait using rusqlite and tokio-rusqlite for async operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::migrations::{migration_version, CREATE_SCHEMA};
use super::CredentialStore;
use crate::error::DbError;
use crate::models::{Role, User};

const USER_COLUMNS: &str = "id, username, password_hash, role, created_at";

/// SQLite credential store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (and migrate) a SQLite database
    ///
    /// Use `:memory:` for in-memory database or a file path for persistent storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            conn.pragma_update(None, "user_version", migration_version())?;
            Ok(())
        })
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }

    async fn find_one(&self, filter: &'static str, value: String) -> Result<Option<User>, DbError> {
        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM users WHERE {} LIMIT 1", USER_COLUMNS, filter);
                let mut stmt = conn.prepare(&sql)?;
                let user = stmt.query_row([&value], row_to_user).optional()?;
                Ok(user)
            })
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        self.find_one("username = ?1", username.to_string()).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DbError> {
        self.find_one("id = ?1", id.to_string()).await
    }

    async fn find_by_role(&self, role: Role) -> Result<Option<User>, DbError> {
        self.find_one("role = ?1", role.to_string()).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        let id = user.id.clone();
        let username = user.username.clone();
        let password_hash = user.password_hash.clone();
        let role = user.role.to_string();
        let created_at = user.created_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO users (id, username, password_hash, role, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    rusqlite::params![id, username, password_hash, role, created_at],
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    let role = role.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role,
        created_at: parse_datetime(row.get::<_, Option<String>>(4)?).unwrap_or_else(Utc::now),
    })
}

/// Parse a datetime string to DateTime<Utc>
fn parse_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                // SQLite CURRENT_TIMESTAMP format
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.and_utc())
            })
    })
}
