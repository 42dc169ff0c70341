//! # User model for authenticated readers
//!
//! [`User`] is the complete row from the `users` table:
//!
//! - `id`: primary key (`UUID v4`), assigned by the credential store.
//! - `email`: unique, lower-cased; the anchor shared by local and Google logins.
//! - `credential`: a [`Credential`]: either an Argon2 PHC string or
//!   [`Credential::NoLocalCredential`] for accounts created through OAuth.
//! - `created_at`: audit timestamp.
//!
//! [`UserRow`] is the `sqlx::FromRow` shape of the table, where a missing local
//! credential is a `NULL` `password_hash`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// How (and whether) a user can sign in with a local password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Argon2 hash in PHC string format.
    Password(String),
    /// Account created through OAuth. No password verifies against it.
    NoLocalCredential,
}

impl From<Option<String>> for Credential {
    fn from(hash: Option<String>) -> Self {
        hash.map_or(Credential::NoLocalCredential, Credential::Password)
    }
}

/// Full user record.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
}

/// Database row of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            credential: row.password_hash.into(),
            created_at: row.created_at,
        }
    }
}

/// Canonical form of an email address used as the identity key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
