//! Credential store: persistence of [`User`] identity records.
//!
//! The `users.email` column carries a `UNIQUE` constraint, so two concurrent
//! registrations for the same address cannot both succeed; the loser gets
//! [`StoreError::DuplicateEmail`]. [`MemoryCredentialStore`] gives the same
//! guarantee by checking and inserting under a single lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Credential, User, UserRow};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a user with a local password hash.
    async fn create_local(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    /// Insert a user that can only sign in through OAuth.
    async fn create_oauth_placeholder(&self, email: &str) -> Result<User, StoreError>;
}

/// Postgres-backed credential store.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, email: &str, password_hash: Option<&str>) -> Result<User, StoreError> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            e => StoreError::Database(e),
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn create_local(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        self.insert(email, Some(password_hash)).await
    }

    async fn create_oauth_placeholder(&self, email: &str) -> Result<User, StoreError> {
        self.insert(email, None).await
    }
}

/// In-memory credential store for tests and local development.
#[derive(Clone, Debug, Default)]
pub struct MemoryCredentialStore {
    users: Arc<Mutex<HashMap<String, User>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, email: &str, credential: Credential) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            credential,
            created_at: Utc::now(),
        };
        users.insert(email.to_string(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().unwrap_or_else(PoisonError::into_inner).get(email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn create_local(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        self.insert(email, Credential::Password(password_hash.to_string()))
    }

    async fn create_oauth_placeholder(&self, email: &str) -> Result<User, StoreError> {
        self.insert(email, Credential::NoLocalCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryCredentialStore::new();
        assert!(store.find_by_email("a@x.com").await.unwrap().is_none());

        let user = store.create_local("a@x.com", "$argon2id$hash").await.unwrap();
        assert_eq!(user.credential, Credential::Password("$argon2id$hash".into()));

        let by_email = store.find_by_email("a@x.com").await.unwrap().unwrap();
        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_email, user);
        assert_eq!(by_id, user);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryCredentialStore::new();
        store.create_local("a@x.com", "h1").await.unwrap();

        let err = store.create_local("a@x.com", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        let err = store.create_oauth_placeholder("a@x.com").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_yield_one_row() {
        let store = MemoryCredentialStore::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_local("race@x.com", &format!("h{i}")).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_placeholder_has_no_local_credential() {
        let store = MemoryCredentialStore::new();
        let user = store.create_oauth_placeholder("g@x.com").await.unwrap();
        assert_eq!(user.credential, Credential::NoLocalCredential);
    }
}
