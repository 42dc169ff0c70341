//! Maps a verified third-party identity onto a local [`User`].
//!
//! The provider has already authenticated the person; this only finds the user
//! with the same email or creates one without a local password.

use std::sync::Arc;

use crate::db::CredentialStore;
use crate::error::{AuthError, StoreError};
use crate::models::{normalize_email, User};

/// Identity claims returned by an OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    pub provider: &'static str,
    pub email: String,
}

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn CredentialStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Find or lazily create the user for `profile`.
    pub async fn resolve(&self, profile: &ExternalProfile) -> Result<User, AuthError> {
        let email = normalize_email(&profile.email);
        if email.is_empty() {
            return Err(AuthError::IdentityResolutionFailed(
                "profile has no email".to_string(),
            ));
        }

        self.find_or_create(&email).await.map_err(|e| {
            tracing::error!(provider = profile.provider, "Identity resolution failed: {}", e);
            AuthError::IdentityResolutionFailed(e.to_string())
        })
    }

    async fn find_or_create(&self, email: &str) -> Result<User, StoreError> {
        if let Some(user) = self.store.find_by_email(email).await? {
            return Ok(user);
        }

        match self.store.create_oauth_placeholder(email).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Created user from OAuth profile");
                Ok(user)
            }
            // Someone else created the row between our lookup and insert.
            Err(StoreError::DuplicateEmail) => self
                .store
                .find_by_email(email)
                .await?
                .ok_or(StoreError::DuplicateEmail),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::db::MemoryCredentialStore;
    use crate::models::Credential;

    fn profile(email: &str) -> ExternalProfile {
        ExternalProfile {
            provider: "google",
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_existing_local_user_is_reused() {
        let store = MemoryCredentialStore::new();
        let local = store.create_local("a@x.com", "$argon2id$hash").await.unwrap();
        let resolver = IdentityResolver::new(Arc::new(store.clone()));

        let user = resolver.resolve(&profile("A@x.com")).await.unwrap();
        assert_eq!(user.id, local.id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_new_email_creates_one_placeholder() {
        let store = MemoryCredentialStore::new();
        let resolver = IdentityResolver::new(Arc::new(store.clone()));

        let first = resolver.resolve(&profile("new@x.com")).await.unwrap();
        let second = resolver.resolve(&profile("new@x.com")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.credential, Credential::NoLocalCredential);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_email_fails() {
        let resolver = IdentityResolver::new(Arc::new(MemoryCredentialStore::new()));
        let err = resolver.resolve(&profile("  ")).await.unwrap_err();
        assert!(matches!(err, AuthError::IdentityResolutionFailed(_)));
    }

    struct BrokenStore;

    #[async_trait]
    impl CredentialStore for BrokenStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn create_local(&self, _email: &str, _hash: &str) -> Result<User, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn create_oauth_placeholder(&self, _email: &str) -> Result<User, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_resolution_failure() {
        let resolver = IdentityResolver::new(Arc::new(BrokenStore));
        let err = resolver.resolve(&profile("a@x.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::IdentityResolutionFailed(_)));
    }
}
