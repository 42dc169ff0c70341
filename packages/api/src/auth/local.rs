//! Email + password authentication and registration.
//!
//! A login attempt moves from pending to either [`LoginOutcome::Authenticated`] or
//! [`LoginOutcome::Rejected`]. The rejection reason is kept for logging only:
//! [`LocalAuth::authenticate`] collapses every reason into
//! [`AuthError::InvalidCredentials`], and an unknown email still pays for one
//! password verification so response timing does not reveal which accounts exist.

use std::sync::Arc;

use super::password::PasswordHasher;
use crate::db::CredentialStore;
use crate::error::{AuthError, StoreError};
use crate::models::{normalize_email, Credential, User};

/// Why a login attempt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoSuchUser,
    WrongPassword,
    /// The account was created through OAuth and has no password.
    NoLocalCredential,
}

/// Result of checking a submitted email and password.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(User),
    Rejected(RejectReason),
}

/// Local credential verifier.
#[derive(Clone)]
pub struct LocalAuth {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    dummy_hash: String,
}

impl LocalAuth {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash("shelf-dummy-password")?;
        Ok(Self {
            store,
            hasher,
            dummy_hash,
        })
    }

    /// Check credentials without collapsing the rejection reason.
    pub async fn check(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(email);

        let Some(user) = self.store.find_by_email(&email).await? else {
            self.hasher
                .verify_blocking(password.to_string(), self.dummy_hash.clone())
                .await?;
            return Ok(LoginOutcome::Rejected(RejectReason::NoSuchUser));
        };

        let Credential::Password(ref hash) = user.credential else {
            self.hasher
                .verify_blocking(password.to_string(), self.dummy_hash.clone())
                .await?;
            return Ok(LoginOutcome::Rejected(RejectReason::NoLocalCredential));
        };

        if self
            .hasher
            .verify_blocking(password.to_string(), hash.clone())
            .await?
        {
            Ok(LoginOutcome::Authenticated(user))
        } else {
            Ok(LoginOutcome::Rejected(RejectReason::WrongPassword))
        }
    }

    /// Log in with email and password.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        match self.check(email, password).await? {
            LoginOutcome::Authenticated(user) => {
                tracing::info!(user_id = %user.id, "Local login succeeded");
                Ok(user)
            }
            LoginOutcome::Rejected(reason) => {
                tracing::info!(email = %normalize_email(email), ?reason, "Local login rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Register a new user. The caller is expected to log the returned user in.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);

        if self.store.find_by_email(&email).await?.is_some() {
            tracing::info!(email = %email, "Registration for existing email");
            return Err(AuthError::EmailTaken);
        }

        let hash = self.hasher.hash_blocking(password.to_string()).await?;

        match self.store.create_local(&email, &hash).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Registered local user");
                Ok(user)
            }
            Err(StoreError::DuplicateEmail) => {
                tracing::info!(email = %email, "Lost registration race for email");
                Err(AuthError::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }
}
