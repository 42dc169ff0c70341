//! Error types shared by the auth core and the stores.

use thiserror::Error;

/// Errors raised by a [`CredentialStore`](crate::db::CredentialStore) or
/// [`Library`](crate::db::Library).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    DuplicateEmail,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Authentication failures.
///
/// `InvalidCredentials`, `EmailTaken` and `IdentityResolutionFailed` are
/// recovered at the route boundary as redirects. `HashingFailed`, `Store`
/// and `Session` are infrastructure failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, wrong password, or an account without a local password.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("could not resolve external identity: {0}")]
    IdentityResolutionFailed(String),

    #[error("failed to hash password: {0}")]
    HashingFailed(String),

    /// The session carries no principal, or one that no longer resolves.
    #[error("not authenticated")]
    Unauthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Whether this is an infrastructure failure rather than a credential problem.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::HashingFailed(_) | AuthError::Store(_) | AuthError::Session(_)
        )
    }
}

/// Failures of the Google OAuth exchange.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("invalid OAuth URL: {0}")]
    InvalidUrl(#[from] oauth2::url::ParseError),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider did not return a verified email")]
    UnverifiedEmail,
}

/// Failures fetching or storing a book cover.
#[derive(Debug, Error)]
pub enum CoverError {
    #[error("invalid ISBN: {0:?}")]
    InvalidIsbn(String),

    #[error("failed to fetch cover: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("failed to write cover: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_classification() {
        assert!(!AuthError::InvalidCredentials.is_internal());
        assert!(!AuthError::EmailTaken.is_internal());
        assert!(!AuthError::IdentityResolutionFailed("x".into()).is_internal());
        assert!(!AuthError::Unauthenticated.is_internal());
        assert!(AuthError::HashingFailed("entropy".into()).is_internal());
        assert!(AuthError::Store(StoreError::DuplicateEmail).is_internal());
    }
}
