//! # Session identity
//!
//! Binds an authenticated [`User`] to a `tower_sessions::Session` and restores it on
//! later requests.
//!
//! The session record holds a [`SessionPrincipal`]: the user id and the deadline fixed
//! at login. Every request looks the user up again in the [`CredentialStore`], so a
//! session never serves a stale copy of the user and a user id that no longer resolves
//! is treated as anonymous. Every request also pins the session expiry back to the
//! login deadline, so no later write can push it out.
//!
//! Keys stored in the session:
//!
//! | Key | Value |
//! |-----|-------|
//! | [`SESSION_USER_ID_KEY`] | [`SessionPrincipal`] |
//! | [`SESSION_RETURN_TO_KEY`] | path an anonymous request was diverted from |
//! | [`SESSION_OAUTH_STATE_KEY`] | [`PendingOAuth`] between `/auth/google` and its callback |

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tower_sessions::{Expiry, Session};
use uuid::Uuid;

use crate::db::CredentialStore;
use crate::error::AuthError;
use crate::models::User;

/// Key for storing the principal in session.
pub const SESSION_USER_ID_KEY: &str = "user_id";
/// Key for the path to return to after login.
pub const SESSION_RETURN_TO_KEY: &str = "return_to";
/// Key for the CSRF state and PKCE verifier of an OAuth flow in progress.
pub const SESSION_OAUTH_STATE_KEY: &str = "oauth_state";

/// Lifetime of an authenticated session.
pub const SESSION_TTL: Duration = Duration::hours(24);

/// What the session store persists for an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPrincipal {
    pub user_id: Uuid,
    /// Login time plus [`SESSION_TTL`].
    pub expires_at: OffsetDateTime,
}

impl SessionPrincipal {
    pub fn serialize(user: &User) -> Self {
        Self {
            user_id: user.id,
            expires_at: OffsetDateTime::now_utc() + SESSION_TTL,
        }
    }
}

/// CSRF state and PKCE verifier kept between the OAuth redirect and its callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOAuth {
    pub state: String,
    pub pkce_verifier: String,
}

/// Owns the anonymous/authenticated lifecycle of a session.
#[derive(Clone)]
pub struct SessionIdentity {
    store: Arc<dyn CredentialStore>,
}

impl SessionIdentity {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Bind `user` to the session under a fresh session id and reset its expiry.
    pub async fn establish(&self, session: &Session, user: &User) -> Result<(), AuthError> {
        let principal = SessionPrincipal::serialize(user);
        session.cycle_id().await?;
        session.insert(SESSION_USER_ID_KEY, principal).await?;
        session.set_expiry(Some(Expiry::AtDateTime(principal.expires_at)));
        tracing::debug!(user_id = %user.id, "Session established");
        Ok(())
    }

    pub async fn principal(&self, session: &Session) -> Result<Option<SessionPrincipal>, AuthError> {
        Ok(session.get(SESSION_USER_ID_KEY).await?)
    }

    /// The user bound to this session, loaded fresh from the credential store.
    pub async fn current_user(&self, session: &Session) -> Result<Option<User>, AuthError> {
        let Some(principal) = self.principal(session).await? else {
            return Ok(None);
        };
        if principal.expires_at <= OffsetDateTime::now_utc() {
            session.remove::<SessionPrincipal>(SESSION_USER_ID_KEY).await?;
            return Ok(None);
        }
        // The layer's inactivity expiry would otherwise slide on every save.
        if !matches!(session.expiry(), Some(Expiry::AtDateTime(at)) if at == principal.expires_at) {
            session.set_expiry(Some(Expiry::AtDateTime(principal.expires_at)));
        }

        let user = self.store.find_by_id(principal.user_id).await?;
        if user.is_none() {
            tracing::warn!(user_id = %principal.user_id, "Session refers to unknown user");
            session.remove::<SessionPrincipal>(SESSION_USER_ID_KEY).await?;
        }
        Ok(user)
    }

    /// Like [`current_user`](Self::current_user), but anonymous is an error.
    pub async fn require_user(&self, session: &Session) -> Result<User, AuthError> {
        self.current_user(session)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    pub async fn is_authenticated(&self, session: &Session) -> Result<bool, AuthError> {
        Ok(self.current_user(session).await?.is_some())
    }

    /// Clear the session and delete its record. The old id is anonymous from now on.
    pub async fn terminate(&self, session: &Session) -> Result<(), AuthError> {
        session.flush().await?;
        Ok(())
    }

    /// Remember where an anonymous request was headed.
    pub async fn remember_return_to(&self, session: &Session, path: &str) -> Result<(), AuthError> {
        if is_safe_relative_path(path) {
            session.insert(SESSION_RETURN_TO_KEY, path).await?;
        }
        Ok(())
    }

    /// Consume the remembered destination, if any.
    pub async fn take_return_to(&self, session: &Session) -> Result<Option<String>, AuthError> {
        let path: Option<String> = session.remove(SESSION_RETURN_TO_KEY).await?;
        Ok(path.filter(|p| is_safe_relative_path(p)))
    }

    pub async fn store_pending_oauth(&self, session: &Session, pending: &PendingOAuth) -> Result<(), AuthError> {
        session.insert(SESSION_OAUTH_STATE_KEY, pending).await?;
        Ok(())
    }

    /// Remove and return the pending OAuth flow. It can be used once.
    pub async fn take_pending_oauth(&self, session: &Session) -> Result<Option<PendingOAuth>, AuthError> {
        Ok(session.remove(SESSION_OAUTH_STATE_KEY).await?)
    }
}

/// Whether `path` is a same-origin path that is safe to redirect to.
pub fn is_safe_relative_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains("://")
        && !path.contains('\\')
        && !path.contains("..")
        && !path.contains('\0')
}
