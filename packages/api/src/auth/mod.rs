//! Authentication: local passwords, Google OAuth, and session identity.

mod config;
mod google;
mod local;
mod password;
mod resolver;
mod session;

pub use config::OAuthConfig;
pub use google::{GoogleOAuth, OAuthProvider};
pub use local::{LocalAuth, LoginOutcome, RejectReason};
pub use password::{PasswordConfig, PasswordHasher};
pub use resolver::{ExternalProfile, IdentityResolver};
pub use session::{
    is_safe_relative_path, PendingOAuth, SessionIdentity, SessionPrincipal, SESSION_OAUTH_STATE_KEY,
    SESSION_RETURN_TO_KEY, SESSION_TTL, SESSION_USER_ID_KEY,
};
