use std::sync::Arc;

use api::auth::{IdentityResolver, LocalAuth, OAuthProvider, SessionIdentity};
use api::covers::CoverSource;
use api::db::{CredentialStore, Library};

/// Shared services, built once at startup and cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub identity: SessionIdentity,
    pub local: LocalAuth,
    pub resolver: IdentityResolver,
    /// `None` when Google login is not configured.
    pub google: Option<Arc<dyn OAuthProvider>>,
    pub library: Arc<dyn Library>,
    pub covers: Arc<dyn CoverSource>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        local: LocalAuth,
        google: Option<Arc<dyn OAuthProvider>>,
        library: Arc<dyn Library>,
        covers: Arc<dyn CoverSource>,
    ) -> Self {
        Self {
            identity: SessionIdentity::new(users.clone()),
            local,
            resolver: IdentityResolver::new(users),
            google,
            library,
            covers,
        }
    }
}
