//! Login, registration, logout and the Google OAuth round trip.
//!
//! | Outcome | Redirect |
//! |---------|----------|
//! | any successful login or registration | remembered `return_to`, else `/` |
//! | wrong email or password | `/register` |
//! | registration for an existing email | `/login` |
//! | any Google failure | `/login` |
//! | logout | `/login` |
//! | `/auth/google` or its callback while already signed in | `/` |

use api::auth::PendingOAuth;
use api::AuthError;
use axum::{
    extract::{Query, State},
    response::Redirect,
    Form,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::WebError;
use crate::state::AppState;

/// Default landing page after login.
pub const HOME: &str = "/";

/// Login and registration form. The email is submitted as `username`.
#[derive(Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub async fn login_page() -> &'static str {
    "Sign in: POST /login with username (email) and password, or GET /auth/google"
}

pub async fn register_page() -> &'static str {
    "Create an account: POST /register with username (email) and password"
}

/// Bind `user` to the session and pick where to send them.
async fn complete_login(
    state: &AppState,
    session: &Session,
    user: &api::models::User,
) -> Result<Redirect, WebError> {
    state.identity.establish(session, user).await?;
    let target = state
        .identity
        .take_return_to(session)
        .await?
        .unwrap_or_else(|| HOME.to_string());
    Ok(Redirect::to(&target))
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Redirect, WebError> {
    match state.local.authenticate(&form.username, &form.password).await {
        Ok(user) => complete_login(&state, &session, &user).await,
        Err(AuthError::InvalidCredentials) => Ok(Redirect::to("/register")),
        Err(e) => Err(e.into()),
    }
}

pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Redirect, WebError> {
    if form.username.trim().is_empty() || !form.username.contains('@') || form.password.is_empty() {
        return Ok(Redirect::to("/register"));
    }

    match state.local.register(&form.username, &form.password).await {
        Ok(user) => complete_login(&state, &session, &user).await,
        Err(AuthError::EmailTaken) => Ok(Redirect::to("/login")),
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect, WebError> {
    state.identity.terminate(&session).await?;
    Ok(Redirect::to("/login"))
}

pub async fn google_login(
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect, WebError> {
    let Some(google) = state.google.as_ref() else {
        tracing::warn!("Google login requested but not configured");
        return Ok(Redirect::to("/login"));
    };

    // Leave a signed-in session untouched so its expiry stays fixed.
    if state.identity.is_authenticated(&session).await? {
        return Ok(Redirect::to(HOME));
    }

    let (url, pending) = google.authorize_url();
    state.identity.store_pending_oauth(&session, &pending).await?;
    Ok(Redirect::to(&url))
}

pub async fn google_callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, WebError> {
    let failed = Redirect::to("/login");

    let Some(google) = state.google.as_ref() else {
        tracing::warn!("Google callback received but Google login is not configured");
        return Ok(failed);
    };

    if state.identity.is_authenticated(&session).await? {
        return Ok(Redirect::to(HOME));
    }

    // Single use, whatever happens next.
    let pending: Option<PendingOAuth> = state.identity.take_pending_oauth(&session).await?;

    if let Some(error) = params.error {
        tracing::warn!("Google returned an error: {}", error);
        return Ok(failed);
    }
    let Some(code) = params.code else {
        tracing::error!("Google callback missing code");
        return Ok(failed);
    };
    let Some(pending) = pending.filter(|p| params.state.as_deref() == Some(p.state.as_str())) else {
        tracing::error!("Google callback state does not match the session");
        return Ok(failed);
    };

    let profile = match google.exchange_code(&code, pending).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!("Google OAuth exchange error: {}", e);
            return Ok(failed);
        }
    };

    let user = match state.resolver.resolve(&profile).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Google login aborted: {}", e);
            return Ok(failed);
        }
    };

    tracing::info!(user_id = %user.id, "Google login succeeded");
    complete_login(&state, &session, &user).await
}
