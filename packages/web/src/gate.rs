//! Authorization gate for protected routes.
//!
//! [`require_auth`] runs before any protected handler or its extractors. An anonymous
//! request is redirected to `/login` and the handler never runs. For a `GET` or
//! `HEAD` the path is remembered in the session so login can return to it. An
//! authenticated request carries the freshly loaded user to the handler as
//! [`CurrentUser`].

use api::models::User;
use api::AuthError;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::WebError;
use crate::state::AppState;

/// The authenticated user of a request that passed [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    match state.identity.require_user(&session).await {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Err(AuthError::Unauthenticated) => {
            let path = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            tracing::debug!(path, method = %request.method(), "Unauthenticated request diverted to login");
            // Only a page can be returned to; form posts are not replayed.
            if is_revisitable(request.method()) {
                if let Err(e) = state.identity.remember_return_to(&session, path).await {
                    return WebError::from(e).into_response();
                }
            }
            Redirect::to("/login").into_response()
        }
        Err(e) => WebError::from(e).into_response(),
    }
}

fn is_revisitable(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            tracing::error!("CurrentUser extracted on a route without require_auth");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        })
    }
}
