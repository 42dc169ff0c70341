pub mod auth;
pub mod books;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::gate::require_auth;
use crate::state::AppState;

/// Cookie name of the session id.
pub const SESSION_COOKIE: &str = "shelf.sid";

/// Build the application router on top of `store`.
///
/// Session cookies are signed with `key`. Anonymous sessions expire after a day of
/// inactivity; logging in pins the expiry to a day after login.
pub fn router<S>(state: AppState, store: S, key: Key, secure: bool) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(api::auth::SESSION_TTL))
        .with_signed(key);

    let protected = Router::new()
        .route("/", get(books::home))
        .route("/new-entry", get(books::new_entry))
        .route("/new-entry/add", post(books::add_book))
        .route("/books/{id}/delete", post(books::delete_book))
        .route("/notes/{id}", get(books::notes))
        .route("/notes/{id}/add", post(books::add_note))
        .route("/notes/{id}/delete", post(books::delete_note))
        .route("/notes/{id}/update", post(books::update_note))
        .route("/reviews/{id}/update", post(books::update_review))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout).post(auth::logout))
        .route("/auth/google", get(auth::google_login))
        .route("/auth/google/callback", get(auth::google_callback))
        .merge(protected)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
