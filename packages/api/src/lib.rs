//! # API crate: identity, storage and settings for Shelf
//!
//! Everything the `web` server needs that is not HTTP plumbing lives here. The
//! server builds each piece once at startup and shares it through its router state;
//! nothing in this crate is a global.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Argon2 password hashing, local login/registration, Google OAuth, identity resolution, session identity |
//! | [`covers`] | Fetching book covers from Open Library |
//! | [`db`] | PostgreSQL pool, the credential store and the reading-log library, plus in-memory versions of both |
//! | [`error`] | `thiserror` error enums shared by the modules above |
//! | [`models`] | `User`, `Credential`, books and notes |
//! | [`settings`] | Environment configuration |
//!
//! ## Identity in one paragraph
//!
//! A user is keyed by email. Registering with a password stores an Argon2 hash;
//! signing in with Google either finds the user with that email or creates one whose
//! credential is [`models::Credential::NoLocalCredential`], against which no password
//! verifies. Either way the session stores only the user id and its login deadline
//! ([`auth::SessionPrincipal`]) and the user is re-read from the store on each request.

pub mod auth;
pub mod covers;
pub mod db;
pub mod error;
pub mod models;
pub mod settings;

pub use error::{AuthError, CoverError, OAuthError, StoreError};
pub use settings::Settings;
