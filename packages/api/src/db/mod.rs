//! # Database module: connection pool and storage traits
//!
//! The pool is built once by the server binary with [`connect`] and handed to
//! the stores that need it. Nothing here is a process-wide singleton, so tests
//! swap in the in-memory implementations freely.
//!
//! ## Re-exports
//!
//! - [`connect`]: opens a `PgPool` and runs the migrations in `migrations/`.
//! - [`CredentialStore`] with [`PgCredentialStore`] and [`MemoryCredentialStore`].
//! - [`Library`] with [`PgLibrary`] and [`MemoryLibrary`].

mod library;
mod pool;
mod users;

pub use library::{Library, MemoryLibrary, PgLibrary};
pub use pool::connect;
pub use users::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
