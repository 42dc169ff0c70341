//! Data models for the application.

mod book;
mod user;

pub use book::{Book, BookNotes, NewBook, Note, SortOrder};
pub use user::{normalize_email, Credential, User, UserRow};
