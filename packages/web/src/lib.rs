//! HTTP server for Shelf, a private reading log.
//!
//! Routes live in [`routes`]; everything behind the login wall goes through
//! [`gate::require_auth`]. [`launch_server`] wires the PostgreSQL-backed services
//! together; tests build the same router over in-memory stores.

pub mod error;
pub mod gate;
pub mod routes;
mod server;
pub mod state;

pub use server::launch_server;
