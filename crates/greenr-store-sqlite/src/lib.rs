//! SQLite backend for the greenr tracker store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The schema is provisioned as an
//! ordered migration sequence gated on `PRAGMA user_version`.

mod encode;
mod migrations;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use migrations::SCHEMA_VERSION;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
