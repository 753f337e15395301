//! SQLite-backed page store.
//!
//! This module persists scraped pages keyed by URL, using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Lookup by URL or surrogate id
//! - Upsert on the unique `url` column, which serializes concurrent writers
//! - Paginated listing and naive substring search
//! - Automatic schema migrations and WAL mode for concurrent access
//!
//! Every operation runs inside its own transaction, so a failure never
//! leaves a half-written row behind.

pub mod connection;
pub mod migrations;
pub mod pages;

pub use crate::Error;

pub use connection::{DatabaseLocation, PageStore};
pub use pages::{MAX_LIST_LIMIT, Page};
