//! Core types and shared functionality for scrapecache.
//!
//! This crate provides:
//! - Page store implementation with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use store::{Page, PageStore};
