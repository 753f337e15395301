//! HTTP route handlers.
//!
//! Each handler is a thin adapter from axum extractors to the coordinator
//! or the page store.

pub mod health;
pub mod pages;
pub mod scrape;
pub mod search;

pub use health::health_handler;
pub use pages::{get_page_handler, list_pages_handler};
pub use scrape::scrape_handler;
pub use search::search_handler;
