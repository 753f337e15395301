//! Client code for scrapecache.
//!
//! This crate provides the HTTP fetch pipeline and the HTML-to-text
//! extraction used by the server's cache coordinator.

pub mod extract;
pub mod fetch;

pub use extract::{ExtractedPage, NO_TITLE, extract_page};

pub use fetch::{ERROR_TITLE, FetchConfig, FetchError, FetchResult, Fetcher, PageFetcher, UrlError, validate_url};
