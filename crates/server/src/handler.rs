//! HTTP router and shared state.
//!
//! This module wires the route handlers to their paths and wraps them in
//! tracing, CORS and a global concurrency limit.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use scrapecache_core::PageStore;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::coordinator::Coordinator;
use crate::routes::{get_page_handler, health_handler, list_pages_handler, scrape_handler, search_handler};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: PageStore,
    pub coordinator: Arc<Coordinator>,
}

/// Build the application router.
///
/// At most `max_concurrent_requests` requests are handled at once; the rest
/// wait for a slot.
pub fn router(state: AppState, max_concurrent_requests: usize) -> Router {
    Router::new()
        .route("/scrape/", post(scrape_handler))
        .route("/pages/", get(list_pages_handler))
        .route("/pages/:id", get(get_page_handler))
        .route("/search/", get(search_handler))
        .route("/health", get(health_handler))
        .layer(GlobalConcurrencyLimitLayer::new(max_concurrent_requests))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
