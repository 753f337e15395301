use axum::{Json, extract::State};
use scrapecache_client::validate_url;
use scrapecache_core::Page;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handler::AppState;

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

/// POST /scrape/ - return the cached page for a URL, scraping it if needed.
///
/// # Errors
/// - 422 Unprocessable Entity: `url` is not an absolute http(s) URL
/// - 500 Internal Server Error: the store failed
pub async fn scrape_handler(
    State(state): State<AppState>, Json(request): Json<ScrapeRequest>,
) -> Result<Json<Page>, ApiError> {
    let url = validate_url(&request.url)?;
    let page = state.coordinator.resolve(url).await?;
    Ok(Json(page))
}
