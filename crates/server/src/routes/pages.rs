use axum::{
    Json,
    extract::{Path, Query, State},
};
use scrapecache_core::Page;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handler::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

/// GET /pages/ - stored pages in insertion order.
pub async fn list_pages_handler(
    State(state): State<AppState>, Query(params): Query<ListParams>,
) -> Result<Json<Vec<Page>>, ApiError> {
    let pages = state.store.list(params.skip, params.limit).await?;
    Ok(Json(pages))
}

/// GET /pages/:id - one stored page; bumps `last_accessed`.
///
/// # Errors
/// - 404 Not Found: no page with this id (nothing is modified)
pub async fn get_page_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Page>, ApiError> {
    let page = state.store.touch_access(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(page))
}
