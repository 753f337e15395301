use axum::{
    Json,
    extract::{Query, State},
};
use scrapecache_core::Page;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handler::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Substring to look for; a missing query is treated as empty.
    #[serde(default)]
    pub query: String,
}

/// GET /search/ - pages whose title or content contains `query`, ignoring case.
///
/// An empty query returns an empty array, not every page.
pub async fn search_handler(
    State(state): State<AppState>, Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Page>>, ApiError> {
    let pages = state.store.search(&params.query).await?;
    tracing::debug!(query = %params.query, results = pages.len(), "search");
    Ok(Json(pages))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;

    use crate::routes::testing::{json_body, send, test_app};

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_search_pages() {
        let (app, store, _fetcher) = test_app().await;
        store
            .upsert("https://search-test.com", "Search Test Title", "This is unique searchable content")
            .await
            .unwrap();

        let response = send(&app, get("/search/?query=unique+searchable")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let data = json_body(response).await;
        assert_eq!(data.as_array().unwrap().len(), 1);
        assert_eq!(data[0]["url"], "https://search-test.com");

        let data = json_body(send(&app, get("/search/?query=this+should+not+match+anything")).await).await;
        assert_eq!(data, json!([]));
    }

    #[tokio::test]
    async fn test_search_empty_query_returns_empty_array() {
        let (app, store, _fetcher) = test_app().await;
        store.upsert("https://example.com", "Example", "content").await.unwrap();

        assert_eq!(json_body(send(&app, get("/search/?query=")).await).await, json!([]));
        assert_eq!(json_body(send(&app, get("/search/")).await).await, json!([]));
    }

    #[tokio::test]
    async fn test_search_ignores_non_ascii_case() {
        let (app, store, _fetcher) = test_app().await;
        store.upsert("https://cafe.test", "CAFÉ ÜBER ALLES", "menu").await.unwrap();

        let data = json_body(send(&app, get("/search/?query=caf%C3%A9%20%C3%BCber")).await).await;
        assert_eq!(data.as_array().unwrap().len(), 1);
        assert_eq!(data[0]["url"], "https://cafe.test");
    }
}
