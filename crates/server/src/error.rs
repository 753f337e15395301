//! Structured errors for the HTTP surface.
//!
//! Every error renders as `{"detail": "<message>"}` with a matching status.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use scrapecache_client::UrlError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No page with the requested id.
    #[error("Page not found")]
    NotFound,

    /// Request URL failed validation.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] UrlError),

    /// Store failure on the request path.
    #[error(transparent)]
    Store(#[from] scrapecache_core::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidUrl(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Store(scrapecache_core::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::InvalidUrl(UrlError::Empty).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            ApiError::Store(scrapecache_core::Error::MigrationFailed("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::Store(scrapecache_core::Error::NotFound("x".into())).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = ApiError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "detail": "Page not found" }));
    }
}
