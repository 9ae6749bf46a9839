//! `GET /api/content/{source}`.

use super::{AppError, AppState};
use crate::error::QueryError;
use crate::models::ContentResponse;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{error, instrument};

#[derive(Debug, Deserialize)]
pub struct ContentParams {
    pub date: Option<String>,
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        let status = match &err {
            QueryError::UnknownSource(_) | QueryError::NoContent => StatusCode::NOT_FOUND,
            QueryError::InvalidDate(_) => StatusCode::BAD_REQUEST,
            QueryError::Store(e) => {
                error!(error = %e, "Content store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError::new(status, err.to_string())
    }
}

#[instrument(level = "info", skip(state))]
pub async fn handle_content(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(params): Query<ContentParams>,
) -> Result<Json<ContentResponse>, AppError> {
    let response = state.query.get(&source, params.date.as_deref()).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use crate::server::test_support::{get, send, state};
    use crate::store::ContentStore;
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_content_for_source_and_date() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        store.write("hacker_news", day, "# HN\n...").await.unwrap();

        let (status, body) = send(state(store), get("/api/content/hackernews?date=2024-01-01")).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Hacker News - 2024-01-01");
        assert_eq!(items[0]["content"], "# HN\n...");
        assert_eq!(items[0]["source"], "hackernews");
        assert!(items[0]["url"].is_null());
    }

    #[tokio::test]
    async fn test_content_error_statuses() {
        let dir = TempDir::new().unwrap();

        let (status, body) = send(state(ContentStore::new(dir.path())), get("/api/content/myspace")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Source 'myspace' not found");

        let (status, body) = send(
            state(ContentStore::new(dir.path())),
            get("/api/content/github?date=01-02-2024"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Invalid date format: 01-02-2024");

        let (status, body) = send(state(ContentStore::new(dir.path())), get("/api/content/all")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "No content available. Please run the services first.");
    }
}
