use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

use flowchat_types::api::UserSearchResult;

use crate::auth::AppState;

/// Search results are capped; clients page by refining the query instead.
const MAX_RESULTS: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Queries shorter than 2 characters match too much; return nothing.
    if query.q.chars().count() < 2 {
        return Ok(Json(Vec::new()));
    }

    let db = state.db.clone();
    let usernames = tokio::task::spawn_blocking(move || db.search_users(&query.q, MAX_RESULTS))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("user search failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(
        usernames
            .into_iter()
            .map(|username| UserSearchResult { username })
            .collect::<Vec<_>>(),
    ))
}
