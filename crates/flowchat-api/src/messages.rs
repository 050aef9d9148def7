use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

use flowchat_types::api::{MessageResponse, ReactionGroup};

use crate::auth::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user: String,
    /// Counterpart identity for a private conversation; absent means the
    /// global scope.
    pub conversation: Option<String>,
}

/// History read path: ascending by timestamp, filtered by scope.
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || {
        db.query_messages(&query.user, query.conversation.as_deref())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("history query failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let messages: Vec<MessageResponse> = rows
        .into_iter()
        .map(|row| MessageResponse {
            id: row.id,
            sender: row.sender,
            recipient: row.recipient,
            text: row.text,
            timestamp: row.timestamp,
        })
        .collect();

    Ok(Json(messages))
}

/// Grouped reaction view for one message.
pub async fn get_reactions(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
) -> Json<Vec<ReactionGroup>> {
    Json(state.router.reaction_groups(message_id).await)
}
