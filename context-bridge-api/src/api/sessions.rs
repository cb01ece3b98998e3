use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use context_bridge::Turn;
use serde::{Deserialize, Serialize};

use crate::core::context_store::ContextStore;
use crate::models::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct SessionState {
    pub store: ContextStore,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub session_key: String,
    pub turns: Vec<Turn>,
    pub context_length: usize,
    pub last_updated: i64,
    pub expires_at: i64,
}

/// Stored conversation for one session, 404 once absent or expired
pub async fn get_session(
    State(state): State<SessionState>,
    Path(session_key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .store
        .try_load_record(&session_key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session {session_key} not found")))?;

    Ok(Json(SessionView {
        session_key: record.session_key,
        context_length: record.conversation.len(),
        turns: record.conversation,
        last_updated: record.last_updated,
        expires_at: record.ttl,
    }))
}
