//! Memory board endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use carebell_core::{Memory, MemoryDraft};

use super::DeleteResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Memories, newest first.
/// GET /api/memories
pub async fn list_memories(State(state): State<AppState>) -> ApiResult<Json<Vec<Memory>>> {
    Ok(Json(state.records().list_memories()?))
}

/// POST /api/memories
pub async fn create_memory(
    State(state): State<AppState>,
    Json(draft): Json<MemoryDraft>,
) -> ApiResult<Json<Memory>> {
    Ok(Json(state.records().create_memory(draft)?))
}

/// DELETE /api/memories/:id
pub async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.records().delete_memory(id)?;
    Ok(Json(DeleteResponse::ok()))
}
