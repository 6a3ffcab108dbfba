//! Chat companion endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use carebell_core::{CareError, ChatMessage, ChatMessageDraft, QuickAction};
use tracing::debug;

use super::DeleteResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Chat history, oldest first.
/// GET /api/chat
pub async fn list_chat(State(state): State<AppState>) -> ApiResult<Json<Vec<ChatMessage>>> {
    Ok(Json(state.records().list_chat()?))
}

/// Post a message. A user message is answered by the companion.
/// POST /api/chat
pub async fn post_chat(
    State(state): State<AppState>,
    Json(draft): Json<ChatMessageDraft>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    Ok(Json(state.companion().post(state.records(), draft)?))
}

/// DELETE /api/chat
pub async fn clear_chat(State(state): State<AppState>) -> ApiResult<Json<DeleteResponse>> {
    state.records().clear_chat()?;
    Ok(Json(DeleteResponse::ok()))
}

/// POST /api/chat/quick/:action
pub async fn quick_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let action = QuickAction::parse(&action)?;
    Ok(Json(
        state.companion().quick_action(state.records(), action)?,
    ))
}

/// Listen for one utterance and post it as a user message.
/// POST /api/chat/voice
pub async fn voice_message(State(state): State<AppState>) -> ApiResult<Json<Vec<ChatMessage>>> {
    let transcript = state.voice().listen().await.map_err(CareError::from)?;
    debug!(chars = transcript.len(), "Voice transcript received");
    Ok(Json(state.companion().post(
        state.records(),
        ChatMessageDraft::from_user(transcript),
    )?))
}
