//! Profile endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use carebell_core::{ProfileDraft, ProfilePatch, UserProfile};

use crate::error::ApiResult;
use crate::state::AppState;

/// Get the profile, or `null` before one is created.
/// GET /api/profile
pub async fn get_profile(State(state): State<AppState>) -> ApiResult<Json<Option<UserProfile>>> {
    Ok(Json(state.records().get_profile()?))
}

/// Create the profile.
/// POST /api/profile
pub async fn create_profile(
    State(state): State<AppState>,
    Json(draft): Json<ProfileDraft>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.records().create_profile(draft)?))
}

/// Update profile fields.
/// PATCH /api/profile/:id
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ProfilePatch>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.records().update_profile(id, &patch)?))
}
