//! Emergency contact endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use carebell_core::{ContactDraft, ContactPatch, EmergencyContact};

use super::DeleteResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/emergency-contacts
pub async fn list_contacts(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<EmergencyContact>>> {
    Ok(Json(state.records().list_contacts()?))
}

/// POST /api/emergency-contacts
pub async fn create_contact(
    State(state): State<AppState>,
    Json(draft): Json<ContactDraft>,
) -> ApiResult<Json<EmergencyContact>> {
    Ok(Json(state.records().create_contact(draft)?))
}

/// PATCH /api/emergency-contacts/:id
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ContactPatch>,
) -> ApiResult<Json<EmergencyContact>> {
    Ok(Json(state.records().update_contact(id, &patch)?))
}

/// DELETE /api/emergency-contacts/:id
pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.records().delete_contact(id)?;
    Ok(Json(DeleteResponse::ok()))
}
