//! Medication endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use carebell_core::{Medication, MedicationDraft, MedicationPatch};

use super::DeleteResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/medications
pub async fn list_medications(State(state): State<AppState>) -> ApiResult<Json<Vec<Medication>>> {
    Ok(Json(state.records().list_medications()?))
}

/// POST /api/medications
pub async fn create_medication(
    State(state): State<AppState>,
    Json(draft): Json<MedicationDraft>,
) -> ApiResult<Json<Medication>> {
    Ok(Json(state.records().create_medication(draft)?))
}

/// PATCH /api/medications/:id
pub async fn update_medication(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<MedicationPatch>,
) -> ApiResult<Json<Medication>> {
    Ok(Json(state.records().update_medication(id, &patch)?))
}

/// DELETE /api/medications/:id
pub async fn delete_medication(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.records().delete_medication(id)?;
    Ok(Json(DeleteResponse::ok()))
}
