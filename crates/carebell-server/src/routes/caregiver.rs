//! Caregiver summary endpoint.

use axum::{extract::State, Json};
use carebell_core::{CaregiverSummary, Clock};

use crate::error::ApiResult;
use crate::state::AppState;

/// Today's overview for the caregiver. Requires `X-Caregiver-Code`.
/// GET /api/caregiver/summary
pub async fn caregiver_summary(
    State(state): State<AppState>,
) -> ApiResult<Json<CaregiverSummary>> {
    let store = state.runtime().store();
    let summary =
        CaregiverSummary::build(store.as_ref(), state.records(), state.clock().today()).await?;
    Ok(Json(summary))
}
