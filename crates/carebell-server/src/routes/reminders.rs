//! Reminder and alert endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use carebell_core::{Alert, Clock, Reminder, ReminderDraft, ReminderPatch, ReminderStore};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::DeleteResponse;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// All reminders.
/// GET /api/reminders
pub async fn list_reminders(State(state): State<AppState>) -> ApiResult<Json<Vec<Reminder>>> {
    Ok(Json(state.runtime().store().list().await?))
}

#[derive(Debug, Deserialize)]
pub struct TodayQuery {
    /// Day to list instead of the server's today (`YYYY-MM-DD`).
    pub date: Option<NaiveDate>,
}

/// Reminders listed for today, by time of day.
/// GET /api/reminders/today
pub async fn today_reminders(
    State(state): State<AppState>,
    Query(query): Query<TodayQuery>,
) -> ApiResult<Json<Vec<Reminder>>> {
    let day = query.date.unwrap_or_else(|| state.clock().today());
    Ok(Json(state.runtime().store().list_today(day).await?))
}

/// GET /api/reminders/:id
pub async fn get_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Reminder>> {
    state
        .runtime()
        .store()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("reminder with id {} not found", id)))
}

/// Create a reminder and arm its timer.
/// POST /api/reminders
pub async fn create_reminder(
    State(state): State<AppState>,
    Json(draft): Json<ReminderDraft>,
) -> ApiResult<Json<Reminder>> {
    Ok(Json(state.runtime().create_reminder(draft).await?))
}

/// PATCH /api/reminders/:id
pub async fn update_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ReminderPatch>,
) -> ApiResult<Json<Reminder>> {
    Ok(Json(state.runtime().update_reminder(id, &patch).await?))
}

/// DELETE /api/reminders/:id
pub async fn delete_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.runtime().delete_reminder(id).await?;
    Ok(Json(DeleteResponse::ok()))
}

/// Mark a reminder done and clear its alert.
/// POST /api/reminders/:id/complete
pub async fn complete_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Reminder>> {
    Ok(Json(state.runtime().acknowledge(id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnoozeResponse {
    pub reminder_id: i64,
    pub until: NaiveDateTime,
}

/// POST /api/reminders/:id/snooze
pub async fn snooze_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SnoozeResponse>> {
    let until = state.runtime().snooze(id).await?;
    Ok(Json(SnoozeResponse {
        reminder_id: id,
        until,
    }))
}

/// Run a due check now.
/// POST /api/reminders/poll
pub async fn poll_reminders(State(state): State<AppState>) -> ApiResult<Json<Option<Alert>>> {
    Ok(Json(state.runtime().poll_once().await?))
}

/// The alert currently in front of the user.
/// GET /api/alerts/active
pub async fn active_alert(State(state): State<AppState>) -> ApiResult<Json<Option<Alert>>> {
    Ok(Json(state.runtime().current_alert()))
}

/// Hide the active alert without completing or snoozing it.
/// POST /api/alerts/dismiss
pub async fn dismiss_alert(State(state): State<AppState>) -> ApiResult<Json<Option<Alert>>> {
    Ok(Json(state.runtime().dismiss().await))
}
