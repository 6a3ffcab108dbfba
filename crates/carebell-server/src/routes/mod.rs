//! Route definitions for the REST API.

mod caregiver;
mod chat;
mod contacts;
mod health;
mod medications;
mod memories;
mod profile;
mod reminders;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::middleware::caregiver_auth_middleware;
use crate::state::AppState;

/// Body returned by delete endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

impl DeleteResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let caregiver_routes = Router::new()
        .route("/api/caregiver/summary", get(caregiver::caregiver_summary))
        .route_layer(from_fn_with_state(state.clone(), caregiver_auth_middleware));

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Profile
        .route(
            "/api/profile",
            get(profile::get_profile).post(profile::create_profile),
        )
        .route("/api/profile/:id", patch(profile::update_profile))
        // Reminders
        .route(
            "/api/reminders",
            get(reminders::list_reminders).post(reminders::create_reminder),
        )
        .route("/api/reminders/today", get(reminders::today_reminders))
        .route("/api/reminders/poll", post(reminders::poll_reminders))
        .route(
            "/api/reminders/:id",
            get(reminders::get_reminder)
                .patch(reminders::update_reminder)
                .delete(reminders::delete_reminder),
        )
        .route("/api/reminders/:id/complete", post(reminders::complete_reminder))
        .route("/api/reminders/:id/snooze", post(reminders::snooze_reminder))
        // Alerts
        .route("/api/alerts/active", get(reminders::active_alert))
        .route("/api/alerts/dismiss", post(reminders::dismiss_alert))
        // Memories
        .route(
            "/api/memories",
            get(memories::list_memories).post(memories::create_memory),
        )
        .route("/api/memories/:id", axum::routing::delete(memories::delete_memory))
        // Chat
        .route(
            "/api/chat",
            get(chat::list_chat)
                .post(chat::post_chat)
                .delete(chat::clear_chat),
        )
        .route("/api/chat/quick/:action", post(chat::quick_action))
        .route("/api/chat/voice", post(chat::voice_message))
        // Emergency contacts
        .route(
            "/api/emergency-contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route(
            "/api/emergency-contacts/:id",
            patch(contacts::update_contact).delete(contacts::delete_contact),
        )
        // Medications
        .route(
            "/api/medications",
            get(medications::list_medications).post(medications::create_medication),
        )
        .route(
            "/api/medications/:id",
            patch(medications::update_medication).delete(medications::delete_medication),
        )
        .merge(caregiver_routes)
        // Attach state
        .with_state(state)
}

pub use caregiver::*;
pub use chat::*;
pub use contacts::*;
pub use health::*;
pub use medications::*;
pub use memories::*;
pub use profile::*;
pub use reminders::*;
