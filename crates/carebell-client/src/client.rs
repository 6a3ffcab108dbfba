//! Client implementation for the carebell REST API.

use std::time::Duration;

use async_trait::async_trait;
use carebell_core::caregiver::CaregiverSummary;
use carebell_core::error::{CareError, CareResult};
use carebell_core::events::Alert;
use carebell_core::reminders::ReminderStore;
use carebell_core::types::{
    hhmm, ChatMessage, ChatMessageDraft, ContactDraft, ContactPatch, EmergencyContact, Medication,
    MedicationDraft, MedicationPatch, Memory, MemoryDraft, NewReminder, ProfileDraft, ProfilePatch,
    Reminder, ReminderDraft, ReminderPatch, UserProfile,
};
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const CAREGIVER_CODE_HEADER: &str = "X-Caregiver-Code";

/// Client for the carebell REST API.
pub struct CareClient {
    client: Client,
    base_url: String,
    caregiver_code: Option<String>,
}

/// Server health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub scheduler_running: bool,
    pub active_timers: usize,
    pub alert_active: bool,
    pub version: String,
}

/// When a snoozed reminder comes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnoozeResult {
    pub reminder_id: i64,
    pub until: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CareClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> CareResult<Self> {
        Self::with_options(Some(base_url), None, None)
    }

    /// Create a client with options.
    pub fn with_options(
        base_url: Option<&str>,
        caregiver_code: Option<&str>,
        timeout: Option<Duration>,
    ) -> CareResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CareError::api(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            caregiver_code: caregiver_code.map(|s| s.to_string()),
        })
    }

    /// Create a client from `CAREBELL_URL` and `CAREBELL_CAREGIVER_CODE`.
    pub fn from_env() -> CareResult<Self> {
        let base_url = std::env::var("CAREBELL_URL").ok();
        let caregiver_code = std::env::var("CAREBELL_CAREGIVER_CODE").ok();
        Self::with_options(base_url.as_deref(), caregiver_code.as_deref(), None)
    }

    /// Use `code` for caregiver requests.
    pub fn with_caregiver_code(mut self, code: impl Into<String>) -> Self {
        self.caregiver_code = Some(code.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> CareResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| CareError::api(format!("Failed to {}: {}", what, e)))?;

        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| CareError::parse(format!("Failed to parse response: {}", e)))
    }

    async fn check(response: Response) -> CareResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        tracing::debug!(status = status.as_u16(), %message, "Request rejected");
        Err(CareError::from_http_status(status.as_u16(), &message))
    }

    async fn delete_path(&self, path: &str, what: &str) -> CareResult<()> {
        let _: serde_json::Value = self
            .execute(self.client.delete(self.url(path)), what)
            .await?;
        Ok(())
    }

    /// GET /health
    pub async fn health(&self) -> CareResult<HealthStatus> {
        self.execute(self.client.get(self.url("/health")), "check health")
            .await
    }

    // ---- Reminders ----

    pub async fn list_reminders(&self) -> CareResult<Vec<Reminder>> {
        self.execute(self.client.get(self.url("/api/reminders")), "list reminders")
            .await
    }

    /// Reminders listed on `day`, or on the server's today when `None`.
    pub async fn today_reminders(&self, day: Option<NaiveDate>) -> CareResult<Vec<Reminder>> {
        let mut request = self.client.get(self.url("/api/reminders/today"));
        if let Some(day) = day {
            request = request.query(&[("date", day.format("%Y-%m-%d").to_string())]);
        }
        self.execute(request, "list today's reminders").await
    }

    /// Fetch one reminder; `None` if the server has no such id.
    pub async fn get_reminder(&self, id: i64) -> CareResult<Option<Reminder>> {
        let request = self.client.get(self.url(&format!("/api/reminders/{}", id)));
        match self.execute(request, "get reminder").await {
            Ok(reminder) => Ok(Some(reminder)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_reminder(&self, draft: &ReminderDraft) -> CareResult<Reminder> {
        let request = self.client.post(self.url("/api/reminders")).json(draft);
        self.execute(request, "create reminder").await
    }

    pub async fn update_reminder(&self, id: i64, patch: &ReminderPatch) -> CareResult<Reminder> {
        let request = self
            .client
            .patch(self.url(&format!("/api/reminders/{}", id)))
            .json(patch);
        self.execute(request, "update reminder").await
    }

    pub async fn delete_reminder(&self, id: i64) -> CareResult<()> {
        self.delete_path(&format!("/api/reminders/{}", id), "delete reminder")
            .await
    }

    /// Acknowledge: marks the reminder completed and clears its alert.
    pub async fn complete_reminder(&self, id: i64) -> CareResult<Reminder> {
        let request = self
            .client
            .post(self.url(&format!("/api/reminders/{}/complete", id)));
        self.execute(request, "complete reminder").await
    }

    pub async fn snooze_reminder(&self, id: i64) -> CareResult<SnoozeResult> {
        let request = self
            .client
            .post(self.url(&format!("/api/reminders/{}/snooze", id)));
        self.execute(request, "snooze reminder").await
    }

    /// Ask the server to run a due check now.
    pub async fn poll(&self) -> CareResult<Option<Alert>> {
        self.execute(
            self.client.post(self.url("/api/reminders/poll")),
            "poll reminders",
        )
        .await
    }

    pub async fn active_alert(&self) -> CareResult<Option<Alert>> {
        self.execute(self.client.get(self.url("/api/alerts/active")), "get alert")
            .await
    }

    pub async fn dismiss_alert(&self) -> CareResult<Option<Alert>> {
        self.execute(
            self.client.post(self.url("/api/alerts/dismiss")),
            "dismiss alert",
        )
        .await
    }

    // ---- Profile ----

    pub async fn get_profile(&self) -> CareResult<Option<UserProfile>> {
        self.execute(self.client.get(self.url("/api/profile")), "get profile")
            .await
    }

    pub async fn create_profile(&self, draft: &ProfileDraft) -> CareResult<UserProfile> {
        let request = self.client.post(self.url("/api/profile")).json(draft);
        self.execute(request, "create profile").await
    }

    pub async fn update_profile(&self, id: i64, patch: &ProfilePatch) -> CareResult<UserProfile> {
        let request = self
            .client
            .patch(self.url(&format!("/api/profile/{}", id)))
            .json(patch);
        self.execute(request, "update profile").await
    }

    // ---- Memories ----

    pub async fn list_memories(&self) -> CareResult<Vec<Memory>> {
        self.execute(self.client.get(self.url("/api/memories")), "list memories")
            .await
    }

    pub async fn create_memory(&self, content: &str) -> CareResult<Memory> {
        let request = self
            .client
            .post(self.url("/api/memories"))
            .json(&MemoryDraft::new(content));
        self.execute(request, "create memory").await
    }

    pub async fn delete_memory(&self, id: i64) -> CareResult<()> {
        self.delete_path(&format!("/api/memories/{}", id), "delete memory")
            .await
    }

    // ---- Chat ----

    pub async fn chat_history(&self) -> CareResult<Vec<ChatMessage>> {
        self.execute(self.client.get(self.url("/api/chat")), "get chat history")
            .await
    }

    /// Send a user message; returns it followed by the companion's reply.
    pub async fn send_message(&self, content: &str) -> CareResult<Vec<ChatMessage>> {
        let request = self
            .client
            .post(self.url("/api/chat"))
            .json(&ChatMessageDraft::from_user(content));
        self.execute(request, "send message").await
    }

    pub async fn quick_action(&self, action: &str) -> CareResult<Vec<ChatMessage>> {
        let request = self
            .client
            .post(self.url(&format!("/api/chat/quick/{}", action)));
        self.execute(request, "send quick action").await
    }

    /// Have the server listen for one utterance and post it.
    pub async fn voice_message(&self) -> CareResult<Vec<ChatMessage>> {
        self.execute(
            self.client.post(self.url("/api/chat/voice")),
            "send voice message",
        )
        .await
    }

    pub async fn clear_chat(&self) -> CareResult<()> {
        self.delete_path("/api/chat", "clear chat").await
    }

    // ---- Emergency contacts ----

    pub async fn list_contacts(&self) -> CareResult<Vec<EmergencyContact>> {
        self.execute(
            self.client.get(self.url("/api/emergency-contacts")),
            "list contacts",
        )
        .await
    }

    pub async fn create_contact(&self, draft: &ContactDraft) -> CareResult<EmergencyContact> {
        let request = self
            .client
            .post(self.url("/api/emergency-contacts"))
            .json(draft);
        self.execute(request, "create contact").await
    }

    pub async fn update_contact(
        &self,
        id: i64,
        patch: &ContactPatch,
    ) -> CareResult<EmergencyContact> {
        let request = self
            .client
            .patch(self.url(&format!("/api/emergency-contacts/{}", id)))
            .json(patch);
        self.execute(request, "update contact").await
    }

    pub async fn delete_contact(&self, id: i64) -> CareResult<()> {
        self.delete_path(&format!("/api/emergency-contacts/{}", id), "delete contact")
            .await
    }

    // ---- Medications ----

    pub async fn list_medications(&self) -> CareResult<Vec<Medication>> {
        self.execute(
            self.client.get(self.url("/api/medications")),
            "list medications",
        )
        .await
    }

    pub async fn create_medication(&self, draft: &MedicationDraft) -> CareResult<Medication> {
        let request = self.client.post(self.url("/api/medications")).json(draft);
        self.execute(request, "create medication").await
    }

    pub async fn update_medication(
        &self,
        id: i64,
        patch: &MedicationPatch,
    ) -> CareResult<Medication> {
        let request = self
            .client
            .patch(self.url(&format!("/api/medications/{}", id)))
            .json(patch);
        self.execute(request, "update medication").await
    }

    pub async fn delete_medication(&self, id: i64) -> CareResult<()> {
        self.delete_path(&format!("/api/medications/{}", id), "delete medication")
            .await
    }

    // ---- Caregiver ----

    /// Caregiver summary, sent with the configured access code.
    pub async fn caregiver_summary(&self) -> CareResult<CaregiverSummary> {
        let mut request = self.client.get(self.url("/api/caregiver/summary"));
        if let Some(code) = &self.caregiver_code {
            request = request.header(CAREGIVER_CODE_HEADER, code);
        }
        self.execute(request, "get caregiver summary").await
    }
}

/// Remote reminder store backed by the REST API.
#[async_trait]
impl ReminderStore for CareClient {
    async fn list(&self) -> CareResult<Vec<Reminder>> {
        self.list_reminders().await
    }

    async fn list_today(&self, today: NaiveDate) -> CareResult<Vec<Reminder>> {
        self.today_reminders(Some(today)).await
    }

    async fn get(&self, id: i64) -> CareResult<Option<Reminder>> {
        self.get_reminder(id).await
    }

    async fn create(&self, reminder: NewReminder) -> CareResult<Reminder> {
        let body = json!({
            "title": reminder.title,
            "description": reminder.description,
            "time": reminder.time.format(hhmm::FORMAT).to_string(),
            "frequency": reminder.frequency.as_ref(),
            "date": reminder.date.map(|d| d.format("%Y-%m-%d").to_string()),
        });
        let request = self.client.post(self.url("/api/reminders")).json(&body);
        self.execute(request, "create reminder").await
    }

    async fn update(&self, id: i64, patch: &ReminderPatch) -> CareResult<Reminder> {
        self.update_reminder(id, patch).await
    }

    async fn delete(&self, id: i64) -> CareResult<()> {
        self.delete_reminder(id).await
    }
}

impl std::fmt::Debug for CareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CareClient")
            .field("base_url", &self.base_url)
            .field("caregiver_code", &self.caregiver_code.as_ref().map(|_| "***"))
            .finish()
    }
}
