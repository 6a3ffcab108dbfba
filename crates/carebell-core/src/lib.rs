//! carebell-core - Core library for carebell.
//!
//! This crate provides the reminder store, due evaluation, per-reminder
//! timers and the alert presenter behind the carebell personal-care service,
//! plus the care records kept alongside reminders.
//!
//! # Example
//!
//! ```ignore
//! use carebell_core::{CareConfig, ReminderDraft, ReminderRuntime};
//!
//! let runtime = ReminderRuntime::from_config(CareConfig::from_env())?;
//! runtime.start().await?;
//!
//! // Take pills every day at 08:00
//! let reminder = runtime
//!     .create_reminder(ReminderDraft::new("Take pills", "08:00", "daily"))
//!     .await?;
//!
//! // Watch alerts as they surface
//! let mut alerts = runtime.subscribe();
//! while let Some(event) = alerts.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

pub mod caregiver;
pub mod clock;
pub mod companion;
pub mod config;
mod db;
pub mod error;
pub mod events;
pub mod records;
pub mod reminders;
pub mod runtime;
pub mod types;
pub mod voice;

// Re-export commonly used types
pub use caregiver::{verify_access_code, CaregiverSummary};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use companion::{ChatCompanion, QuickAction};
pub use config::CareConfig;
pub use error::{CareError, CareResult, ErrorCode};
pub use events::{Alert, AlertBus, AlertEvent, AlertSubscriber};
pub use records::SqliteCareStore;
pub use reminders::{
    DueEvaluator, LogNotifier, NotificationPresenter, NotificationScheduler, Notifier,
    ReminderStore, SharedReminderStore, SqliteReminderStore, UnsupportedNotifier,
};
pub use runtime::ReminderRuntime;
pub use types::{
    ChatMessage, ChatMessageDraft, ContactDraft, ContactPatch, EmergencyContact, Frequency,
    Medication, MedicationDraft, MedicationPatch, Memory, MemoryDraft, ProfileDraft, ProfilePatch,
    Reminder, ReminderDraft, ReminderPatch, UserProfile, WeeklyPolicy,
};
pub use voice::{ScriptedVoiceInput, UnsupportedVoiceInput, VoiceError, VoiceInput};
