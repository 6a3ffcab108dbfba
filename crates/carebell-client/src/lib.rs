//! carebell-client - Client library for the carebell REST API.
//!
//! # Example
//!
//! ```ignore
//! use carebell_client::CareClient;
//! use carebell_core::{ReminderDraft, ReminderStore};
//!
//! let client = CareClient::new("http://localhost:8080")?;
//!
//! // Add a reminder
//! let reminder = client
//!     .create_reminder(&ReminderDraft::new("Take pills", "08:00", "daily"))
//!     .await?;
//!
//! // The client is also a ReminderStore
//! let today = client.list_today(chrono::Local::now().date_naive()).await?;
//! ```

mod client;

pub use client::{CareClient, HealthStatus, SnoozeResult};
pub use carebell_core::types::Reminder;
