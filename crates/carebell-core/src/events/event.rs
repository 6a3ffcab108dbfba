//! Alert lifecycle events.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Reminder;

/// An alert presented to the user for a due reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub reminder_id: i64,
    pub title: String,
    pub body: String,
    /// Whether this alert is a snoozed reminder coming back.
    pub snoozed: bool,
    pub shown_at: NaiveDateTime,
}

impl Alert {
    /// Build the alert for `reminder`.
    pub fn for_reminder(reminder: &Reminder, snoozed: bool, shown_at: NaiveDateTime) -> Self {
        let title = if snoozed {
            "Reminder Snoozed"
        } else {
            "Reminder"
        };
        let body = match &reminder.description {
            Some(description) => format!("Time to: {} ({})", reminder.title, description),
            None => format!("Time to: {}", reminder.title),
        };
        Self {
            id: Uuid::new_v4(),
            reminder_id: reminder.id,
            title: title.to_string(),
            body,
            snoozed,
            shown_at,
        }
    }
}

/// Alert lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertEvent {
    /// A reminder became the active alert.
    Surfaced { alert: Alert },
    /// The user confirmed the reminder; it is now completed.
    Acknowledged { reminder_id: i64 },
    /// The alert was hidden until `until`.
    Snoozed {
        reminder_id: i64,
        until: NaiveDateTime,
    },
    /// The alert was hidden with no store change.
    Dismissed { reminder_id: i64 },
    /// The displayed notification closed itself after going untouched.
    /// The alert stays active until the user acts on it.
    Closed { alert_id: Uuid, reminder_id: i64 },
}

impl AlertEvent {
    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Surfaced { .. } => "alert.surfaced",
            Self::Acknowledged { .. } => "alert.acknowledged",
            Self::Snoozed { .. } => "alert.snoozed",
            Self::Dismissed { .. } => "alert.dismissed",
            Self::Closed { .. } => "alert.closed",
        }
    }

    /// Get the reminder ID this event relates to
    pub fn reminder_id(&self) -> i64 {
        match self {
            Self::Surfaced { alert } => alert.reminder_id,
            Self::Acknowledged { reminder_id }
            | Self::Snoozed { reminder_id, .. }
            | Self::Dismissed { reminder_id }
            | Self::Closed { reminder_id, .. } => *reminder_id,
        }
    }
}
