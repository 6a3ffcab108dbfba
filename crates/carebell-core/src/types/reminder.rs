//! Reminder record types.
//!
//! - `Reminder`: a stored reminder
//! - `ReminderDraft`: raw form input, validated into a `NewReminder`
//! - `ReminderPatch`: partial update applied to an existing reminder
//! - `Frequency` / `WeeklyPolicy`: recurrence and weekly day selection

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{CareError, CareResult};

/// Recurrence policy of a reminder.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Frequency {
    /// Due on a single calendar date.
    Once,
    /// Due every day.
    Daily,
    /// Due one day a week, see [`WeeklyPolicy`].
    Weekly,
}

impl Frequency {
    /// Repeat cadence after the first occurrence (None for `Once`).
    pub fn period(&self) -> Option<chrono::Duration> {
        match self {
            Frequency::Once => None,
            Frequency::Daily => Some(chrono::Duration::days(1)),
            Frequency::Weekly => Some(chrono::Duration::weeks(1)),
        }
    }

    /// Whether reminders with this frequency repeat.
    pub fn is_repeating(&self) -> bool {
        !matches!(self, Frequency::Once)
    }

    /// Parse user input, mapping failures to a validation error.
    pub fn parse(value: &str) -> CareResult<Self> {
        value.trim().parse::<Frequency>().map_err(|_| {
            CareError::invalid_format("frequency", value, "Use one of: once, daily, weekly")
        })
    }
}

/// Which weekday a `weekly` reminder falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WeeklyPolicy {
    /// Every weekly reminder is due on the same weekday.
    Fixed { weekday: Weekday },
    /// A weekly reminder is due on the weekday it was created.
    CreationDay,
}

impl Default for WeeklyPolicy {
    fn default() -> Self {
        WeeklyPolicy::Fixed {
            weekday: Weekday::Mon,
        }
    }
}

impl WeeklyPolicy {
    /// Designated weekday for a reminder created at `created_at`.
    pub fn weekday_for(&self, created_at: NaiveDateTime) -> Weekday {
        match self {
            WeeklyPolicy::Fixed { weekday } => *weekday,
            WeeklyPolicy::CreationDay => created_at.weekday(),
        }
    }
}

/// `HH:MM` (de)serialization for `NaiveTime`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Parse an `HH:MM` wall-clock time.
pub fn parse_time_of_day(field: &str, value: &str) -> CareResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), hhmm::FORMAT)
        .map_err(|_| CareError::invalid_format(field, value, "Use 24-hour HH:MM, e.g. 08:30"))
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &str, value: &str) -> CareResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| CareError::invalid_format(field, value, "Use YYYY-MM-DD, e.g. 2024-03-04"))
}

/// A stored reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// Store-assigned identifier, never reused.
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Time of day the reminder fires.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub frequency: Frequency,
    /// Calendar date, meaningful only for `Once`.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub is_completed: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Reminder {
    /// Whether the reminder's day-selection rule admits `date`.
    ///
    /// Ignores `is_active` and `is_completed`.
    pub fn occurs_on(&self, date: NaiveDate, policy: WeeklyPolicy) -> bool {
        match self.frequency {
            Frequency::Once => self.date == Some(date),
            Frequency::Daily => true,
            Frequency::Weekly => date.weekday() == policy.weekday_for(self.created_at),
        }
    }

    /// Whether the reminder belongs in the "today" list for `date`.
    pub fn is_listed_on(&self, date: NaiveDate, policy: WeeklyPolicy) -> bool {
        self.is_active && self.occurs_on(date, policy)
    }

    /// Time formatted as `HH:MM`.
    pub fn time_label(&self) -> String {
        self.time.format(hhmm::FORMAT).to_string()
    }
}

/// Unvalidated reminder fields as submitted by a form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub time: String,
    pub frequency: String,
    #[serde(default)]
    pub date: Option<String>,
}

impl ReminderDraft {
    /// Create a draft from raw field values.
    pub fn new(
        title: impl Into<String>,
        time: impl Into<String>,
        frequency: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            time: time.into(),
            frequency: frequency.into(),
            date: None,
        }
    }

    /// Builder method to set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the date
    pub fn on_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Validate the draft.
    pub fn validate(self) -> CareResult<NewReminder> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(CareError::missing_field("title"));
        }
        if self.time.trim().is_empty() {
            return Err(CareError::missing_field("time"));
        }
        let time = parse_time_of_day("time", &self.time)?;
        let frequency = Frequency::parse(&self.frequency)?;
        let date = non_empty(self.date)
            .map(|d| parse_date("date", &d))
            .transpose()?;

        if frequency == Frequency::Once && date.is_none() {
            return Err(CareError::missing_field("date"));
        }

        Ok(NewReminder {
            title,
            description: non_empty(self.description),
            time,
            frequency,
            date,
        })
    }
}

/// Validated reminder fields ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub time: NaiveTime,
    pub frequency: Frequency,
    pub date: Option<NaiveDate>,
}

impl NewReminder {
    /// Turn into a stored reminder with the given identity.
    pub fn into_reminder(self, id: i64, created_at: NaiveDateTime) -> Reminder {
        Reminder {
            id,
            title: self.title,
            description: self.description,
            time: self.time,
            frequency: self.frequency,
            date: self.date,
            is_completed: false,
            is_active: true,
            created_at,
        }
    }
}

/// Partial update of a reminder.
///
/// Text fields are raw input; an empty `description` or `date` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ReminderPatch {
    /// Patch marking a reminder complete.
    pub fn completed() -> Self {
        Self {
            is_completed: Some(true),
            ..Default::default()
        }
    }

    /// Patch setting `is_active`.
    pub fn active(active: bool) -> Self {
        Self {
            is_active: Some(active),
            ..Default::default()
        }
    }

    /// Whether the patch changes when or how often the reminder fires.
    pub fn touches_schedule(&self) -> bool {
        self.time.is_some()
            || self.frequency.is_some()
            || self.date.is_some()
            || self.is_active.is_some()
            || self.is_completed.is_some()
    }

    /// Apply the patch to a copy of `reminder`, validating the result.
    pub fn apply(&self, reminder: &Reminder) -> CareResult<Reminder> {
        let mut updated = reminder.clone();

        if let Some(title) = &self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(CareError::missing_field("title"));
            }
            updated.title = title.to_string();
        }
        if let Some(description) = &self.description {
            updated.description = non_empty(Some(description.clone()));
        }
        if let Some(time) = &self.time {
            updated.time = parse_time_of_day("time", time)?;
        }
        if let Some(frequency) = &self.frequency {
            updated.frequency = Frequency::parse(frequency)?;
        }
        if let Some(date) = &self.date {
            updated.date = non_empty(Some(date.clone()))
                .map(|d| parse_date("date", &d))
                .transpose()?;
        }
        if let Some(done) = self.is_completed {
            updated.is_completed = done;
        }
        if let Some(active) = self.is_active {
            updated.is_active = active;
        }

        if updated.frequency == Frequency::Once && updated.date.is_none() {
            return Err(CareError::missing_field("date"));
        }

        Ok(updated)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
