//! Caregiver overview of the day's reminders.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{CareError, CareResult};
use crate::records::SqliteCareStore;
use crate::reminders::ReminderStore;
use crate::types::{EmergencyContact, Reminder};

/// Number of reminders listed under recent activity.
pub const RECENT_LIMIT: usize = 5;

/// Check a caregiver access code against the expected one.
pub fn verify_access_code(expected: &str, supplied: Option<&str>) -> CareResult<()> {
    match supplied.map(str::trim) {
        Some(code) if !code.is_empty() && code == expected => Ok(()),
        Some(_) => Err(CareError::access_denied("Invalid caregiver access code")),
        None => Err(CareError::access_denied("Caregiver access code required")),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaregiverSummary {
    pub date: NaiveDate,
    pub completed_today: usize,
    pub total_today: usize,
    /// Reminders, on any day, switched off without being completed.
    pub missed: usize,
    pub last_chat_at: Option<NaiveDateTime>,
    pub recent_reminders: Vec<Reminder>,
    pub contacts: Vec<EmergencyContact>,
}

impl CaregiverSummary {
    pub async fn build(
        reminders: &dyn ReminderStore,
        records: &SqliteCareStore,
        today: NaiveDate,
    ) -> CareResult<Self> {
        let todays = reminders.list_today(today).await?;
        let all = reminders.list().await?;
        let missed = all
            .iter()
            .filter(|r| !r.is_completed && !r.is_active)
            .count();
        let mut recent = all;
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        recent.truncate(RECENT_LIMIT);

        Ok(Self {
            date: today,
            completed_today: todays.iter().filter(|r| r.is_completed).count(),
            total_today: todays.len(),
            missed,
            last_chat_at: records.last_chat()?.map(|m| m.created_at),
            recent_reminders: recent,
            contacts: records.list_contacts()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::reminders::SqliteReminderStore;
    use crate::types::{ChatMessageDraft, ReminderDraft, ReminderPatch};
    use std::sync::Arc;

    #[test]
    fn test_verify_access_code() {
        assert!(verify_access_code("1234", Some("1234")).is_ok());
        assert!(verify_access_code("1234", Some(" 1234 ")).is_ok());
        assert!(verify_access_code("1234", Some("0000")).is_err());
        assert!(verify_access_code("1234", Some("")).is_err());
        assert!(verify_access_code("1234", None).is_err());
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let clock = ManualClock::new(
            NaiveDateTime::parse_from_str("2024-03-04 07:00", "%Y-%m-%d %H:%M").unwrap(),
        );
        let reminders = SqliteReminderStore::in_memory()
            .unwrap()
            .with_clock(Arc::new(clock.clone()));
        let records = SqliteCareStore::in_memory()
            .unwrap()
            .with_clock(Arc::new(clock.clone()));

        let mut ids = Vec::new();
        for (title, time) in [("Pills", "08:00"), ("Walk", "10:00"), ("Water", "12:00")] {
            let draft = ReminderDraft::new(title, time, "daily").validate().unwrap();
            ids.push(reminders.create(draft).await.unwrap().id);
            clock.advance(chrono::Duration::minutes(1));
        }
        reminders.update(ids[0], &ReminderPatch::completed()).await.unwrap();
        reminders.update(ids[1], &ReminderPatch::active(false)).await.unwrap();
        records.seed_default_contacts().unwrap();
        records
            .add_chat_message(ChatMessageDraft::from_user("Hello"))
            .unwrap();

        let summary = CaregiverSummary::build(&reminders, &records, clock.now().date())
            .await
            .unwrap();
        assert_eq!(summary.completed_today, 1);
        assert_eq!(summary.total_today, 2);
        assert_eq!(summary.missed, 1);
        assert_eq!(summary.recent_reminders.len(), 3);
        assert_eq!(summary.recent_reminders[0].id, ids[2]);
        assert_eq!(summary.contacts.len(), 3);
        assert!(summary.last_chat_at.is_some());
    }
}
