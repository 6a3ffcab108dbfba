//! Reminder storage trait and implementations.
//!
//! Provides persistence for reminders and the "today" query.

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::clock::{SharedClock, SystemClock};
use crate::db;
use crate::error::{CareError, CareResult};
use crate::types::{
    parse_date, parse_time_of_day, Frequency, NewReminder, Reminder, ReminderPatch, WeeklyPolicy,
};

/// Trait for reminder storage operations.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// All reminders, oldest first.
    async fn list(&self) -> CareResult<Vec<Reminder>>;

    /// Active reminders that occur on `today`, ordered by time of day.
    async fn list_today(&self, today: NaiveDate) -> CareResult<Vec<Reminder>>;

    /// Get a reminder by ID.
    async fn get(&self, id: i64) -> CareResult<Option<Reminder>>;

    /// Store a new reminder, assigning its id and defaults.
    async fn create(&self, reminder: NewReminder) -> CareResult<Reminder>;

    /// Apply a patch; `NotFound` if the id is absent.
    async fn update(&self, id: i64, patch: &ReminderPatch) -> CareResult<Reminder>;

    /// Delete a reminder. Deleting an absent id is not an error.
    async fn delete(&self, id: i64) -> CareResult<()>;
}

/// Shared reminder store handle.
pub type SharedReminderStore = Arc<dyn ReminderStore>;

const COLUMNS: &str =
    "id, title, description, time, frequency, date, is_completed, is_active, created_at";

/// SQLite-backed reminder store.
pub struct SqliteReminderStore {
    conn: Mutex<Connection>,
    clock: SharedClock,
    weekly_policy: WeeklyPolicy,
}

impl SqliteReminderStore {
    /// Create a new store at the given path.
    pub fn new(path: impl AsRef<Path>) -> CareResult<Self> {
        Self::with_connection(db::open(path)?)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> CareResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> CareResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
            weekly_policy: WeeklyPolicy::default(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Stamp `createdAt` from `clock`.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Select weekly reminders with `policy`.
    pub fn with_weekly_policy(mut self, policy: WeeklyPolicy) -> Self {
        self.weekly_policy = policy;
        self
    }

    pub fn weekly_policy(&self) -> WeeklyPolicy {
        self.weekly_policy
    }

    fn init_schema(&self) -> CareResult<()> {
        let conn = db::lock(&self.conn)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS reminders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                time TEXT NOT NULL,
                frequency TEXT NOT NULL,
                date TEXT,
                is_completed INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reminders_active ON reminders(is_active);
            CREATE INDEX IF NOT EXISTS idx_reminders_time ON reminders(time);
        "#,
        )?;
        Ok(())
    }

    fn row_to_reminder(row: &rusqlite::Row<'_>) -> CareResult<Reminder> {
        let time: String = row.get(3)?;
        let frequency: String = row.get(4)?;
        let date: Option<String> = row.get(5)?;
        let is_completed: i32 = row.get(6)?;
        let is_active: i32 = row.get(7)?;
        let created_at: String = row.get(8)?;

        Ok(Reminder {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            time: parse_time_of_day("time", &time)?,
            frequency: Frequency::parse(&frequency)?,
            date: date.map(|d| parse_date("date", &d)).transpose()?,
            is_completed: is_completed != 0,
            is_active: is_active != 0,
            created_at: db::parse_timestamp(&created_at)?,
        })
    }

    fn fetch(conn: &Connection, id: i64) -> CareResult<Option<Reminder>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM reminders WHERE id = ?1"))?;
        stmt.query_row(params![id], |row| Ok(Self::row_to_reminder(row)))
            .optional()?
            .transpose()
    }

    fn query(conn: &Connection, sql: &str) -> CareResult<Vec<Reminder>> {
        let mut stmt = conn.prepare(sql)?;
        let results = stmt.query_map([], |row| Ok(Self::row_to_reminder(row)))?;
        results
            .map(|r| r.map_err(CareError::from).and_then(|inner| inner))
            .collect()
    }
}

#[async_trait]
impl ReminderStore for SqliteReminderStore {
    async fn list(&self) -> CareResult<Vec<Reminder>> {
        let conn = db::lock(&self.conn)?;
        Self::query(
            &conn,
            &format!("SELECT {COLUMNS} FROM reminders ORDER BY created_at, id"),
        )
    }

    async fn list_today(&self, today: NaiveDate) -> CareResult<Vec<Reminder>> {
        let active = {
            let conn = db::lock(&self.conn)?;
            Self::query(
                &conn,
                &format!(
                    "SELECT {COLUMNS} FROM reminders WHERE is_active = 1 \
                     ORDER BY time, created_at, id"
                ),
            )?
        };
        Ok(active
            .into_iter()
            .filter(|r| r.is_listed_on(today, self.weekly_policy))
            .collect())
    }

    async fn get(&self, id: i64) -> CareResult<Option<Reminder>> {
        let conn = db::lock(&self.conn)?;
        Self::fetch(&conn, id)
    }

    async fn create(&self, reminder: NewReminder) -> CareResult<Reminder> {
        let created_at = self.clock.now();
        let conn = db::lock(&self.conn)?;
        conn.execute(
            r#"INSERT INTO reminders
               (title, description, time, frequency, date, is_completed, is_active, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, 0, 1, ?6)"#,
            params![
                reminder.title,
                reminder.description,
                reminder.time.format("%H:%M").to_string(),
                reminder.frequency.as_ref(),
                reminder.date.map(|d| d.to_string()),
                db::format_timestamp(created_at),
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(reminder_id = id, title = %reminder.title, "Created reminder");
        Ok(reminder.into_reminder(id, created_at))
    }

    async fn update(&self, id: i64, patch: &ReminderPatch) -> CareResult<Reminder> {
        let conn = db::lock(&self.conn)?;
        let current = Self::fetch(&conn, id)?.ok_or_else(|| CareError::not_found("reminder", id))?;
        let updated = patch.apply(&current)?;

        conn.execute(
            r#"UPDATE reminders SET
               title = ?2, description = ?3, time = ?4, frequency = ?5, date = ?6,
               is_completed = ?7, is_active = ?8
               WHERE id = ?1"#,
            params![
                id,
                updated.title,
                updated.description,
                updated.time_label(),
                updated.frequency.as_ref(),
                updated.date.map(|d| d.to_string()),
                updated.is_completed as i32,
                updated.is_active as i32,
            ],
        )?;
        tracing::debug!(reminder_id = id, "Updated reminder");
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> CareResult<()> {
        let conn = db::lock(&self.conn)?;
        let removed = conn.execute("DELETE FROM reminders WHERE id = ?1", params![id])?;
        if removed > 0 {
            tracing::debug!(reminder_id = id, "Deleted reminder");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::ReminderDraft;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn store_at(now: &str) -> (SqliteReminderStore, ManualClock) {
        let clock = ManualClock::new(at(now));
        let store = SqliteReminderStore::in_memory()
            .unwrap()
            .with_clock(Arc::new(clock.clone()));
        (store, clock)
    }

    async fn add(store: &SqliteReminderStore, draft: ReminderDraft) -> Reminder {
        store.create(draft.validate().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_defaults() {
        let (store, _) = store_at("2024-03-04 09:00");
        let r = add(&store, ReminderDraft::new("Take pills", "08:00", "daily")).await;

        assert!(r.id > 0);
        assert!(!r.is_completed);
        assert!(r.is_active);
        assert_eq!(r.created_at, at("2024-03-04 09:00"));
        assert_eq!(store.get(r.id).await.unwrap(), Some(r));
    }

    #[tokio::test]
    async fn test_ids_never_reused() {
        let (store, _) = store_at("2024-03-04 09:00");
        let first = add(&store, ReminderDraft::new("A", "08:00", "daily")).await;
        store.delete(first.id).await.unwrap();
        let second = add(&store, ReminderDraft::new("B", "08:00", "daily")).await;
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_list_today_selection_and_order() {
        let (store, _) = store_at("2024-03-01 09:00");
        // 2024-03-04 is a Monday
        add(&store, ReminderDraft::new("Lunch", "12:30", "daily")).await;
        add(&store, ReminderDraft::new("Dentist", "09:00", "once").on_date("2024-03-04")).await;
        add(&store, ReminderDraft::new("Other day", "07:00", "once").on_date("2024-03-05")).await;
        add(&store, ReminderDraft::new("Bins", "06:45", "weekly")).await;
        let paused = add(&store, ReminderDraft::new("Paused", "05:00", "daily")).await;
        store.update(paused.id, &ReminderPatch::active(false)).await.unwrap();

        let titles: Vec<_> = store
            .list_today(day("2024-03-04"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Bins", "Dentist", "Lunch"]);

        let tuesday: Vec<_> = store
            .list_today(day("2024-03-05"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(tuesday, vec!["Other day", "Lunch"]);
    }

    #[tokio::test]
    async fn test_list_today_creation_day_policy() {
        let clock = ManualClock::new(at("2024-03-06 10:00")); // Wednesday
        let store = SqliteReminderStore::in_memory()
            .unwrap()
            .with_clock(Arc::new(clock))
            .with_weekly_policy(WeeklyPolicy::CreationDay);
        add(&store, ReminderDraft::new("Call Sarah", "18:00", "weekly")).await;

        assert!(store.list_today(day("2024-03-04")).await.unwrap().is_empty());
        assert_eq!(store.list_today(day("2024-03-13")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_by_creation() {
        let (store, clock) = store_at("2024-03-04 09:00");
        add(&store, ReminderDraft::new("First", "20:00", "daily")).await;
        clock.advance(chrono::Duration::minutes(1));
        add(&store, ReminderDraft::new("Second", "06:00", "daily")).await;

        let titles: Vec<_> = store.list().await.unwrap().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (store, _) = store_at("2024-03-04 09:00");
        let err = store
            .update(42, &ReminderPatch::completed())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_patch_leaves_record_untouched() {
        let (store, _) = store_at("2024-03-04 09:00");
        let r = add(&store, ReminderDraft::new("Walk", "10:00", "daily")).await;

        let patch = ReminderPatch {
            title: Some("Evening walk".to_string()),
            time: Some("not a time".to_string()),
            ..Default::default()
        };
        assert!(store.update(r.id, &patch).await.is_err());
        assert_eq!(store.get(r.id).await.unwrap().unwrap().title, "Walk");
    }

    #[tokio::test]
    async fn test_delete_twice_is_ok() {
        let (store, _) = store_at("2024-03-04 09:00");
        let r = add(&store, ReminderDraft::new("Walk", "10:00", "daily")).await;
        store.delete(r.id).await.unwrap();
        store.delete(r.id).await.unwrap();
        assert!(store.get(r.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.db");
        {
            let store = SqliteReminderStore::new(&path).unwrap();
            add(&store, ReminderDraft::new("Water plants", "17:00", "weekly")).await;
        }
        let reopened = SqliteReminderStore::new(&path).unwrap();
        let all = reopened.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].frequency, Frequency::Weekly);
    }
}
