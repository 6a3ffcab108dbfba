//! SQLite storage for the care records kept alongside reminders.

use chrono::NaiveTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::clock::{SharedClock, SystemClock};
use crate::db;
use crate::error::{CareError, CareResult};
use crate::types::{
    hhmm, ChatMessage, ChatMessageDraft, ContactDraft, ContactPatch, EmergencyContact, Medication,
    MedicationDraft, MedicationPatch, Memory, MemoryDraft, ProfileDraft, ProfilePatch, UserProfile,
};

const PROFILE_COLUMNS: &str = "id, name, age, photo, address, emergency_contact, emergency_phone, \
     medical_info, caregiver_code, preferences";
const MEDICATION_COLUMNS: &str =
    "id, name, dosage, frequency, time_slots, instructions, is_active, created_at";

/// SQLite-backed store for profile, memories, chat, contacts and medications.
pub struct SqliteCareStore {
    conn: Mutex<Connection>,
    clock: SharedClock,
}

impl SqliteCareStore {
    /// Create a new store at the given path
    pub fn new(path: impl AsRef<Path>) -> CareResult<Self> {
        Self::with_connection(db::open(path)?)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> CareResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> CareResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Stamp `createdAt` from `clock`.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    fn init_schema(&self) -> CareResult<()> {
        let conn = db::lock(&self.conn)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS user_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                age INTEGER,
                photo TEXT,
                address TEXT,
                emergency_contact TEXT,
                emergency_phone TEXT,
                medical_info TEXT,
                caregiver_code TEXT NOT NULL,
                preferences TEXT
            );

            CREATE TABLE IF NOT EXISTS memories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                is_from_user INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS emergency_contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                relationship TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS medications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                dosage TEXT NOT NULL,
                frequency TEXT NOT NULL,
                time_slots TEXT NOT NULL,
                instructions TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    // ---- Profile ----

    fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
        Ok(UserProfile {
            id: row.get(0)?,
            name: row.get(1)?,
            age: row.get(2)?,
            photo: row.get(3)?,
            address: row.get(4)?,
            emergency_contact: row.get(5)?,
            emergency_phone: row.get(6)?,
            medical_info: row.get(7)?,
            caregiver_code: row.get(8)?,
            preferences: row.get(9)?,
        })
    }

    fn fetch_profile(conn: &Connection, id: Option<i64>) -> CareResult<Option<UserProfile>> {
        let profile = match id {
            Some(id) => conn
                .query_row(
                    &format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = ?1"),
                    params![id],
                    Self::row_to_profile,
                )
                .optional()?,
            None => conn
                .query_row(
                    &format!("SELECT {PROFILE_COLUMNS} FROM user_profiles ORDER BY id LIMIT 1"),
                    [],
                    Self::row_to_profile,
                )
                .optional()?,
        };
        Ok(profile)
    }

    fn write_profile(conn: &Connection, profile: &UserProfile) -> CareResult<()> {
        conn.execute(
            r#"UPDATE user_profiles SET
               name = ?2, age = ?3, photo = ?4, address = ?5, emergency_contact = ?6,
               emergency_phone = ?7, medical_info = ?8, caregiver_code = ?9, preferences = ?10
               WHERE id = ?1"#,
            params![
                profile.id,
                profile.name,
                profile.age,
                profile.photo,
                profile.address,
                profile.emergency_contact,
                profile.emergency_phone,
                profile.medical_info,
                profile.caregiver_code,
                profile.preferences,
            ],
        )?;
        Ok(())
    }

    /// The user's profile, if one was created.
    pub fn get_profile(&self) -> CareResult<Option<UserProfile>> {
        let conn = db::lock(&self.conn)?;
        Self::fetch_profile(&conn, None)
    }

    /// Create the profile. There is only one: a second create replaces the
    /// fields of the existing profile and keeps its id.
    pub fn create_profile(&self, draft: ProfileDraft) -> CareResult<UserProfile> {
        let mut profile = draft.validate()?;
        let conn = db::lock(&self.conn)?;

        if let Some(existing) = Self::fetch_profile(&conn, None)? {
            profile.id = existing.id;
            Self::write_profile(&conn, &profile)?;
            tracing::debug!(profile_id = profile.id, "Replaced profile");
            return Ok(profile);
        }

        conn.execute(
            r#"INSERT INTO user_profiles
               (name, age, photo, address, emergency_contact, emergency_phone, medical_info,
                caregiver_code, preferences)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                profile.name,
                profile.age,
                profile.photo,
                profile.address,
                profile.emergency_contact,
                profile.emergency_phone,
                profile.medical_info,
                profile.caregiver_code,
                profile.preferences,
            ],
        )?;
        profile.id = conn.last_insert_rowid();
        tracing::debug!(profile_id = profile.id, "Created profile");
        Ok(profile)
    }

    pub fn update_profile(&self, id: i64, patch: &ProfilePatch) -> CareResult<UserProfile> {
        let conn = db::lock(&self.conn)?;
        let current = Self::fetch_profile(&conn, Some(id))?
            .ok_or_else(|| CareError::not_found("profile", id))?;
        let updated = patch.apply(&current)?;
        Self::write_profile(&conn, &updated)?;
        Ok(updated)
    }

    /// Caregiver code from the profile, else `fallback`.
    pub fn caregiver_code(&self, fallback: &str) -> CareResult<String> {
        Ok(self
            .get_profile()?
            .map(|p| p.caregiver_code)
            .unwrap_or_else(|| fallback.to_string()))
    }

    // ---- Memories ----

    /// Memories, newest first.
    pub fn list_memories(&self) -> CareResult<Vec<Memory>> {
        let conn = db::lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, content, created_at FROM memories ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;
        let memories = rows
            .map(|r| {
                let (id, content, created_at) = r?;
                Ok(Memory {
                    id,
                    content,
                    created_at: db::parse_timestamp(&created_at)?,
                })
            })
            .collect::<CareResult<Vec<_>>>()?;
        Ok(memories)
    }

    pub fn create_memory(&self, draft: MemoryDraft) -> CareResult<Memory> {
        let draft = draft.validate()?;
        let created_at = self.clock.now();
        let conn = db::lock(&self.conn)?;
        conn.execute(
            "INSERT INTO memories (content, created_at) VALUES (?1, ?2)",
            params![draft.content, db::format_timestamp(created_at)],
        )?;
        Ok(Memory {
            id: conn.last_insert_rowid(),
            content: draft.content,
            created_at,
        })
    }

    /// Delete a memory. Deleting an absent id is not an error.
    pub fn delete_memory(&self, id: i64) -> CareResult<()> {
        let conn = db::lock(&self.conn)?;
        conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
        Ok(())
    }

    // ---- Chat ----

    fn row_to_chat(row: &Row<'_>) -> rusqlite::Result<(i64, String, i32, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn chat_from_parts(parts: (i64, String, i32, String)) -> CareResult<ChatMessage> {
        let (id, content, is_from_user, created_at) = parts;
        Ok(ChatMessage {
            id,
            content,
            is_from_user: is_from_user != 0,
            created_at: db::parse_timestamp(&created_at)?,
        })
    }

    /// Chat history, oldest first.
    pub fn list_chat(&self) -> CareResult<Vec<ChatMessage>> {
        let conn = db::lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, content, is_from_user, created_at FROM chat_messages \
             ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map([], Self::row_to_chat)?;
        let messages = rows
            .map(|r| Self::chat_from_parts(r?))
            .collect::<CareResult<Vec<_>>>()?;
        Ok(messages)
    }

    /// Most recent chat message.
    pub fn last_chat(&self) -> CareResult<Option<ChatMessage>> {
        let conn = db::lock(&self.conn)?;
        let last = conn
            .query_row(
                "SELECT id, content, is_from_user, created_at FROM chat_messages \
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                [],
                Self::row_to_chat,
            )
            .optional()?;
        last.map(Self::chat_from_parts).transpose()
    }

    pub fn add_chat_message(&self, draft: ChatMessageDraft) -> CareResult<ChatMessage> {
        let draft = draft.validate()?;
        let created_at = self.clock.now();
        let conn = db::lock(&self.conn)?;
        conn.execute(
            "INSERT INTO chat_messages (content, is_from_user, created_at) VALUES (?1, ?2, ?3)",
            params![
                draft.content,
                draft.is_from_user as i32,
                db::format_timestamp(created_at)
            ],
        )?;
        Ok(ChatMessage {
            id: conn.last_insert_rowid(),
            content: draft.content,
            is_from_user: draft.is_from_user,
            created_at,
        })
    }

    /// Delete the whole chat history. Returns the number of messages removed.
    pub fn clear_chat(&self) -> CareResult<usize> {
        let conn = db::lock(&self.conn)?;
        let removed = conn.execute("DELETE FROM chat_messages", [])?;
        tracing::debug!(removed, "Cleared chat history");
        Ok(removed)
    }

    // ---- Emergency contacts ----

    fn row_to_contact(row: &Row<'_>) -> rusqlite::Result<EmergencyContact> {
        Ok(EmergencyContact {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            relationship: row.get(3)?,
        })
    }

    fn fetch_contact(conn: &Connection, id: i64) -> CareResult<Option<EmergencyContact>> {
        Ok(conn
            .query_row(
                "SELECT id, name, phone, relationship FROM emergency_contacts WHERE id = ?1",
                params![id],
                Self::row_to_contact,
            )
            .optional()?)
    }

    /// Contacts in insertion order.
    pub fn list_contacts(&self) -> CareResult<Vec<EmergencyContact>> {
        let conn = db::lock(&self.conn)?;
        let mut stmt = conn
            .prepare("SELECT id, name, phone, relationship FROM emergency_contacts ORDER BY id")?;
        let contacts = stmt
            .query_map([], Self::row_to_contact)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(contacts)
    }

    pub fn create_contact(&self, draft: ContactDraft) -> CareResult<EmergencyContact> {
        let draft = draft.validate()?;
        let conn = db::lock(&self.conn)?;
        Self::insert_contact(&conn, &draft)
    }

    fn insert_contact(conn: &Connection, draft: &ContactDraft) -> CareResult<EmergencyContact> {
        conn.execute(
            "INSERT INTO emergency_contacts (name, phone, relationship) VALUES (?1, ?2, ?3)",
            params![draft.name, draft.phone, draft.relationship],
        )?;
        Ok(EmergencyContact {
            id: conn.last_insert_rowid(),
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            relationship: draft.relationship.clone(),
        })
    }

    pub fn update_contact(&self, id: i64, patch: &ContactPatch) -> CareResult<EmergencyContact> {
        let conn = db::lock(&self.conn)?;
        let current = Self::fetch_contact(&conn, id)?
            .ok_or_else(|| CareError::not_found("emergency contact", id))?;
        let updated = patch.apply(&current)?;
        conn.execute(
            "UPDATE emergency_contacts SET name = ?2, phone = ?3, relationship = ?4 WHERE id = ?1",
            params![id, updated.name, updated.phone, updated.relationship],
        )?;
        Ok(updated)
    }

    /// Delete a contact. Deleting an absent id is not an error.
    pub fn delete_contact(&self, id: i64) -> CareResult<()> {
        let conn = db::lock(&self.conn)?;
        conn.execute("DELETE FROM emergency_contacts WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Insert the default contacts if there are none. Returns how many were added.
    pub fn seed_default_contacts(&self) -> CareResult<usize> {
        let conn = db::lock(&self.conn)?;
        let existing: i64 =
            conn.query_row("SELECT COUNT(*) FROM emergency_contacts", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(0);
        }
        let defaults = ContactDraft::defaults();
        for draft in &defaults {
            Self::insert_contact(&conn, draft)?;
        }
        tracing::info!(count = defaults.len(), "Seeded default emergency contacts");
        Ok(defaults.len())
    }

    // ---- Medications ----

    fn row_to_medication(row: &Row<'_>) -> CareResult<Medication> {
        let slots: String = row.get(4)?;
        let is_active: i32 = row.get(6)?;
        let created_at: String = row.get(7)?;
        let time_slots = serde_json::from_str::<Vec<String>>(&slots)?
            .iter()
            .map(|s| NaiveTime::parse_from_str(s, hhmm::FORMAT))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CareError::parse(format!("bad medication time slot: {}", e)))?;

        Ok(Medication {
            id: row.get(0)?,
            name: row.get(1)?,
            dosage: row.get(2)?,
            frequency: row.get(3)?,
            time_slots,
            instructions: row.get(5)?,
            is_active: is_active != 0,
            created_at: db::parse_timestamp(&created_at)?,
        })
    }

    fn slots_json(slots: &[NaiveTime]) -> CareResult<String> {
        let labels: Vec<String> = slots
            .iter()
            .map(|t| t.format(hhmm::FORMAT).to_string())
            .collect();
        Ok(serde_json::to_string(&labels)?)
    }

    fn fetch_medication(conn: &Connection, id: i64) -> CareResult<Option<Medication>> {
        let mut stmt =
            conn.prepare(&format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1"))?;
        let medication = stmt
            .query_row(params![id], |row| Ok(Self::row_to_medication(row)))
            .optional()?;
        medication.transpose()
    }

    /// Medications in insertion order.
    pub fn list_medications(&self) -> CareResult<Vec<Medication>> {
        let conn = db::lock(&self.conn)?;
        let mut stmt =
            conn.prepare(&format!("SELECT {MEDICATION_COLUMNS} FROM medications ORDER BY id"))?;
        let rows = stmt.query_map([], |row| Ok(Self::row_to_medication(row)))?;
        let medications = rows
            .map(|r| r.map_err(CareError::from).and_then(|inner| inner))
            .collect::<CareResult<Vec<_>>>()?;
        Ok(medications)
    }

    pub fn create_medication(&self, draft: MedicationDraft) -> CareResult<Medication> {
        let med = draft.validate()?;
        let created_at = self.clock.now();
        let conn = db::lock(&self.conn)?;
        conn.execute(
            r#"INSERT INTO medications
               (name, dosage, frequency, time_slots, instructions, is_active, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)"#,
            params![
                med.name,
                med.dosage,
                med.frequency,
                Self::slots_json(&med.time_slots)?,
                med.instructions,
                db::format_timestamp(created_at),
            ],
        )?;
        Ok(Medication {
            id: conn.last_insert_rowid(),
            name: med.name,
            dosage: med.dosage,
            frequency: med.frequency,
            time_slots: med.time_slots,
            instructions: med.instructions,
            is_active: true,
            created_at,
        })
    }

    pub fn update_medication(&self, id: i64, patch: &MedicationPatch) -> CareResult<Medication> {
        let conn = db::lock(&self.conn)?;
        let current = Self::fetch_medication(&conn, id)?
            .ok_or_else(|| CareError::not_found("medication", id))?;
        let updated = patch.apply(&current)?;
        conn.execute(
            r#"UPDATE medications SET
               name = ?2, dosage = ?3, frequency = ?4, time_slots = ?5, instructions = ?6,
               is_active = ?7
               WHERE id = ?1"#,
            params![
                id,
                updated.name,
                updated.dosage,
                updated.frequency,
                Self::slots_json(&updated.time_slots)?,
                updated.instructions,
                updated.is_active as i32,
            ],
        )?;
        Ok(updated)
    }

    /// Delete a medication. Deleting an absent id is not an error.
    pub fn delete_medication(&self, id: i64) -> CareResult<()> {
        let conn = db::lock(&self.conn)?;
        conn.execute("DELETE FROM medications WHERE id = ?1", params![id])?;
        Ok(())
    }
}
