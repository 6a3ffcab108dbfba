//! Care records kept alongside reminders.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::reminder::{hhmm, parse_time_of_day};
use crate::error::{CareError, CareResult};

/// Default caregiver access code.
pub const DEFAULT_CAREGIVER_CODE: &str = "1234";

fn required(field: &str, value: &str) -> CareResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CareError::missing_field(field));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A short text memory pinned to the memory board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDraft {
    pub content: String,
}

impl MemoryDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn validate(self) -> CareResult<Self> {
        Ok(Self {
            content: required("content", &self.content)?,
        })
    }
}

/// One message in the companion conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub content: String,
    pub is_from_user: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDraft {
    pub content: String,
    pub is_from_user: bool,
}

impl ChatMessageDraft {
    /// Message typed or spoken by the user.
    pub fn from_user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_from_user: true,
        }
    }

    /// Message produced by the companion.
    pub fn from_assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_from_user: false,
        }
    }

    pub fn validate(self) -> CareResult<Self> {
        Ok(Self {
            content: required("content", &self.content)?,
            is_from_user: self.is_from_user,
        })
    }
}

/// A person to call in an emergency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub relationship: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDraft {
    pub name: String,
    pub phone: String,
    pub relationship: String,
}

impl ContactDraft {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            relationship: relationship.into(),
        }
    }

    pub fn validate(self) -> CareResult<Self> {
        Ok(Self {
            name: required("name", &self.name)?,
            phone: required("phone", &self.phone)?,
            relationship: required("relationship", &self.relationship)?,
        })
    }

    /// Contacts a fresh store starts with.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("Emergency Services", "911", "Emergency"),
            Self::new("Sarah", "(555) 123-4567", "Granddaughter"),
            Self::new("Dr. Smith", "(555) 456-7890", "Doctor"),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
}

impl ContactPatch {
    pub fn apply(&self, contact: &EmergencyContact) -> CareResult<EmergencyContact> {
        let mut updated = contact.clone();
        if let Some(name) = &self.name {
            updated.name = required("name", name)?;
        }
        if let Some(phone) = &self.phone {
            updated.phone = required("phone", phone)?;
        }
        if let Some(relationship) = &self.relationship {
            updated.relationship = required("relationship", relationship)?;
        }
        Ok(updated)
    }
}

/// A medication and the times of day it is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: i64,
    pub name: String,
    pub dosage: String,
    /// Free-text schedule, e.g. "twice daily".
    pub frequency: String,
    #[serde(with = "time_slots")]
    pub time_slots: Vec<NaiveTime>,
    #[serde(default)]
    pub instructions: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

mod time_slots {
    use super::hhmm;
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(slots: &[NaiveTime], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(slots.iter().map(|t| t.format(hhmm::FORMAT).to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<NaiveTime>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| NaiveTime::parse_from_str(s, hhmm::FORMAT).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationDraft {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub time_slots: Vec<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Validated medication fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub time_slots: Vec<NaiveTime>,
    pub instructions: Option<String>,
}

fn parse_slots(slots: &[String]) -> CareResult<Vec<NaiveTime>> {
    let mut parsed = slots
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_time_of_day("timeSlots", s))
        .collect::<CareResult<Vec<_>>>()?;
    parsed.sort();
    parsed.dedup();
    Ok(parsed)
}

impl MedicationDraft {
    pub fn validate(self) -> CareResult<NewMedication> {
        Ok(NewMedication {
            name: required("name", &self.name)?,
            dosage: required("dosage", &self.dosage)?,
            frequency: required("frequency", &self.frequency)?,
            time_slots: parse_slots(&self.time_slots)?,
            instructions: optional(self.instructions),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub time_slots: Option<Vec<String>>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl MedicationPatch {
    pub fn apply(&self, medication: &Medication) -> CareResult<Medication> {
        let mut updated = medication.clone();
        if let Some(name) = &self.name {
            updated.name = required("name", name)?;
        }
        if let Some(dosage) = &self.dosage {
            updated.dosage = required("dosage", dosage)?;
        }
        if let Some(frequency) = &self.frequency {
            updated.frequency = required("frequency", frequency)?;
        }
        if let Some(slots) = &self.time_slots {
            updated.time_slots = parse_slots(slots)?;
        }
        if let Some(instructions) = &self.instructions {
            updated.instructions = optional(Some(instructions.clone()));
        }
        if let Some(active) = self.is_active {
            updated.is_active = active;
        }
        Ok(updated)
    }
}

/// The single user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    /// Photo as a data URL or link.
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
    #[serde(default)]
    pub medical_info: Option<String>,
    pub caregiver_code: String,
    #[serde(default)]
    pub preferences: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
    #[serde(default)]
    pub medical_info: Option<String>,
    #[serde(default)]
    pub caregiver_code: Option<String>,
    #[serde(default)]
    pub preferences: Option<String>,
}

impl ProfileDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Validate into a profile with a placeholder id.
    pub fn validate(self) -> CareResult<UserProfile> {
        Ok(UserProfile {
            id: 0,
            name: required("name", &self.name)?,
            age: self.age,
            photo: optional(self.photo),
            address: optional(self.address),
            emergency_contact: optional(self.emergency_contact),
            emergency_phone: optional(self.emergency_phone),
            medical_info: optional(self.medical_info),
            caregiver_code: optional(self.caregiver_code)
                .unwrap_or_else(|| DEFAULT_CAREGIVER_CODE.to_string()),
            preferences: optional(self.preferences),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
    #[serde(default)]
    pub medical_info: Option<String>,
    #[serde(default)]
    pub caregiver_code: Option<String>,
    #[serde(default)]
    pub preferences: Option<String>,
}

impl ProfilePatch {
    pub fn apply(&self, profile: &UserProfile) -> CareResult<UserProfile> {
        let mut updated = profile.clone();
        if let Some(name) = &self.name {
            updated.name = required("name", name)?;
        }
        if let Some(age) = self.age {
            updated.age = Some(age);
        }
        if let Some(code) = &self.caregiver_code {
            updated.caregiver_code = required("caregiverCode", code)?;
        }
        let texts = [
            (&self.photo, &mut updated.photo),
            (&self.address, &mut updated.address),
            (&self.emergency_contact, &mut updated.emergency_contact),
            (&self.emergency_phone, &mut updated.emergency_phone),
            (&self.medical_info, &mut updated.medical_info),
            (&self.preferences, &mut updated.preferences),
        ];
        for (patch, field) in texts {
            if let Some(value) = patch {
                *field = optional(Some(value.clone()));
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_contacts() {
        let contacts = ContactDraft::defaults();
        assert_eq!(contacts.len(), 3);
        assert_eq!(contacts[0].phone, "911");
        assert_eq!(contacts[1].relationship, "Granddaughter");
        assert_eq!(contacts[2].name, "Dr. Smith");
    }

    #[test]
    fn test_contact_requires_all_fields() {
        assert!(ContactDraft::new("Ann", "", "Friend").validate().is_err());
        assert!(ContactDraft::new("Ann", "555", "Friend").validate().is_ok());
    }

    #[test]
    fn test_medication_slots_sorted_and_validated() {
        let draft = MedicationDraft {
            name: "Aspirin".to_string(),
            dosage: "81mg".to_string(),
            frequency: "twice daily".to_string(),
            time_slots: vec!["20:00".to_string(), "08:00".to_string(), "08:00".to_string()],
            instructions: Some("".to_string()),
        };
        let med = draft.validate().unwrap();
        assert_eq!(
            med.time_slots,
            vec![
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(20, 0, 0).unwrap()
            ]
        );
        assert_eq!(med.instructions, None);

        let bad = MedicationDraft {
            name: "Aspirin".to_string(),
            dosage: "81mg".to_string(),
            frequency: "daily".to_string(),
            time_slots: vec!["8 o'clock".to_string()],
            instructions: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_profile_defaults_caregiver_code() {
        let profile = ProfileDraft::new("Margaret").validate().unwrap();
        assert_eq!(profile.caregiver_code, DEFAULT_CAREGIVER_CODE);

        let patched = ProfilePatch {
            address: Some("12 Elm St".to_string()),
            medical_info: Some("".to_string()),
            ..Default::default()
        }
        .apply(&profile)
        .unwrap();
        assert_eq!(patched.address.as_deref(), Some("12 Elm St"));
        assert_eq!(patched.medical_info, None);
        assert_eq!(patched.name, "Margaret");
    }

    #[test]
    fn test_chat_draft_rejects_blank() {
        assert!(ChatMessageDraft::from_user("   ").validate().is_err());
        let ok = ChatMessageDraft::from_assistant("hello").validate().unwrap();
        assert!(!ok.is_from_user);
    }
}
