//! Patient entity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::RecordId;

/// A patient record as read back from the primary store.
///
/// The stored document also carries the patient's login credentials;
/// those fields are deliberately absent from this read model and are
/// ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Store-issued identifier.
    pub id: RecordId,
    /// Family name.
    pub family_name: String,
    /// Given name.
    pub given_name: String,
    /// Birth date, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

impl Patient {
    /// Display name in "given family" order.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }
}

/// Payload for registering a new patient.
///
/// `password` is plaintext here and must be hashed at the storage
/// boundary; it never travels further than the credential hasher.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    /// Family name.
    pub family_name: String,
    /// Given name.
    pub given_name: String,
    /// Birth date, if known.
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    /// Login username.
    pub username: String,
    /// Plaintext password, hashed before storage.
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_ignores_credential_fields() {
        let doc = json!({
            "id": "p-1",
            "family_name": "Ba",
            "given_name": "Moussa",
            "birth_date": "1987-03-14",
            "username": "ba_moussa_patient",
            "password_hash": "$argon2id$..."
        });
        let patient: Patient = serde_json::from_value(doc).unwrap();
        assert_eq!(patient.id.as_str(), "p-1");
        assert_eq!(patient.birth_date.unwrap().to_string(), "1987-03-14");
    }

    #[test]
    fn test_birth_date_optional() {
        let doc = json!({"id": "p-2", "family_name": "Ba", "given_name": "Awa"});
        let patient: Patient = serde_json::from_value(doc).unwrap();
        assert_eq!(patient.birth_date, None);
    }

    #[test]
    fn test_full_name_order() {
        let patient = Patient {
            id: RecordId::new("p-1"),
            family_name: "Ba".to_string(),
            given_name: "Moussa".to_string(),
            birth_date: None,
        };
        assert_eq!(patient.full_name(), "Moussa Ba");
    }
}
