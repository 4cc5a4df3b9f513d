//! Physician (medecin) entity.

use serde::{Deserialize, Serialize};

use crate::RecordId;

/// A physician record as read back from the primary store.
///
/// Credential fields in the stored document are not part of this read
/// model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medecin {
    /// Store-issued identifier.
    pub id: RecordId,
    /// Family name.
    pub family_name: String,
    /// Given name.
    pub given_name: String,
    /// Medical specialty.
    pub specialty: String,
}

impl Medecin {
    /// Display name in "given family" order.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }
}

/// Payload for registering a new physician.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMedecin {
    /// Family name.
    pub family_name: String,
    /// Given name.
    pub given_name: String,
    /// Medical specialty.
    pub specialty: String,
    /// Login username.
    pub username: String,
    /// Plaintext password, hashed before storage.
    pub password: String,
}
