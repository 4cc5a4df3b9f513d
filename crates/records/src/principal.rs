//! Administrative principal entity.

use serde::{Deserialize, Serialize};

use crate::{RecordId, Role};

/// A login principal as read back from the principal collection.
///
/// Physicians and patients authenticate against their own entity records;
/// this collection holds administrators and any principal whose identity
/// is linked to an entity record rather than embedded in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Store-issued identifier.
    pub id: RecordId,
    /// Login username.
    pub username: String,
    /// Role tag.
    pub role: Role,
    /// Identifier of the linked Patient or Medecin record, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_id: Option<RecordId>,
}

/// Payload for registering a new principal.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPrincipal {
    /// Login username; unique within the principal collection.
    pub username: String,
    /// Plaintext password, hashed before storage.
    pub password: String,
    /// Role tag.
    pub role: Role,
    /// Linked Patient or Medecin record, for non-administrator roles.
    #[serde(default)]
    pub linked_id: Option<RecordId>,
}
