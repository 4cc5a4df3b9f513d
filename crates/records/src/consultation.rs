//! Consultation entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RecordId;

/// A consultation record as read back from the primary store.
///
/// Joins are by identifier value: `medecin_id` and `patient_id` hold the
/// primary-store identifiers of the two participants, and the mirrored
/// graph node carries the same `id` as this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    /// Store-issued identifier.
    pub id: RecordId,
    /// When the consultation takes place.
    pub occurred_at: DateTime<Utc>,
    /// Stated reason for the visit.
    pub reason: String,
    /// Owning physician.
    pub medecin_id: RecordId,
    /// Subject patient.
    pub patient_id: RecordId,
}

/// Payload for scheduling a new consultation.
///
/// The owning physician is not part of the payload; it is always the
/// authenticated caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewConsultation {
    /// Subject patient.
    pub patient_id: RecordId,
    /// When the consultation takes place.
    pub occurred_at: DateTime<Utc>,
    /// Stated reason for the visit.
    pub reason: String,
}
