//! Principal roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The role tag carried by every authenticated principal.
///
/// Role resolution probes the backing collections in a fixed priority
/// order ([`Role::PROBE_ORDER`]): an administrator wins over a physician,
/// which wins over a patient, should one opaque token ever match more than
/// one collection. That ordering is a documented contract, not an accident
/// of implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrative principal; manages patients, physicians, and
    /// treating-physician assignments.
    Admin,
    /// Physician (medecin); owns consultations.
    Medecin,
    /// Patient; reads their own consultation history.
    Patient,
}

impl Role {
    /// Collection probe order used during identity resolution, highest
    /// priority first.
    pub const PROBE_ORDER: [Role; 3] = [Role::Admin, Role::Medecin, Role::Patient];

    /// Returns the wire representation stored in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Medecin => "medecin",
            Role::Patient => "patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "medecin" => Ok(Role::Medecin),
            "patient" => Ok(Role::Patient),
            other => Err(UnknownRole {
                value: other.to_string(),
            }),
        }
    }
}

/// A role tag that names none of the three principal kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {value:?}")]
pub struct UnknownRole {
    /// The rejected value.
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for role in Role::PROBE_ORDER {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!("superuser".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_probe_order_priority() {
        assert_eq!(Role::PROBE_ORDER[0], Role::Admin);
        assert_eq!(Role::PROBE_ORDER[1], Role::Medecin);
        assert_eq!(Role::PROBE_ORDER[2], Role::Patient);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Role::Medecin).unwrap();
        assert_eq!(json, "\"medecin\"");
        let back: Role = serde_json::from_str("\"patient\"").unwrap();
        assert_eq!(back, Role::Patient);
    }
}
