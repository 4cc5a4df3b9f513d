//! Test fixtures for record operations.
//!
//! Builders for registration payloads, so tests state only the fields
//! they care about.

use chrono::{DateTime, Utc};

use dossier_records::{NewConsultation, NewMedecin, NewPatient, RecordId};

/// A patient registration fixture.
#[derive(Debug, Clone)]
pub struct PatientFixture {
    /// Family name.
    pub family_name: String,
    /// Given name.
    pub given_name: String,
    /// Birth date (YYYY-MM-DD format).
    pub birth_date: Option<String>,
    /// Login username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

impl PatientFixture {
    /// Creates a patient fixture with minimal required fields.
    ///
    /// The username defaults to `given.family` lowercased.
    pub fn new(family_name: impl Into<String>, given_name: impl Into<String>) -> Self {
        let family_name = family_name.into();
        let given_name = given_name.into();
        let username = format!("{}.{}", given_name, family_name).to_lowercase();
        Self {
            family_name,
            given_name,
            birth_date: None,
            username,
            password: "test-password".to_string(),
        }
    }

    /// Sets the birth date.
    pub fn with_birth_date(mut self, date: impl Into<String>) -> Self {
        self.birth_date = Some(date.into());
        self
    }

    /// Sets the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Sets the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Converts to a registration payload.
    pub fn to_new(&self) -> NewPatient {
        NewPatient {
            family_name: self.family_name.clone(),
            given_name: self.given_name.clone(),
            birth_date: self
                .birth_date
                .as_ref()
                .map(|d| d.parse().expect("fixture birth date should parse")),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// A physician registration fixture.
#[derive(Debug, Clone)]
pub struct MedecinFixture {
    /// Family name.
    pub family_name: String,
    /// Given name.
    pub given_name: String,
    /// Medical specialty.
    pub specialty: String,
    /// Login username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

impl MedecinFixture {
    /// Creates a physician fixture with minimal required fields.
    pub fn new(family_name: impl Into<String>, given_name: impl Into<String>) -> Self {
        let family_name = family_name.into();
        let given_name = given_name.into();
        let username = format!("dr.{}", family_name).to_lowercase();
        Self {
            family_name,
            given_name,
            specialty: "General Medicine".to_string(),
            username,
            password: "test-password".to_string(),
        }
    }

    /// Sets the specialty.
    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = specialty.into();
        self
    }

    /// Sets the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Converts to a registration payload.
    pub fn to_new(&self) -> NewMedecin {
        NewMedecin {
            family_name: self.family_name.clone(),
            given_name: self.given_name.clone(),
            specialty: self.specialty.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Builds a consultation payload for a patient at an RFC 3339 timestamp.
pub fn consultation_at(patient_id: &RecordId, timestamp: &str, reason: &str) -> NewConsultation {
    NewConsultation {
        patient_id: patient_id.clone(),
        occurred_at: timestamp
            .parse::<DateTime<Utc>>()
            .expect("fixture timestamp should parse"),
        reason: reason.to_string(),
    }
}
