//! Domain model shared by the dossier store adapters.
//!
//! This crate defines the entity types held in the document-oriented
//! primary store and projected into the graph mirror:
//!
//! | Type | Collection | Mirrored as |
//! |------|------------|-------------|
//! | [`Patient`] | `patients` | `Patient` node |
//! | [`Medecin`] | `medecins` | `Medecin` node |
//! | [`Consultation`] | `consultations` | `Consultation` node + participation edges |
//! | [`Principal`] | `principals` | `Principal` node + optional link edge |
//!
//! Identifiers ([`RecordId`]) are opaque, store-issued strings. The read
//! models here deserialize from stored documents and deliberately omit
//! credential fields; the `New*` payload types carry plaintext passwords
//! only as far as the credential hasher at the storage boundary.

#![warn(missing_docs)]

mod consultation;
mod id;
mod medecin;
mod patient;
mod principal;
mod role;

pub use consultation::{Consultation, NewConsultation};
pub use id::{InvalidRecordId, RecordId};
pub use medecin::{Medecin, NewMedecin};
pub use patient::{NewPatient, Patient};
pub use principal::{NewPrincipal, Principal};
pub use role::{Role, UnknownRole};
