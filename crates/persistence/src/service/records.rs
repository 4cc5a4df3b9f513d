//! Record operations: authorize, write the primary store, then mirror.
//!
//! Every mutation follows the same order. The role gate runs before any
//! store access; the primary write follows and any failure there aborts
//! the operation; the mirror write runs last and its outcome travels
//! back inside the [`WriteReceipt`] instead of failing the request.

use serde_json::{Map, Value};
use tracing::instrument;

use dossier_records::{
    Medecin, NewConsultation, NewMedecin, NewPatient, NewPrincipal, Patient, Principal, RecordId,
    Role,
};

use crate::core::{Collection, DynDocumentStore, DynGraphStore, Filter};
use crate::error::{AuthError, RecordError, StorageResult, ValidationError};
use crate::identity::Caller;
use crate::query::{ConsultationView, RelationshipQueries};
use crate::sync::{MirrorCounters, MirrorOutcome, SyncKind, SyncManager};

use super::credentials::{hash_password, verify_password};

/// The result of an accepted mutation.
///
/// The primary write succeeded; `mirror` reports whether the projection
/// followed. A failed mirror write leaves the operation successful with
/// a warning the transport layer can attach to its response.
#[derive(Debug)]
pub struct WriteReceipt {
    /// The identifier of the written record.
    pub id: RecordId,
    /// What happened on the mirror side.
    pub mirror: MirrorOutcome,
}

impl WriteReceipt {
    /// A warning for the caller when the mirror is now stale.
    pub fn mirror_warning(&self) -> Option<String> {
        self.mirror.warning()
    }
}

/// Authorized operations over both stores.
pub struct RecordService {
    documents: DynDocumentStore,
    sync: SyncManager,
    queries: RelationshipQueries,
}

impl RecordService {
    /// Creates a service over a primary store and a mirror.
    pub fn new(documents: DynDocumentStore, graph: DynGraphStore) -> Self {
        let sync = SyncManager::new(graph.clone());
        let queries = RelationshipQueries::new(documents.clone(), graph);
        RecordService {
            documents,
            sync,
            queries,
        }
    }

    /// Mirror write counters per entity kind, for health reporting.
    pub fn mirror_status(&self) -> std::collections::HashMap<SyncKind, MirrorCounters> {
        self.sync.all_counters()
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    /// Registers a patient. Administrator only.
    #[instrument(skip(self, new))]
    pub async fn create_patient(
        &self,
        caller: &Caller,
        new: NewPatient,
    ) -> StorageResult<WriteReceipt> {
        caller.require(Role::Admin)?;
        let password_hash = hash_password(&new.password)?;

        let mut document = Map::new();
        document.insert("family_name".to_string(), Value::String(new.family_name));
        document.insert("given_name".to_string(), Value::String(new.given_name));
        if let Some(birth_date) = new.birth_date {
            document.insert("birth_date".to_string(), Value::String(birth_date.to_string()));
        }
        document.insert("username".to_string(), Value::String(new.username));
        document.insert("password_hash".to_string(), Value::String(password_hash));

        let stored = self
            .documents
            .insert(Collection::Patients, Value::Object(document))
            .await?;
        let mirror = self.sync.patient_created(&stored).await;
        Ok(WriteReceipt {
            id: stored.id().clone(),
            mirror,
        })
    }

    /// Applies a partial update to a patient. Administrator only.
    pub async fn update_patient(
        &self,
        caller: &Caller,
        id: &RecordId,
        changes: &Value,
    ) -> StorageResult<WriteReceipt> {
        caller.require(Role::Admin)?;
        let changes = sanitized_changes(changes)?;

        let matched = self
            .documents
            .update_one(Collection::Patients, &Filter::by_id(id), &changes)
            .await?;
        if !matched {
            return Err(not_found(Collection::Patients, id));
        }
        let mirror = self.sync.patient_updated(id, &changes).await;
        Ok(WriteReceipt {
            id: id.clone(),
            mirror,
        })
    }

    /// Deletes a patient. Administrator only.
    pub async fn delete_patient(&self, caller: &Caller, id: &RecordId) -> StorageResult<WriteReceipt> {
        caller.require(Role::Admin)?;
        let deleted = self
            .documents
            .delete_one(Collection::Patients, &Filter::by_id(id))
            .await?;
        if !deleted {
            return Err(not_found(Collection::Patients, id));
        }
        let mirror = self.sync.patient_deleted(id).await;
        Ok(WriteReceipt {
            id: id.clone(),
            mirror,
        })
    }

    /// Reads a patient record. Administrator, or the patient themself.
    pub async fn get_patient(&self, caller: &Caller, id: &RecordId) -> StorageResult<Patient> {
        authorize_on(caller, Role::Patient, id)?;
        let record = self
            .documents
            .find_by_id(Collection::Patients, id)
            .await?
            .ok_or_else(|| not_found(Collection::Patients, id))?;
        record.decode(Collection::Patients)
    }

    // ------------------------------------------------------------------
    // Physicians
    // ------------------------------------------------------------------

    /// Registers a physician. Administrator only.
    #[instrument(skip(self, new))]
    pub async fn create_medecin(
        &self,
        caller: &Caller,
        new: NewMedecin,
    ) -> StorageResult<WriteReceipt> {
        caller.require(Role::Admin)?;
        let password_hash = hash_password(&new.password)?;

        let mut document = Map::new();
        document.insert("family_name".to_string(), Value::String(new.family_name));
        document.insert("given_name".to_string(), Value::String(new.given_name));
        document.insert("specialty".to_string(), Value::String(new.specialty));
        document.insert("username".to_string(), Value::String(new.username));
        document.insert("password_hash".to_string(), Value::String(password_hash));

        let stored = self
            .documents
            .insert(Collection::Medecins, Value::Object(document))
            .await?;
        let mirror = self.sync.medecin_created(&stored).await;
        Ok(WriteReceipt {
            id: stored.id().clone(),
            mirror,
        })
    }

    /// Applies a partial update to a physician. Administrator only.
    pub async fn update_medecin(
        &self,
        caller: &Caller,
        id: &RecordId,
        changes: &Value,
    ) -> StorageResult<WriteReceipt> {
        caller.require(Role::Admin)?;
        let changes = sanitized_changes(changes)?;

        let matched = self
            .documents
            .update_one(Collection::Medecins, &Filter::by_id(id), &changes)
            .await?;
        if !matched {
            return Err(not_found(Collection::Medecins, id));
        }
        let mirror = self.sync.medecin_updated(id, &changes).await;
        Ok(WriteReceipt {
            id: id.clone(),
            mirror,
        })
    }

    /// Deletes a physician. Administrator only.
    pub async fn delete_medecin(&self, caller: &Caller, id: &RecordId) -> StorageResult<WriteReceipt> {
        caller.require(Role::Admin)?;
        let deleted = self
            .documents
            .delete_one(Collection::Medecins, &Filter::by_id(id))
            .await?;
        if !deleted {
            return Err(not_found(Collection::Medecins, id));
        }
        let mirror = self.sync.medecin_deleted(id).await;
        Ok(WriteReceipt {
            id: id.clone(),
            mirror,
        })
    }

    /// Reads a physician record. Administrator, or the physician themself.
    pub async fn get_medecin(&self, caller: &Caller, id: &RecordId) -> StorageResult<Medecin> {
        authorize_on(caller, Role::Medecin, id)?;
        let record = self
            .documents
            .find_by_id(Collection::Medecins, id)
            .await?
            .ok_or_else(|| not_found(Collection::Medecins, id))?;
        record.decode(Collection::Medecins)
    }

    // ------------------------------------------------------------------
    // Consultations
    // ------------------------------------------------------------------

    /// Records a consultation owned by the calling physician.
    #[instrument(skip(self, new), fields(patient_id = %new.patient_id))]
    pub async fn create_consultation(
        &self,
        caller: &Caller,
        new: NewConsultation,
    ) -> StorageResult<WriteReceipt> {
        caller.require(Role::Medecin)?;

        let mut document = Map::new();
        document.insert("occurred_at".to_string(), serde_json::to_value(new.occurred_at)?);
        document.insert("reason".to_string(), Value::String(new.reason));
        document.insert(
            "patient_id".to_string(),
            Value::String(new.patient_id.as_str().to_string()),
        );
        document.insert(
            "medecin_id".to_string(),
            Value::String(caller.id().as_str().to_string()),
        );

        let stored = self
            .documents
            .insert(Collection::Consultations, Value::Object(document))
            .await?;
        let mirror = self
            .sync
            .consultation_saved(&stored, &new.patient_id, caller.id())
            .await;
        Ok(WriteReceipt {
            id: stored.id().clone(),
            mirror,
        })
    }

    /// Applies a partial update to a consultation owned by the caller.
    ///
    /// The full mirroring sequence is re-applied with the post-update
    /// linkage; if the update moved the consultation to another patient
    /// or physician, edges from the previous linkage stay behind in the
    /// mirror.
    pub async fn update_consultation(
        &self,
        caller: &Caller,
        id: &RecordId,
        changes: &Value,
    ) -> StorageResult<WriteReceipt> {
        self.owned_consultation(caller, id).await?;
        let changes = sanitized_changes(changes)?;

        let matched = self
            .documents
            .update_one(Collection::Consultations, &Filter::by_id(id), &changes)
            .await?;
        if !matched {
            return Err(not_found(Collection::Consultations, id));
        }

        let record = self
            .documents
            .find_by_id(Collection::Consultations, id)
            .await?
            .ok_or_else(|| not_found(Collection::Consultations, id))?;
        let updated: dossier_records::Consultation = record.decode(Collection::Consultations)?;
        let mirror = self
            .sync
            .consultation_saved(&record, &updated.patient_id, &updated.medecin_id)
            .await;
        Ok(WriteReceipt {
            id: id.clone(),
            mirror,
        })
    }

    /// Deletes a consultation owned by the caller.
    pub async fn delete_consultation(
        &self,
        caller: &Caller,
        id: &RecordId,
    ) -> StorageResult<WriteReceipt> {
        self.owned_consultation(caller, id).await?;
        let deleted = self
            .documents
            .delete_one(Collection::Consultations, &Filter::by_id(id))
            .await?;
        if !deleted {
            return Err(not_found(Collection::Consultations, id));
        }
        let mirror = self.sync.consultation_deleted(id).await;
        Ok(WriteReceipt {
            id: id.clone(),
            mirror,
        })
    }

    /// Loads a consultation and checks the caller owns it.
    async fn owned_consultation(
        &self,
        caller: &Caller,
        id: &RecordId,
    ) -> StorageResult<dossier_records::Consultation> {
        caller.require(Role::Medecin)?;
        let record = self
            .documents
            .find_by_id(Collection::Consultations, id)
            .await?
            .ok_or_else(|| not_found(Collection::Consultations, id))?;
        let consultation: dossier_records::Consultation =
            record.decode(Collection::Consultations)?;
        if &consultation.medecin_id != caller.id() {
            return Err(AuthError::NotRecordOwner { id: id.clone() }.into());
        }
        Ok(consultation)
    }

    // ------------------------------------------------------------------
    // Principals and credentials
    // ------------------------------------------------------------------

    /// Registers a login principal. Administrator only.
    ///
    /// Usernames are unique across the principal collection; entity
    /// links are mirrored as an edge when the role carries one.
    pub async fn register_principal(
        &self,
        caller: &Caller,
        new: NewPrincipal,
    ) -> StorageResult<WriteReceipt> {
        caller.require(Role::Admin)?;

        let filter = Filter::new().eq("username", new.username.as_str());
        if self
            .documents
            .find_one(Collection::Principals, &filter)
            .await?
            .is_some()
        {
            return Err(RecordError::UsernameTaken {
                username: new.username,
            }
            .into());
        }

        let password_hash = hash_password(&new.password)?;
        let mut document = Map::new();
        document.insert("username".to_string(), Value::String(new.username.clone()));
        document.insert("password_hash".to_string(), Value::String(password_hash));
        document.insert("role".to_string(), Value::String(new.role.as_str().to_string()));
        if let Some(linked_id) = &new.linked_id {
            document.insert(
                "linked_id".to_string(),
                Value::String(linked_id.as_str().to_string()),
            );
        }

        let stored = self
            .documents
            .insert(Collection::Principals, Value::Object(document))
            .await?;
        let principal = Principal {
            id: stored.id().clone(),
            username: new.username,
            role: new.role,
            linked_id: new.linked_id,
        };
        let mirror = self.sync.principal_created(&principal).await;
        Ok(WriteReceipt {
            id: principal.id,
            mirror,
        })
    }

    /// Deletes a login principal. Administrator only.
    pub async fn delete_principal(
        &self,
        caller: &Caller,
        id: &RecordId,
    ) -> StorageResult<WriteReceipt> {
        caller.require(Role::Admin)?;
        let deleted = self
            .documents
            .delete_one(Collection::Principals, &Filter::by_id(id))
            .await?;
        if !deleted {
            return Err(not_found(Collection::Principals, id));
        }
        let mirror = self.sync.principal_deleted(id).await;
        Ok(WriteReceipt {
            id: id.clone(),
            mirror,
        })
    }

    /// Checks a username/password pair for a role.
    ///
    /// Returns the matching record's identifier, or `None` for an
    /// unknown username, a wrong password, or a role mismatch — the
    /// three cases are indistinguishable to the caller.
    pub async fn verify_credentials(
        &self,
        role: Role,
        username: &str,
        password: &str,
    ) -> StorageResult<Option<RecordId>> {
        let collection = Collection::for_role(role);
        let filter = Filter::new().eq("username", username);
        let Some(record) = self.documents.find_one(collection, &filter).await? else {
            return Ok(None);
        };

        if role == Role::Admin {
            let is_admin = record.content().get("role").and_then(Value::as_str)
                == Some(Role::Admin.as_str());
            if !is_admin {
                return Ok(None);
            }
        }

        let Some(stored_hash) = record.content().get("password_hash").and_then(Value::as_str)
        else {
            return Ok(None);
        };
        Ok(verify_password(password, stored_hash).then(|| record.id().clone()))
    }

    /// Replaces the caller's own password.
    ///
    /// Credential fields are outside every mirror whitelist, so nothing
    /// is propagated.
    pub async fn change_password(&self, caller: &Caller, new_password: &str) -> StorageResult<()> {
        let password_hash = hash_password(new_password)?;
        let collection = Collection::for_role(caller.role());
        let changes = serde_json::json!({ "password_hash": password_hash });

        let matched = self
            .documents
            .update_one(collection, &Filter::by_id(caller.id()), &changes)
            .await?;
        if !matched {
            return Err(not_found(collection, caller.id()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------

    /// Assigns a treating physician to a patient. Administrator only.
    ///
    /// Both records must exist in the primary store; the assignment
    /// itself lives solely in the mirror, as one idempotent edge.
    #[instrument(skip(self))]
    pub async fn assign_treating_physician(
        &self,
        caller: &Caller,
        patient_id: &RecordId,
        medecin_id: &RecordId,
    ) -> StorageResult<MirrorOutcome> {
        caller.require(Role::Admin)?;
        if !self.documents.exists(Collection::Patients, patient_id).await? {
            return Err(not_found(Collection::Patients, patient_id));
        }
        if !self.documents.exists(Collection::Medecins, medecin_id).await? {
            return Err(not_found(Collection::Medecins, medecin_id));
        }
        Ok(self.sync.assignment_created(patient_id, medecin_id).await)
    }

    /// Removes a treating-physician assignment. Administrator only.
    pub async fn unassign_treating_physician(
        &self,
        caller: &Caller,
        patient_id: &RecordId,
        medecin_id: &RecordId,
    ) -> StorageResult<MirrorOutcome> {
        caller.require(Role::Admin)?;
        Ok(self.sync.assignment_deleted(patient_id, medecin_id).await)
    }

    // ------------------------------------------------------------------
    // Relationship queries
    // ------------------------------------------------------------------

    /// The patients treated by a physician. Administrator, or the
    /// physician themself.
    pub async fn patients_treated_by(
        &self,
        caller: &Caller,
        medecin_id: &RecordId,
    ) -> StorageResult<Vec<Patient>> {
        authorize_on(caller, Role::Medecin, medecin_id)?;
        self.queries.patients_treated_by(medecin_id).await
    }

    /// A patient's consultation history with physician names.
    /// Administrator, or the patient themself.
    pub async fn consultation_history(
        &self,
        caller: &Caller,
        patient_id: &RecordId,
    ) -> StorageResult<Vec<ConsultationView>> {
        authorize_on(caller, Role::Patient, patient_id)?;
        self.queries.consultation_history(patient_id).await
    }

    /// A physician's consultations with patient names. Administrator,
    /// or the physician themself.
    pub async fn consultations_for_medecin(
        &self,
        caller: &Caller,
        medecin_id: &RecordId,
    ) -> StorageResult<Vec<ConsultationView>> {
        authorize_on(caller, Role::Medecin, medecin_id)?;
        self.queries.consultations_for_medecin(medecin_id).await
    }
}

/// Admin passes; otherwise the caller must hold `required` and be the
/// named record.
fn authorize_on(caller: &Caller, required: Role, record_id: &RecordId) -> Result<(), AuthError> {
    if caller.role() == Role::Admin {
        return Ok(());
    }
    caller.require(required)?;
    if caller.id() != record_id {
        return Err(AuthError::NotRecordOwner {
            id: record_id.clone(),
        });
    }
    Ok(())
}

/// Strips fields that never travel through a generic update.
///
/// Plaintext passwords must not be written by a partial update (the
/// dedicated password operation hashes first), and the identifier is
/// the cross-store join key.
fn sanitized_changes(changes: &Value) -> StorageResult<Value> {
    let Some(object) = changes.as_object() else {
        return Err(ValidationError::PayloadNotAnObject.into());
    };
    let mut object = object.clone();
    object.remove("id");
    object.remove("password");
    object.remove("password_hash");
    if object.is_empty() {
        return Err(ValidationError::EmptyUpdate.into());
    }
    Ok(Value::Object(object))
}

fn not_found(collection: Collection, id: &RecordId) -> crate::error::StorageError {
    RecordError::NotFound {
        collection,
        id: id.clone(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Caller {
        Caller::new(RecordId::new("a-1"), Role::Admin)
    }

    fn medecin(id: &str) -> Caller {
        Caller::new(RecordId::new(id), Role::Medecin)
    }

    #[test]
    fn test_authorize_on_admin_passes_for_any_record() {
        assert!(authorize_on(&admin(), Role::Medecin, &RecordId::new("m-1")).is_ok());
        assert!(authorize_on(&admin(), Role::Patient, &RecordId::new("p-1")).is_ok());
    }

    #[test]
    fn test_authorize_on_requires_self() {
        assert!(authorize_on(&medecin("m-1"), Role::Medecin, &RecordId::new("m-1")).is_ok());
        let err = authorize_on(&medecin("m-1"), Role::Medecin, &RecordId::new("m-2")).unwrap_err();
        assert!(matches!(err, AuthError::NotRecordOwner { .. }));
    }

    #[test]
    fn test_authorize_on_requires_role() {
        let caller = Caller::new(RecordId::new("p-1"), Role::Patient);
        let err = authorize_on(&caller, Role::Medecin, &RecordId::new("p-1")).unwrap_err();
        assert!(matches!(err, AuthError::Forbidden { .. }));
    }

    #[test]
    fn test_sanitized_changes_strip_credentials_and_id() {
        let changes = serde_json::json!({
            "id": "p-2",
            "family_name": "Ndiaye",
            "password": "plaintext",
            "password_hash": "$fake",
        });
        let sanitized = sanitized_changes(&changes).unwrap();
        let object = sanitized.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("family_name"));
    }

    #[test]
    fn test_sanitized_changes_reject_empty_updates() {
        let err = sanitized_changes(&serde_json::json!({"password": "x"})).unwrap_err();
        assert!(err.to_string().contains("no fields"));

        let err = sanitized_changes(&serde_json::json!(42)).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }
}
