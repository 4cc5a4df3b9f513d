//! Cross-store relationship queries.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use dossier_records::{Consultation, Medecin, Patient, RecordId};

use crate::core::{
    Collection, DynDocumentStore, DynGraphStore, Filter, GraphNode, NodeLabel, NodeSelector,
    RelationType,
};
use crate::error::StorageResult;

/// A consultation joined with its counterpart's display name.
///
/// For a patient's history the counterpart is the physician; for a
/// physician's list it is the patient. `None` means the counterpart
/// record no longer resolves in the primary store.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultationView {
    /// The consultation record.
    pub consultation: Consultation,
    /// The counterpart's display name, when their record still exists.
    pub counterpart_name: Option<String>,
}

/// Answers relationship questions by joining both stores.
///
/// The two sources are maintained independently and either may be stale
/// relative to the other; every answer here is a best-effort
/// reconciliation resolved through the authoritative primary store,
/// never a consistency guarantee.
#[derive(Clone)]
pub struct RelationshipQueries {
    documents: DynDocumentStore,
    graph: DynGraphStore,
}

impl RelationshipQueries {
    /// Creates a facade over the two stores.
    pub fn new(documents: DynDocumentStore, graph: DynGraphStore) -> Self {
        RelationshipQueries { documents, graph }
    }

    /// The patients treated by a physician.
    ///
    /// Takes the union of two independently-derived identifier sets,
    /// deduplicated by identifier value:
    ///
    /// 1. patients appearing in the physician's consultations (primary store)
    /// 2. patients holding a treating-physician edge to the physician (mirror)
    ///
    /// Each identifier is then resolved back to its full record via the
    /// primary store; identifiers that no longer resolve are skipped. A
    /// mirror read failure degrades the answer to the consultation-derived
    /// set instead of failing the query.
    pub async fn patients_treated_by(&self, medecin_id: &RecordId) -> StorageResult<Vec<Patient>> {
        let mut patient_ids: BTreeSet<String> = BTreeSet::new();

        let filter = Filter::new().eq("medecin_id", medecin_id.as_str());
        let consultations = self
            .documents
            .find_many(Collection::Consultations, &filter)
            .await?;
        for consultation in &consultations {
            if let Some(patient_id) = consultation
                .content()
                .get("patient_id")
                .and_then(serde_json::Value::as_str)
            {
                patient_ids.insert(patient_id.to_string());
            }
        }

        let target = NodeSelector::by_id(NodeLabel::Medecin, medecin_id);
        match self
            .graph
            .source_nodes(RelationType::HasTreatingPhysician, &target)
            .await
        {
            Ok(nodes) => {
                patient_ids.extend(nodes.iter().filter_map(GraphNode::id).map(str::to_string));
            }
            Err(err) => {
                warn!(
                    medecin_id = %medecin_id,
                    error = %err,
                    "mirror unavailable, answering from consultations only"
                );
            }
        }

        let mut patients = Vec::with_capacity(patient_ids.len());
        for raw_id in patient_ids {
            let id = RecordId::new(raw_id);
            // Already deleted on the primary side: skip, whatever the mirror says
            let Some(record) = self.documents.find_by_id(Collection::Patients, &id).await? else {
                continue;
            };
            patients.push(record.decode::<Patient>(Collection::Patients)?);
        }
        Ok(patients)
    }

    /// A patient's consultation history, each entry enriched with the
    /// physician's display name.
    pub async fn consultation_history(
        &self,
        patient_id: &RecordId,
    ) -> StorageResult<Vec<ConsultationView>> {
        let filter = Filter::new().eq("patient_id", patient_id.as_str());
        self.consultation_views(filter, Counterpart::Medecin).await
    }

    /// The consultations owned by a physician, each entry enriched with
    /// the patient's display name.
    pub async fn consultations_for_medecin(
        &self,
        medecin_id: &RecordId,
    ) -> StorageResult<Vec<ConsultationView>> {
        let filter = Filter::new().eq("medecin_id", medecin_id.as_str());
        self.consultation_views(filter, Counterpart::Patient).await
    }

    async fn consultation_views(
        &self,
        filter: Filter,
        counterpart: Counterpart,
    ) -> StorageResult<Vec<ConsultationView>> {
        let records = self
            .documents
            .find_many(Collection::Consultations, &filter)
            .await?;

        // One name lookup per distinct counterpart
        let mut names: HashMap<RecordId, Option<String>> = HashMap::new();
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            let consultation = record.decode::<Consultation>(Collection::Consultations)?;
            let counterpart_id = match counterpart {
                Counterpart::Medecin => consultation.medecin_id.clone(),
                Counterpart::Patient => consultation.patient_id.clone(),
            };
            let counterpart_name = match names.get(&counterpart_id) {
                Some(cached) => cached.clone(),
                None => {
                    let name = self.counterpart_name(counterpart, &counterpart_id).await?;
                    names.insert(counterpart_id, name.clone());
                    name
                }
            };
            views.push(ConsultationView {
                consultation,
                counterpart_name,
            });
        }
        Ok(views)
    }

    async fn counterpart_name(
        &self,
        counterpart: Counterpart,
        id: &RecordId,
    ) -> StorageResult<Option<String>> {
        match counterpart {
            Counterpart::Medecin => {
                let Some(record) = self.documents.find_by_id(Collection::Medecins, id).await?
                else {
                    return Ok(None);
                };
                let medecin = record.decode::<Medecin>(Collection::Medecins)?;
                Ok(Some(medecin.full_name()))
            }
            Counterpart::Patient => {
                let Some(record) = self.documents.find_by_id(Collection::Patients, id).await?
                else {
                    return Ok(None);
                };
                let patient = record.decode::<Patient>(Collection::Patients)?;
                Ok(Some(patient.full_name()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Counterpart {
    Medecin,
    Patient,
}
