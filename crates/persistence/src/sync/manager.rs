//! Best-effort propagation from the primary store into the mirror.
//!
//! Every method here runs strictly after the matching primary-store
//! mutation has committed. A mirror failure is recorded, logged, and
//! returned as a [`MirrorOutcome`]; it never propagates as an error and
//! never reverts the primary write. There are no retries and no queue:
//! one attempt, synchronously, on the caller's task.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use tracing::{debug, instrument, warn};

use dossier_records::{Principal, RecordId, Role};

use crate::core::{
    DynGraphStore, GraphEdge, GraphNode, NodeLabel, NodeSelector, PropertyMap, RelationType,
    StoredDocument,
};
use crate::error::{MirrorError, MirrorStep, StorageError};

use super::schema::{filtered_changes, node_projection};

/// The result of one best-effort mirror write.
#[derive(Debug)]
pub enum MirrorOutcome {
    /// The projection was written.
    Applied,
    /// There was nothing applicable to write.
    Skipped {
        /// Why the write was not attempted or matched nothing.
        reason: &'static str,
    },
    /// The write failed; the mirror is stale or partially updated.
    Failed(MirrorError),
}

impl MirrorOutcome {
    /// Returns `true` when the projection landed.
    pub fn is_applied(&self) -> bool {
        matches!(self, MirrorOutcome::Applied)
    }

    /// Returns `true` when the write failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, MirrorOutcome::Failed(_))
    }

    /// Returns `true` for a partial multi-step failure.
    pub fn is_partial(&self) -> bool {
        matches!(self, MirrorOutcome::Failed(err) if err.is_partial())
    }

    /// A warning message for the caller's response, if the mirror is now
    /// out of step with the primary store.
    pub fn warning(&self) -> Option<String> {
        match self {
            MirrorOutcome::Applied => None,
            MirrorOutcome::Skipped { .. } => None,
            MirrorOutcome::Failed(err) => Some(err.to_string()),
        }
    }
}

/// The entity kinds the manager keeps counters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// Patient node writes.
    Patient,
    /// Physician node writes.
    Medecin,
    /// Consultation node and edge writes.
    Consultation,
    /// Principal node and link-edge writes.
    Principal,
    /// Treating-physician edge writes.
    Assignment,
}

impl SyncKind {
    /// The kind as a log field value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Patient => "patient",
            SyncKind::Medecin => "medecin",
            SyncKind::Consultation => "consultation",
            SyncKind::Principal => "principal",
            SyncKind::Assignment => "assignment",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorCounters {
    /// Writes that landed.
    pub applied: u64,

    /// Writes with nothing applicable to do.
    pub skipped: u64,

    /// Writes that failed, leaving the mirror stale.
    pub failed: u64,

    /// The subset of failures that left partial multi-step state.
    pub partial: u64,
}

/// Propagates committed primary-store mutations into the graph mirror.
pub struct SyncManager {
    mirror: DynGraphStore,

    /// Outcome counters per entity kind.
    status: RwLock<HashMap<SyncKind, MirrorCounters>>,
}

impl SyncManager {
    /// Creates a manager writing into the given mirror.
    pub fn new(mirror: DynGraphStore) -> Self {
        SyncManager {
            mirror,
            status: RwLock::new(HashMap::new()),
        }
    }

    /// The counters recorded so far for one entity kind.
    pub fn counters(&self, kind: SyncKind) -> MirrorCounters {
        self.status.read().get(&kind).copied().unwrap_or_default()
    }

    /// All recorded counters.
    pub fn all_counters(&self) -> HashMap<SyncKind, MirrorCounters> {
        self.status.read().clone()
    }

    /// Mirrors a freshly created patient as a node.
    pub async fn patient_created(&self, document: &StoredDocument) -> MirrorOutcome {
        let outcome = self
            .write_node(NodeLabel::Patient, document)
            .await;
        self.finish(SyncKind::Patient, document.id(), outcome)
    }

    /// Mirrors whitelisted patient field changes.
    pub async fn patient_updated(&self, id: &RecordId, changes: &serde_json::Value) -> MirrorOutcome {
        let outcome = self.write_changes(NodeLabel::Patient, id, changes).await;
        self.finish(SyncKind::Patient, id, outcome)
    }

    /// Removes a patient node, cascading its edges.
    pub async fn patient_deleted(&self, id: &RecordId) -> MirrorOutcome {
        let outcome = self.remove_node(NodeLabel::Patient, id).await;
        self.finish(SyncKind::Patient, id, outcome)
    }

    /// Mirrors a freshly created physician as a node.
    pub async fn medecin_created(&self, document: &StoredDocument) -> MirrorOutcome {
        let outcome = self.write_node(NodeLabel::Medecin, document).await;
        self.finish(SyncKind::Medecin, document.id(), outcome)
    }

    /// Mirrors whitelisted physician field changes.
    pub async fn medecin_updated(&self, id: &RecordId, changes: &serde_json::Value) -> MirrorOutcome {
        let outcome = self.write_changes(NodeLabel::Medecin, id, changes).await;
        self.finish(SyncKind::Medecin, id, outcome)
    }

    /// Removes a physician node, cascading its edges.
    pub async fn medecin_deleted(&self, id: &RecordId) -> MirrorOutcome {
        let outcome = self.remove_node(NodeLabel::Medecin, id).await;
        self.finish(SyncKind::Medecin, id, outcome)
    }

    /// Mirrors a consultation: its node, the patient participation edge,
    /// and the physician assignment edge, in that order.
    ///
    /// The sequence is not atomic. The first failing step aborts the
    /// rest; if an earlier step already landed, the outcome carries
    /// [`MirrorError::Partial`] naming the completed and failed steps so
    /// an operator can find the half-mirrored consultation later.
    ///
    /// Updates re-apply the same sequence. The node write is a merge on
    /// the identifier, so a re-apply refreshes properties and edges
    /// instead of duplicating the node; edges from a superseded linkage
    /// are left in place.
    #[instrument(skip(self, document), fields(id = %document.id()))]
    pub async fn consultation_saved(
        &self,
        document: &StoredDocument,
        patient_id: &RecordId,
        medecin_id: &RecordId,
    ) -> MirrorOutcome {
        let id = document.id();
        let mut completed: Vec<MirrorStep> = Vec::new();

        let steps = async {
            // Step 1: the consultation node
            let properties = node_projection(NodeLabel::Consultation, document.content());
            let node = GraphNode::new(NodeLabel::Consultation, properties)?;
            self.mirror.upsert_node(node).await.map_err(to_mirror_error)?;
            completed.push(MirrorStep::Node);

            // Step 2: patient participation
            let consultation = NodeSelector::by_id(NodeLabel::Consultation, id);
            let patient = NodeSelector::by_id(NodeLabel::Patient, patient_id);
            let edge = GraphEdge::new(RelationType::Attends, patient, consultation.clone());
            let merged = self.mirror.merge_edge(edge).await.map_err(to_mirror_error)?;
            if merged.is_none() {
                return Err(MirrorError::EndpointMissing {
                    label: NodeLabel::Patient,
                    id: patient_id.as_str().to_string(),
                });
            }
            completed.push(MirrorStep::AttendsEdge);

            // Step 3: physician assignment
            let medecin = NodeSelector::by_id(NodeLabel::Medecin, medecin_id);
            let edge = GraphEdge::new(RelationType::AssignedTo, consultation, medecin);
            let merged = self.mirror.merge_edge(edge).await.map_err(to_mirror_error)?;
            if merged.is_none() {
                return Err(MirrorError::EndpointMissing {
                    label: NodeLabel::Medecin,
                    id: medecin_id.as_str().to_string(),
                });
            }
            completed.push(MirrorStep::AssignedToEdge);
            Ok(())
        }
        .await;

        let outcome = match steps {
            Ok(()) => MirrorOutcome::Applied,
            Err(err) if completed.is_empty() => MirrorOutcome::Failed(err),
            Err(err) => {
                let failed = match completed.len() {
                    1 => MirrorStep::AttendsEdge,
                    _ => MirrorStep::AssignedToEdge,
                };
                MirrorOutcome::Failed(MirrorError::Partial {
                    id: id.clone(),
                    completed,
                    failed,
                    message: err.to_string(),
                })
            }
        };
        self.finish(SyncKind::Consultation, id, outcome)
    }

    /// Removes a consultation node, cascading both of its edges.
    pub async fn consultation_deleted(&self, id: &RecordId) -> MirrorOutcome {
        let outcome = self.remove_node(NodeLabel::Consultation, id).await;
        self.finish(SyncKind::Consultation, id, outcome)
    }

    /// Mirrors a principal node plus, for entity-linked roles, an edge
    /// to the linked record's node.
    pub async fn principal_created(&self, principal: &Principal) -> MirrorOutcome {
        let outcome = self.write_principal(principal).await;
        self.finish(SyncKind::Principal, &principal.id, outcome)
    }

    /// Removes a principal node, cascading its link edge.
    pub async fn principal_deleted(&self, id: &RecordId) -> MirrorOutcome {
        let outcome = self.remove_node(NodeLabel::Principal, id).await;
        self.finish(SyncKind::Principal, id, outcome)
    }

    /// Mirrors a treating-physician assignment as a single edge.
    ///
    /// The edge write is a merge: assigning the same pair twice yields
    /// one edge.
    #[instrument(skip(self))]
    pub async fn assignment_created(
        &self,
        patient_id: &RecordId,
        medecin_id: &RecordId,
    ) -> MirrorOutcome {
        let patient = NodeSelector::by_id(NodeLabel::Patient, patient_id);
        let medecin = NodeSelector::by_id(NodeLabel::Medecin, medecin_id);
        let edge = GraphEdge::new(RelationType::HasTreatingPhysician, patient.clone(), medecin);

        let outcome = match self.mirror.merge_edge(edge).await {
            Ok(Some(_)) => MirrorOutcome::Applied,
            Ok(None) => {
                let missing = self.missing_endpoint(&patient, patient_id, medecin_id).await;
                MirrorOutcome::Failed(missing)
            }
            Err(err) => MirrorOutcome::Failed(to_mirror_error(err)),
        };
        self.finish(SyncKind::Assignment, patient_id, outcome)
    }

    /// Removes a treating-physician assignment edge.
    pub async fn assignment_deleted(
        &self,
        patient_id: &RecordId,
        medecin_id: &RecordId,
    ) -> MirrorOutcome {
        let patient = NodeSelector::by_id(NodeLabel::Patient, patient_id);
        let medecin = NodeSelector::by_id(NodeLabel::Medecin, medecin_id);

        let outcome = match self
            .mirror
            .delete_edge(RelationType::HasTreatingPhysician, &patient, &medecin)
            .await
        {
            Ok(true) => MirrorOutcome::Applied,
            Ok(false) => MirrorOutcome::Skipped {
                reason: "assignment edge not mirrored",
            },
            Err(err) => MirrorOutcome::Failed(to_mirror_error(err)),
        };
        self.finish(SyncKind::Assignment, patient_id, outcome)
    }

    async fn write_node(&self, label: NodeLabel, document: &StoredDocument) -> MirrorOutcome {
        let properties = node_projection(label, document.content());
        let node = match GraphNode::new(label, properties) {
            Ok(node) => node,
            Err(err) => return MirrorOutcome::Failed(err),
        };
        match self.mirror.upsert_node(node).await {
            Ok(_) => MirrorOutcome::Applied,
            Err(err) => MirrorOutcome::Failed(to_mirror_error(err)),
        }
    }

    async fn write_changes(
        &self,
        label: NodeLabel,
        id: &RecordId,
        changes: &serde_json::Value,
    ) -> MirrorOutcome {
        let filtered = filtered_changes(label, changes);
        if filtered.is_empty() {
            return MirrorOutcome::Skipped {
                reason: "no mirrored fields in update",
            };
        }
        match self
            .mirror
            .update_node(&NodeSelector::by_id(label, id), filtered)
            .await
        {
            Ok(Some(_)) => MirrorOutcome::Applied,
            Ok(None) => MirrorOutcome::Skipped {
                reason: "record has no mirrored node",
            },
            Err(err) => MirrorOutcome::Failed(to_mirror_error(err)),
        }
    }

    async fn remove_node(&self, label: NodeLabel, id: &RecordId) -> MirrorOutcome {
        match self.mirror.delete_node(&NodeSelector::by_id(label, id)).await {
            Ok(true) => MirrorOutcome::Applied,
            Ok(false) => MirrorOutcome::Skipped {
                reason: "record has no mirrored node",
            },
            Err(err) => MirrorOutcome::Failed(to_mirror_error(err)),
        }
    }

    async fn write_principal(&self, principal: &Principal) -> MirrorOutcome {
        let mut properties = PropertyMap::new();
        properties.insert("id".to_string(), principal.id.as_str().into());
        properties.insert("username".to_string(), principal.username.clone().into());
        properties.insert("role".to_string(), principal.role.as_str().into());

        let node = match GraphNode::new(NodeLabel::Principal, properties) {
            Ok(node) => node,
            Err(err) => return MirrorOutcome::Failed(err),
        };
        if let Err(err) = self.mirror.upsert_node(node).await {
            return MirrorOutcome::Failed(to_mirror_error(err));
        }

        // Administrators link to nothing; other roles link to their record
        let (Some(linked_id), Some(label)) =
            (&principal.linked_id, linked_label(principal.role))
        else {
            return MirrorOutcome::Applied;
        };

        let from = NodeSelector::by_id(NodeLabel::Principal, &principal.id);
        let to = NodeSelector::by_id(label, linked_id);
        let edge = GraphEdge::new(RelationType::LinkedTo, from, to);
        match self.mirror.merge_edge(edge).await {
            Ok(Some(_)) => MirrorOutcome::Applied,
            Ok(None) => MirrorOutcome::Failed(MirrorError::EndpointMissing {
                label,
                id: linked_id.as_str().to_string(),
            }),
            Err(err) => MirrorOutcome::Failed(to_mirror_error(err)),
        }
    }

    /// Names the endpoint an assignment edge merge could not find.
    async fn missing_endpoint(
        &self,
        patient: &NodeSelector,
        patient_id: &RecordId,
        medecin_id: &RecordId,
    ) -> MirrorError {
        match self.mirror.find_node(patient).await {
            Ok(None) => MirrorError::EndpointMissing {
                label: NodeLabel::Patient,
                id: patient_id.as_str().to_string(),
            },
            Ok(Some(_)) => MirrorError::EndpointMissing {
                label: NodeLabel::Medecin,
                id: medecin_id.as_str().to_string(),
            },
            Err(err) => to_mirror_error(err),
        }
    }

    /// Records counters and logs the outcome, then hands it back.
    fn finish(&self, kind: SyncKind, id: &RecordId, outcome: MirrorOutcome) -> MirrorOutcome {
        {
            let mut status = self.status.write();
            let counters = status.entry(kind).or_default();
            match &outcome {
                MirrorOutcome::Applied => counters.applied += 1,
                MirrorOutcome::Skipped { .. } => counters.skipped += 1,
                MirrorOutcome::Failed(err) => {
                    counters.failed += 1;
                    if err.is_partial() {
                        counters.partial += 1;
                    }
                }
            }
        }

        match &outcome {
            MirrorOutcome::Applied => {
                debug!(entity = %kind, id = %id, "mirror write applied");
            }
            MirrorOutcome::Skipped { reason } => {
                debug!(entity = %kind, id = %id, reason, "mirror write skipped");
            }
            MirrorOutcome::Failed(err) => {
                warn!(entity = %kind, id = %id, error = %err, "mirror write failed");
            }
        }
        outcome
    }
}

/// Extracts the mirror category from a storage error.
fn to_mirror_error(err: StorageError) -> MirrorError {
    match err {
        StorageError::Mirror(err) => err,
        other => MirrorError::Internal {
            backend_name: "mirror".to_string(),
            message: other.to_string(),
            source: None,
        },
    }
}

/// The node label a principal of this role links to.
fn linked_label(role: Role) -> Option<NodeLabel> {
    match role {
        Role::Admin => None,
        Role::Medecin => Some(NodeLabel::Medecin),
        Role::Patient => Some(NodeLabel::Patient),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        assert!(MirrorOutcome::Applied.is_applied());
        assert!(MirrorOutcome::Applied.warning().is_none());

        let skipped = MirrorOutcome::Skipped {
            reason: "no mirrored fields in update",
        };
        assert!(!skipped.is_failed());
        assert!(skipped.warning().is_none());

        let failed = MirrorOutcome::Failed(MirrorError::Internal {
            backend_name: "neo4j".to_string(),
            message: "connection reset".to_string(),
            source: None,
        });
        assert!(failed.is_failed());
        assert!(!failed.is_partial());
        assert!(failed.warning().is_some());
    }

    #[test]
    fn test_partial_failure_is_flagged() {
        let outcome = MirrorOutcome::Failed(MirrorError::Partial {
            id: RecordId::new("c-1"),
            completed: vec![MirrorStep::Node],
            failed: MirrorStep::AttendsEdge,
            message: "boom".to_string(),
        });
        assert!(outcome.is_failed());
        assert!(outcome.is_partial());
    }

    #[test]
    fn test_counters_default_to_zero() {
        let counters = MirrorCounters::default();
        assert_eq!(counters.applied, 0);
        assert_eq!(counters.skipped, 0);
        assert_eq!(counters.failed, 0);
        assert_eq!(counters.partial, 0);
    }

    #[test]
    fn test_linked_label_per_role() {
        assert_eq!(linked_label(Role::Admin), None);
        assert_eq!(linked_label(Role::Medecin), Some(NodeLabel::Medecin));
        assert_eq!(linked_label(Role::Patient), Some(NodeLabel::Patient));
    }
}
