//! Test harness infrastructure for dual-store testing.
//!
//! [`TestEnv`] wires an in-memory store pair to a [`RecordService`] and
//! seeds records through the same operations production callers use.
//! [`FlakyGraphStore`] injects mirror failures on demand, so tests can
//! exercise the best-effort half of the write path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use dossier_persistence::backends::{MemoryDocumentStore, MemoryGraphStore};
use dossier_persistence::core::{
    GraphEdge, GraphNode, GraphStore, NodeLabel, NodeSelector, PropertyMap, RelationType,
};
use dossier_persistence::error::{MirrorError, StorageResult};
use dossier_persistence::{Caller, IdentityResolver, RecordService, StoreContext};
use dossier_records::{RecordId, Role};

use super::fixtures::{MedecinFixture, PatientFixture, consultation_at};

/// A fully wired in-memory environment.
pub struct TestEnv {
    /// The store pair behind the service.
    pub context: StoreContext,
    /// The service under test.
    pub service: RecordService,
    /// An administrator caller for seeding.
    pub admin: Caller,
}

impl TestEnv {
    /// Creates an environment over fresh in-memory stores.
    pub fn new() -> Self {
        Self::with_context(StoreContext::in_memory())
    }

    /// Creates an environment over the given store pair.
    pub fn with_context(context: StoreContext) -> Self {
        let service = RecordService::new(context.documents(), context.graph());
        TestEnv {
            context,
            service,
            admin: Caller::new(RecordId::new("admin-1"), Role::Admin),
        }
    }

    /// Creates an environment whose mirror fails on demand.
    ///
    /// Returns the environment together with a handle for toggling
    /// failure injection.
    pub fn flaky() -> (Self, Arc<FlakyGraphStore>) {
        let graph = Arc::new(FlakyGraphStore::new());
        let context = StoreContext::new(Arc::new(MemoryDocumentStore::new()), graph.clone());
        (Self::with_context(context), graph)
    }

    /// An identity resolver over the environment's primary store.
    pub fn resolver(&self) -> IdentityResolver {
        IdentityResolver::new(self.context.documents())
    }

    /// Registers a patient while the mirror is healthy.
    ///
    /// Returns the new identifier and a caller acting as that patient.
    pub async fn seed_patient(&self, fixture: PatientFixture) -> (RecordId, Caller) {
        let receipt = self
            .service
            .create_patient(&self.admin, fixture.to_new())
            .await
            .expect("seeding a patient should succeed");
        assert!(
            receipt.mirror.is_applied(),
            "seed expects a healthy mirror: {:?}",
            receipt.mirror
        );
        let caller = Caller::new(receipt.id.clone(), Role::Patient);
        (receipt.id, caller)
    }

    /// Registers a physician while the mirror is healthy.
    ///
    /// Returns the new identifier and a caller acting as that physician.
    pub async fn seed_medecin(&self, fixture: MedecinFixture) -> (RecordId, Caller) {
        let receipt = self
            .service
            .create_medecin(&self.admin, fixture.to_new())
            .await
            .expect("seeding a physician should succeed");
        assert!(
            receipt.mirror.is_applied(),
            "seed expects a healthy mirror: {:?}",
            receipt.mirror
        );
        let caller = Caller::new(receipt.id.clone(), Role::Medecin);
        (receipt.id, caller)
    }

    /// Records a consultation as the given physician.
    pub async fn seed_consultation(
        &self,
        medecin: &Caller,
        patient_id: &RecordId,
        timestamp: &str,
        reason: &str,
    ) -> RecordId {
        let receipt = self
            .service
            .create_consultation(medecin, consultation_at(patient_id, timestamp, reason))
            .await
            .expect("seeding a consultation should succeed");
        assert!(
            receipt.mirror.is_applied(),
            "seed expects a healthy mirror: {:?}",
            receipt.mirror
        );
        receipt.id
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// A mirror that fails selected operation groups on demand.
///
/// Delegates everything to an in-memory graph store; while a flag is
/// raised, the matching operations return an internal mirror error
/// without touching the wrapped store.
pub struct FlakyGraphStore {
    inner: MemoryGraphStore,
    fail_nodes: AtomicBool,
    fail_edges: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyGraphStore {
    /// Creates a healthy wrapper over an empty graph.
    pub fn new() -> Self {
        FlakyGraphStore {
            inner: MemoryGraphStore::new(),
            fail_nodes: AtomicBool::new(false),
            fail_edges: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Makes node writes fail (or succeed again).
    pub fn fail_nodes(&self, fail: bool) {
        self.fail_nodes.store(fail, Ordering::SeqCst);
    }

    /// Makes edge writes fail (or succeed again).
    pub fn fail_edges(&self, fail: bool) {
        self.fail_edges.store(fail, Ordering::SeqCst);
    }

    /// Makes reads fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// The wrapped store, for direct state assertions.
    pub fn inner(&self) -> &MemoryGraphStore {
        &self.inner
    }

    fn check(&self, flag: &AtomicBool) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(MirrorError::Internal {
                backend_name: "flaky".to_string(),
                message: "injected mirror failure".to_string(),
                source: None,
            }
            .into());
        }
        Ok(())
    }
}

impl Default for FlakyGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for FlakyGraphStore {
    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    async fn upsert_node(&self, node: GraphNode) -> StorageResult<GraphNode> {
        self.check(&self.fail_nodes)?;
        self.inner.upsert_node(node).await
    }

    async fn find_node(&self, selector: &NodeSelector) -> StorageResult<Option<GraphNode>> {
        self.check(&self.fail_reads)?;
        self.inner.find_node(selector).await
    }

    async fn update_node(
        &self,
        selector: &NodeSelector,
        changes: PropertyMap,
    ) -> StorageResult<Option<GraphNode>> {
        self.check(&self.fail_nodes)?;
        self.inner.update_node(selector, changes).await
    }

    async fn delete_node(&self, selector: &NodeSelector) -> StorageResult<bool> {
        self.check(&self.fail_nodes)?;
        self.inner.delete_node(selector).await
    }

    async fn merge_edge(&self, edge: GraphEdge) -> StorageResult<Option<GraphEdge>> {
        self.check(&self.fail_edges)?;
        self.inner.merge_edge(edge).await
    }

    async fn delete_edge(
        &self,
        rel: RelationType,
        from: &NodeSelector,
        to: &NodeSelector,
    ) -> StorageResult<bool> {
        self.check(&self.fail_edges)?;
        self.inner.delete_edge(rel, from, to).await
    }

    async fn source_nodes(
        &self,
        rel: RelationType,
        to: &NodeSelector,
    ) -> StorageResult<Vec<GraphNode>> {
        self.check(&self.fail_reads)?;
        self.inner.source_nodes(rel, to).await
    }

    async fn count_nodes(&self, label: NodeLabel) -> StorageResult<u64> {
        self.check(&self.fail_reads)?;
        self.inner.count_nodes(label).await
    }

    async fn count_edges(&self, rel: RelationType) -> StorageResult<u64> {
        self.check(&self.fail_reads)?;
        self.inner.count_edges(rel).await
    }
}
