//! Primary document-store trait.
//!
//! The document store is the system of record. Every mutation lands here
//! first; only after the authoritative write commits does the sync layer
//! project the change into the graph mirror. Reads during relationship
//! queries also resolve against this store, never against the mirror.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use dossier_records::{RecordId, Role};

use crate::error::{RecordError, StorageResult};

/// The collections of the primary store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Clinical patient records.
    Patients,
    /// Physician records.
    Medecins,
    /// Consultation records referencing one patient and one physician.
    Consultations,
    /// Login principals: admin accounts and entity-linked credentials.
    Principals,
}

impl Collection {
    /// All collections, in the order credentials are probed.
    pub const ALL: [Collection; 4] = [
        Collection::Principals,
        Collection::Medecins,
        Collection::Patients,
        Collection::Consultations,
    ];

    /// The collection name as stored by document backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Medecins => "medecins",
            Collection::Consultations => "consultations",
            Collection::Principals => "principals",
        }
    }

    /// The collection holding credentials for the given role.
    ///
    /// Admin credentials live in `principals`; physician and patient
    /// credentials live on the entity documents themselves.
    pub fn for_role(role: Role) -> Collection {
        match role {
            Role::Admin => Collection::Principals,
            Role::Medecin => Collection::Medecins,
            Role::Patient => Collection::Patients,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An equality filter over document fields.
///
/// Cross-store joins in this system are by identifier value, so equality
/// clauses are the only filter shape the stores need to support.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: BTreeMap<String, Value>,
}

impl Filter {
    /// Creates an empty filter that matches every document.
    pub fn new() -> Self {
        Filter::default()
    }

    /// A filter matching the document with the given identifier.
    pub fn by_id(id: &RecordId) -> Self {
        Filter::new().eq("id", id.as_str())
    }

    /// Adds an equality clause.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.insert(field.into(), value.into());
        self
    }

    /// Returns `true` when no clauses have been added.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Iterates the equality clauses in field order.
    pub fn clauses(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Evaluates the filter against a document's content.
    pub fn matches(&self, content: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| content.get(field) == Some(expected))
    }
}

/// A document as returned by the primary store.
///
/// The identifier is always materialized in the content under the `id`
/// key, whatever the backend's native key is, so entity decoding and
/// cross-store joins see a single shape.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    id: RecordId,
    content: Value,
}

impl StoredDocument {
    /// Wraps backend content under its identifier.
    pub fn new(id: RecordId, mut content: Value) -> Self {
        if let Value::Object(map) = &mut content {
            map.insert("id".to_string(), Value::String(id.as_str().to_string()));
        }
        StoredDocument { id, content }
    }

    /// The document's identifier.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// The document content, with `id` materialized.
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Consumes the document, returning its content.
    pub fn into_content(self) -> Value {
        self.content
    }

    /// Decodes the content into an entity type.
    ///
    /// # Errors
    ///
    /// * `RecordError::Malformed` - If the stored content does not fit the
    ///   entity's shape
    pub fn decode<T: DeserializeOwned>(&self, collection: Collection) -> StorageResult<T> {
        serde_json::from_value(self.content.clone()).map_err(|err| {
            RecordError::Malformed {
                collection,
                id: self.id.clone(),
                message: err.to_string(),
            }
            .into()
        })
    }
}

/// Storage trait for the primary document store.
///
/// Implementations persist free-form JSON documents in named collections.
/// All failures surface as [`crate::error::PrimaryStoreError`]; callers
/// treat any such failure as fatal for the operation in progress.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Inserts a document.
    ///
    /// When the payload carries a parseable `id` field that identifier is
    /// kept; otherwise a fresh one is assigned.
    ///
    /// # Returns
    ///
    /// The stored document with its identifier materialized.
    async fn insert(&self, collection: Collection, document: Value)
    -> StorageResult<StoredDocument>;

    /// Finds the first document matching the filter.
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StorageResult<Option<StoredDocument>>;

    /// Finds all documents matching the filter.
    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StorageResult<Vec<StoredDocument>>;

    /// Applies a partial update to the first matching document.
    ///
    /// Only the fields present in `changes` are written; other fields are
    /// left untouched.
    ///
    /// # Returns
    ///
    /// `true` if a document matched the filter.
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        changes: &Value,
    ) -> StorageResult<bool>;

    /// Deletes the first document matching the filter.
    ///
    /// # Returns
    ///
    /// `true` if a document was deleted.
    async fn delete_one(&self, collection: Collection, filter: &Filter) -> StorageResult<bool>;

    /// Counts the documents in a collection.
    async fn count(&self, collection: Collection) -> StorageResult<u64>;

    /// Finds a document by identifier.
    async fn find_by_id(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> StorageResult<Option<StoredDocument>> {
        self.find_one(collection, &Filter::by_id(id)).await
    }

    /// Checks whether a document with the given identifier exists.
    async fn exists(&self, collection: Collection, id: &RecordId) -> StorageResult<bool> {
        Ok(self.find_by_id(collection, id).await?.is_some())
    }
}

/// Shared handle to a document store.
pub type DynDocumentStore = Arc<dyn DocumentStore>;
