//! DocumentStore implementation backed by process memory.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use dossier_records::RecordId;

use crate::core::{Collection, DocumentStore, Filter, StoredDocument};
use crate::error::{StorageResult, ValidationError};

/// An in-memory document store.
///
/// Documents are held per collection in insertion order, which keeps
/// `find_many` results deterministic for tests.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<StoredDocument>>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryDocumentStore::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend_name(&self) -> &'static str {
        "memory-documents"
    }

    async fn insert(
        &self,
        collection: Collection,
        document: Value,
    ) -> StorageResult<StoredDocument> {
        if !document.is_object() {
            return Err(ValidationError::PayloadNotAnObject.into());
        }

        // Keep a supplied identifier, otherwise assign a fresh one
        let id = match document.get("id").and_then(Value::as_str) {
            Some(raw) => RecordId::parse(raw)?,
            None => RecordId::generate(),
        };
        let stored = StoredDocument::new(id.clone(), document);

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        // Re-inserting an existing identifier replaces the document in place
        if let Some(existing) = docs.iter_mut().find(|doc| doc.id() == &id) {
            *existing = stored.clone();
        } else {
            docs.push(stored.clone());
        }
        Ok(stored)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StorageResult<Option<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc.content())))
            .cloned())
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StorageResult<Vec<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(doc.content()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        changes: &Value,
    ) -> StorageResult<bool> {
        let changes = changes
            .as_object()
            .ok_or(ValidationError::PayloadNotAnObject)?;

        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        let Some(doc) = docs.iter_mut().find(|doc| filter.matches(doc.content())) else {
            return Ok(false);
        };

        let mut content = doc.content().clone();
        if let Some(map) = content.as_object_mut() {
            for (key, value) in changes {
                map.insert(key.clone(), value.clone());
            }
        }
        // Rewrapping re-materializes the identifier, so a stray "id" in
        // the changes can never detach a document from its key
        *doc = StoredDocument::new(doc.id().clone(), content);
        Ok(true)
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> StorageResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        match docs.iter().position(|doc| filter.matches(doc.content())) {
            Some(index) => {
                docs.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self, collection: Collection) -> StorageResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.len() as u64)
            .unwrap_or(0))
    }
}
