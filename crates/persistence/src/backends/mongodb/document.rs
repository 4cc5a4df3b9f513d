//! DocumentStore implementation for MongoDB.
//!
//! Documents are keyed by `_id`; this adapter always writes string keys
//! and maps them to the `id` field the rest of the crate sees. Reads
//! also accept legacy documents keyed by ObjectId, rendering the key in
//! its hex form.

use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document, doc, oid::ObjectId};
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::debug;

use dossier_records::RecordId;

use crate::core::{Collection, DocumentStore, Filter, StoredDocument};
use crate::error::{PrimaryStoreError, StorageError, StorageResult, ValidationError};

fn serialization_error(message: String) -> StorageError {
    StorageError::Primary(PrimaryStoreError::Serialization { message })
}

/// Renders a stored `_id` as the string identifier the crate uses.
fn id_from_bson(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the `_id` clause for an identifier value.
///
/// Identifiers written by this adapter are strings, but a 24-hex-digit
/// value may also name a legacy ObjectId-keyed document, so both forms
/// are matched.
fn id_clause(value: &str) -> Bson {
    match ObjectId::parse_str(value) {
        Ok(oid) => Bson::Document(doc! {
            "$in": [Bson::String(value.to_string()), Bson::ObjectId(oid)]
        }),
        Err(_) => Bson::String(value.to_string()),
    }
}

/// Converts an equality filter into a MongoDB filter document.
fn filter_document(filter: &Filter) -> StorageResult<Document> {
    let mut document = Document::new();
    for (field, value) in filter.clauses() {
        if field == "id" {
            let id = value.as_str().unwrap_or_default();
            document.insert("_id", id_clause(id));
        } else {
            let bson = bson::to_bson(value)
                .map_err(|e| serialization_error(format!("filter value for {field}: {e}")))?;
            document.insert(field, bson);
        }
    }
    Ok(document)
}

/// Converts a stored MongoDB document back into the crate's shape.
fn into_stored(mut document: Document) -> StoredDocument {
    let id = document
        .remove("_id")
        .map(|bson| id_from_bson(&bson))
        .unwrap_or_default();
    let content = Bson::Document(document).into_relaxed_extjson();
    StoredDocument::new(RecordId::new(id), content)
}

/// MongoDB-backed primary store.
#[derive(Clone)]
pub struct MongoDocumentStore {
    database: Database,
}

impl MongoDocumentStore {
    /// Connects to a MongoDB deployment and verifies it answers.
    ///
    /// # Errors
    ///
    /// * `PrimaryStoreError::ConnectionFailed` - If the deployment is
    ///   unreachable
    pub async fn connect(uri: &str, database: &str) -> StorageResult<Self> {
        let client = Client::with_uri_str(uri).await.map_err(|e| {
            PrimaryStoreError::ConnectionFailed {
                backend_name: "mongodb".to_string(),
                message: e.to_string(),
            }
        })?;
        let database = client.database(database);
        // The client connects lazily; a ping surfaces bad deployments now
        database
            .run_command(doc! {"ping": 1})
            .await
            .map_err(|e| PrimaryStoreError::ConnectionFailed {
                backend_name: "mongodb".to_string(),
                message: e.to_string(),
            })?;
        debug!(database = %database.name(), "connected to mongodb");
        Ok(MongoDocumentStore { database })
    }

    /// Wraps an already-selected database handle.
    pub fn with_database(database: Database) -> Self {
        MongoDocumentStore { database }
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.database.collection(collection.as_str())
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn insert(
        &self,
        collection: Collection,
        document: Value,
    ) -> StorageResult<StoredDocument> {
        if !document.is_object() {
            return Err(ValidationError::PayloadNotAnObject.into());
        }

        let mut body = bson::to_document(&document)
            .map_err(|e| serialization_error(format!("document payload: {e}")))?;
        // The identifier lives in _id only; the id field is re-materialized on read
        let id = match body.remove("id") {
            Some(Bson::String(raw)) => RecordId::parse(&raw)?,
            _ => RecordId::generate(),
        };
        body.insert("_id", Bson::String(id.as_str().to_string()));

        self.collection(collection).insert_one(&body).await?;
        Ok(into_stored(body))
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StorageResult<Option<StoredDocument>> {
        let filter = filter_document(filter)?;
        let found = self.collection(collection).find_one(filter).await?;
        Ok(found.map(into_stored))
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StorageResult<Vec<StoredDocument>> {
        let filter = filter_document(filter)?;
        let mut cursor = self.collection(collection).find(filter).await?;
        let mut results = Vec::new();
        while cursor.advance().await? {
            let document = cursor
                .deserialize_current()
                .map_err(|e| serialization_error(format!("cursor row: {e}")))?;
            results.push(into_stored(document));
        }
        Ok(results)
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        changes: &Value,
    ) -> StorageResult<bool> {
        let mut set = bson::to_document(changes)
            .map_err(|e| serialization_error(format!("update payload: {e}")))?;
        // The key never moves under an update
        set.remove("_id");
        set.remove("id");

        let filter = filter_document(filter)?;
        if set.is_empty() {
            let found = self.collection(collection).find_one(filter).await?;
            return Ok(found.is_some());
        }

        let result = self
            .collection(collection)
            .update_one(filter, doc! {"$set": set})
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> StorageResult<bool> {
        let filter = filter_document(filter)?;
        let result = self.collection(collection).delete_one(filter).await?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self, collection: Collection) -> StorageResult<u64> {
        let total = self
            .collection(collection)
            .count_documents(Document::new())
            .await?;
        Ok(total)
    }
}
