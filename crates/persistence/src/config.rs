//! Store configuration and wiring.
//!
//! [`StoreConfig`] describes where the two stores live; [`StoreContext`]
//! holds the connected pair behind the trait objects the rest of the
//! crate consumes. `StoreContext::in_memory` needs no configuration and
//! backs every test in this crate.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::backends::{MemoryDocumentStore, MemoryGraphStore};
use crate::core::{DynDocumentStore, DynGraphStore};

/// Connection settings for the primary store and the mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// MongoDB connection URI.
    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,

    /// MongoDB database name.
    #[serde(default = "default_mongodb_database")]
    pub mongodb_database: String,

    /// Neo4j bolt URI.
    #[serde(default = "default_neo4j_uri")]
    pub neo4j_uri: String,

    /// Neo4j username.
    #[serde(default = "default_neo4j_user")]
    pub neo4j_user: String,

    /// Neo4j password.
    #[serde(default)]
    pub neo4j_password: Option<String>,
}

fn default_mongodb_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongodb_database() -> String {
    "dossier".to_string()
}

fn default_neo4j_uri() -> String {
    "neo4j://localhost:7687".to_string()
}

fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mongodb_uri: default_mongodb_uri(),
            mongodb_database: default_mongodb_database(),
            neo4j_uri: default_neo4j_uri(),
            neo4j_user: default_neo4j_user(),
            neo4j_password: None,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `DOSSIER_MONGO_URI` (default: "mongodb://localhost:27017")
    /// - `DOSSIER_MONGO_DB` (default: "dossier")
    /// - `DOSSIER_NEO4J_URI` (default: "neo4j://localhost:7687")
    /// - `DOSSIER_NEO4J_USER` (default: "neo4j")
    /// - `DOSSIER_NEO4J_PASSWORD`
    pub fn from_env() -> Self {
        Self {
            mongodb_uri: std::env::var("DOSSIER_MONGO_URI")
                .unwrap_or_else(|_| default_mongodb_uri()),
            mongodb_database: std::env::var("DOSSIER_MONGO_DB")
                .unwrap_or_else(|_| default_mongodb_database()),
            neo4j_uri: std::env::var("DOSSIER_NEO4J_URI").unwrap_or_else(|_| default_neo4j_uri()),
            neo4j_user: std::env::var("DOSSIER_NEO4J_USER")
                .unwrap_or_else(|_| default_neo4j_user()),
            neo4j_password: std::env::var("DOSSIER_NEO4J_PASSWORD").ok(),
        }
    }
}

/// A connected primary store and mirror pair.
#[derive(Clone)]
pub struct StoreContext {
    documents: DynDocumentStore,
    graph: DynGraphStore,
}

impl StoreContext {
    /// Creates a context over any store pair.
    pub fn new(documents: DynDocumentStore, graph: DynGraphStore) -> Self {
        StoreContext { documents, graph }
    }

    /// Creates a context over fresh in-memory stores.
    pub fn in_memory() -> Self {
        StoreContext {
            documents: Arc::new(MemoryDocumentStore::new()),
            graph: Arc::new(MemoryGraphStore::new()),
        }
    }

    /// Connects to MongoDB and Neo4j per the configuration.
    ///
    /// The primary store must answer; a mirror that cannot be reached
    /// fails startup too, since a context with a permanently absent
    /// mirror would silently degrade every relationship query.
    #[cfg(all(feature = "mongodb", feature = "neo4j"))]
    pub async fn connect(config: &StoreConfig) -> crate::error::StorageResult<Self> {
        use crate::backends::{MongoDocumentStore, Neo4jGraphStore};

        let documents =
            MongoDocumentStore::connect(&config.mongodb_uri, &config.mongodb_database).await?;
        let graph = Neo4jGraphStore::connect(
            &config.neo4j_uri,
            &config.neo4j_user,
            config.neo4j_password.as_deref().unwrap_or_default(),
        )
        .await?;
        Ok(StoreContext {
            documents: Arc::new(documents),
            graph: Arc::new(graph),
        })
    }

    /// The primary document store.
    pub fn documents(&self) -> DynDocumentStore {
        self.documents.clone()
    }

    /// The graph mirror.
    pub fn graph(&self) -> DynGraphStore {
        self.graph.clone()
    }
}
