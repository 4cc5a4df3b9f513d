//! Store backend implementations.
//!
//! This module contains implementations of the two storage traits. The
//! in-memory pair is always available and backs the test suites; the
//! networked backends are gated behind feature flags.
//!
//! # Available Backends
//!
//! | Backend | Feature | Implements | Description |
//! |---------|---------|------------|-------------|
//! | Memory | always | both | Process-local stores for tests and demos |
//! | MongoDB | `mongodb` | [`DocumentStore`] | Document-oriented primary store |
//! | Neo4j | `neo4j` | [`GraphStore`] | Property-graph mirror |
//!
//! [`DocumentStore`]: crate::core::DocumentStore
//! [`GraphStore`]: crate::core::GraphStore

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongodb;

#[cfg(feature = "neo4j")]
pub mod neo4j;

pub use memory::{MemoryDocumentStore, MemoryGraphStore};

#[cfg(feature = "mongodb")]
pub use mongodb::MongoDocumentStore;

#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jGraphStore;
