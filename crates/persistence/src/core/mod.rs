//! Core storage traits and abstractions.
//!
//! This module provides the two store boundaries of the persistence layer:
//!
//! - [`DocumentStore`] - The authoritative document-oriented primary store
//! - [`GraphStore`] - The derived, best-effort graph mirror
//!
//! # Write ordering
//!
//! Every mutation follows one device, end to end:
//!
//! ```text
//! request ──► DocumentStore (authoritative, failure aborts)
//!                 └──► GraphStore (best effort, failure logged)
//! ```
//!
//! The mirror is never written before the primary commit, and a mirror
//! failure never rolls the primary write back. Both traits are object
//! safe; components hold them as [`DynDocumentStore`] / [`DynGraphStore`]
//! so tests can substitute in-memory or failure-injecting stores.

pub mod document;
pub mod graph;

// Re-export main types
pub use document::{Collection, DocumentStore, DynDocumentStore, Filter, StoredDocument};
pub use graph::{
    DynGraphStore, GraphEdge, GraphNode, GraphStore, NodeLabel, NodeSelector, PropertyMap,
    PropertyValue, RelationType, validate_properties,
};
