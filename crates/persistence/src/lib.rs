//! Dossier Persistence Layer
//!
//! This crate keeps clinical records in two stores at once: a document
//! store holding the authoritative records, and a graph mirror holding a
//! filtered projection of them for relationship queries. Writes go to
//! the document store first; the mirror write follows as a best effort
//! whose failure is reported but never fails the operation.
//!
//! # Features
//!
//! - **Dual stores**: an authoritative document store plus a graph
//!   mirror of nodes and relationship edges
//! - **Best-effort sync**: every accepted write returns a receipt
//!   stating whether the mirror followed
//! - **Whitelisted projection**: only declared fields per entity reach
//!   the mirror; credentials never do
//! - **Role-gated operations**: administrator, physician, and patient
//!   roles checked before any store access
//! - **Relationship queries**: treated-patient and consultation-history
//!   lookups answered from both stores, deduplicated
//!
//! # Backend Features
//!
//! Enable backends with feature flags in `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! dossier-persistence = { version = "0.1", features = ["full"] }
//! ```
//!
//! Available backend features:
//! - `mongodb` - MongoDB as the primary document store
//! - `neo4j` - Neo4j as the graph mirror
//! - `full` - both of the above
//!
//! The in-memory pair is always available and needs no feature flag.
//!
//! # Architecture
//!
//! - [`core`] - Store traits, collections, labels, and the property
//!   whitelists
//! - [`error`] - Error types for all operations
//! - [`backends`] - Store implementations (in-memory, MongoDB, Neo4j)
//! - [`sync`] - Mirror propagation and its per-entity counters
//! - [`identity`] - Token resolution and the caller identity it yields
//! - [`query`] - Relationship queries over both stores
//! - [`service`] - Authorized record operations
//! - [`config`] - Connection settings and store wiring
//!
//! # Quick Start
//!
//! ```
//! use dossier_persistence::{Caller, RecordService, StoreContext};
//! use dossier_records::{NewPatient, RecordId, Role};
//!
//! # tokio_test::block_on(async {
//! let context = StoreContext::in_memory();
//! let service = RecordService::new(context.documents(), context.graph());
//! let admin = Caller::new(RecordId::new("admin-1"), Role::Admin);
//!
//! let receipt = service
//!     .create_patient(
//!         &admin,
//!         NewPatient {
//!             family_name: "Ba".to_string(),
//!             given_name: "Moussa".to_string(),
//!             birth_date: None,
//!             username: "mba".to_string(),
//!             password: "s3cret".to_string(),
//!         },
//!     )
//!     .await
//!     .unwrap();
//!
//! // The primary write succeeded and the mirror followed.
//! assert!(receipt.mirror.is_applied());
//! # });
//! ```
//!
//! # Consistency Model
//!
//! The document store is the only source of truth. The mirror may lag
//! behind it after a failed mirror write, and nothing reconciles the two
//! stores automatically: a failed mirror write is logged, counted, and
//! reported in the operation's receipt, then forgotten. Relationship
//! queries tolerate a stale or absent mirror by re-checking every
//! candidate against the document store and answering from consultation
//! records alone when the mirror cannot be reached.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod identity;
pub mod query;
pub mod service;
pub mod sync;

// Re-export commonly used types at crate root
pub use config::{StoreConfig, StoreContext};
pub use error::{StorageError, StorageResult};
pub use identity::{Caller, IdentityResolver, Resolution};
pub use service::{RecordService, WriteReceipt};

// Re-export store traits and their trait-object aliases
pub use core::{Collection, DocumentStore, DynDocumentStore, DynGraphStore, GraphStore};

// Re-export mirror outcome types
pub use sync::{MirrorCounters, MirrorOutcome, SyncManager};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
