//! Relationship-shaped read queries.
//!
//! These queries are the read side of the dual-store design: traverse
//! the mirror where edges answer faster than documents, then resolve
//! every identifier through the authoritative primary store.

mod relationships;

pub use relationships::{ConsultationView, RelationshipQueries};
