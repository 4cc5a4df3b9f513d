//! Primary-to-mirror synchronization.
//!
//! One device keeps the two stores coherent: primary store first, mirror
//! second, mirror failure non-fatal. The [`SyncManager`] owns the second
//! half of that sentence — it projects committed primary mutations into
//! the graph and absorbs every mirror failure into a [`MirrorOutcome`]
//! the caller can report without failing the request.
//!
//! | Entity | On create | On update | On delete |
//! |--------|-----------|-----------|-----------|
//! | Patient | node | whitelisted fields | node (cascades edges) |
//! | Medecin | node | whitelisted fields | node (cascades edges) |
//! | Consultation | node + 2 edges | same sequence re-applied | node (cascades edges) |
//! | Principal | node + optional link edge | — | node (cascades edges) |
//! | Assignment | edge | — | edge |

mod manager;
mod schema;

pub use manager::{MirrorCounters, MirrorOutcome, SyncKind, SyncManager};
pub use schema::{filtered_changes, node_projection};
