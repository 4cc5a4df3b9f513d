//! Test infrastructure for the persistence layer.
//!
//! Reusable fixtures and the dual-store harness shared by the
//! integration test suites.

pub mod fixtures;
pub mod harness;

// Re-export commonly used items
pub use fixtures::*;
pub use harness::*;
