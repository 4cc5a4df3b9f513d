//! Process-local in-memory stores.
//!
//! Both stores keep their state behind an async [`RwLock`] and implement
//! the same traits as the networked backends, so every component in this
//! crate can run against them unchanged. They back the test suites and
//! the quick-start examples.
//!
//! [`RwLock`]: tokio::sync::RwLock

mod document;
mod graph;

pub use document::MemoryDocumentStore;
pub use graph::MemoryGraphStore;
