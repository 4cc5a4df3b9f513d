//! The operation layer over both stores.
//!
//! [`RecordService`] is the single entry point for mutations and
//! relationship lookups. It enforces the role gate before touching any
//! store, writes the primary store, and hands mirror propagation to the
//! sync layer. Passwords cross into storage only through
//! [`hash_password`]; plaintext never reaches a store.

mod credentials;
mod records;

// Re-export main types
pub use credentials::{hash_password, verify_password};
pub use records::{RecordService, WriteReceipt};
