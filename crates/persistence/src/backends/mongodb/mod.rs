//! MongoDB implementation of the primary document store.

mod document;

pub use document::MongoDocumentStore;
