//! Neo4j implementation of the graph mirror.

mod graph;

pub use graph::Neo4jGraphStore;
