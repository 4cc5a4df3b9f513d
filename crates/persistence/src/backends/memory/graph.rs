//! GraphStore implementation backed by process memory.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use dossier_records::RecordId;

use crate::core::graph::validate_properties;
use crate::core::{GraphEdge, GraphNode, GraphStore, NodeLabel, NodeSelector, PropertyMap, RelationType};
use crate::error::StorageResult;

#[derive(Debug, Clone, PartialEq)]
struct EdgeRecord {
    rel: RelationType,
    from: u64,
    to: u64,
}

#[derive(Debug, Default)]
struct GraphData {
    next_key: u64,
    nodes: BTreeMap<u64, GraphNode>,
    edges: Vec<EdgeRecord>,
}

impl GraphData {
    fn find_key(&self, selector: &NodeSelector) -> Option<u64> {
        self.nodes.iter().find_map(|(key, node)| {
            let matches = node.label() == selector.label()
                && node.properties().get(selector.key()) == Some(selector.value());
            matches.then_some(*key)
        })
    }
}

/// An in-memory property graph.
///
/// Nodes get opaque numeric keys; matching always goes through
/// [`NodeSelector`], the same way the networked backend matches by
/// label and property.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    data: RwLock<GraphData>,
}

impl MemoryGraphStore {
    /// Creates an empty graph.
    pub fn new() -> Self {
        MemoryGraphStore::default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    fn backend_name(&self) -> &'static str {
        "memory-graph"
    }

    async fn upsert_node(&self, node: GraphNode) -> StorageResult<GraphNode> {
        let mut data = self.data.write().await;
        // Match on the mirrored identifier when the node carries one
        let existing = node.id().map(RecordId::new).and_then(|id| {
            let selector = NodeSelector::by_id(node.label(), &id);
            data.find_key(&selector)
        });
        match existing {
            Some(key) => {
                data.nodes.insert(key, node.clone());
            }
            None => {
                let key = data.next_key;
                data.next_key += 1;
                data.nodes.insert(key, node.clone());
            }
        }
        Ok(node)
    }

    async fn find_node(&self, selector: &NodeSelector) -> StorageResult<Option<GraphNode>> {
        let data = self.data.read().await;
        Ok(data.find_key(selector).and_then(|key| data.nodes.get(&key).cloned()))
    }

    async fn update_node(
        &self,
        selector: &NodeSelector,
        changes: PropertyMap,
    ) -> StorageResult<Option<GraphNode>> {
        validate_properties(selector.label(), &changes)?;

        let mut data = self.data.write().await;
        let Some(key) = data.find_key(selector) else {
            return Ok(None);
        };
        let Some(node) = data.nodes.get(&key) else {
            return Ok(None);
        };

        let mut properties = node.properties().clone();
        properties.extend(changes);
        let updated = GraphNode::new(node.label(), properties)?;
        data.nodes.insert(key, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_node(&self, selector: &NodeSelector) -> StorageResult<bool> {
        let mut data = self.data.write().await;
        let Some(key) = data.find_key(selector) else {
            return Ok(false);
        };
        data.nodes.remove(&key);
        // Detach semantics: no edge may survive its endpoint
        data.edges.retain(|edge| edge.from != key && edge.to != key);
        Ok(true)
    }

    async fn merge_edge(&self, edge: GraphEdge) -> StorageResult<Option<GraphEdge>> {
        let mut data = self.data.write().await;
        let (Some(from), Some(to)) = (data.find_key(&edge.from), data.find_key(&edge.to)) else {
            return Ok(None);
        };

        let already_present = data
            .edges
            .iter()
            .any(|record| record.rel == edge.rel && record.from == from && record.to == to);
        if !already_present {
            data.edges.push(EdgeRecord {
                rel: edge.rel,
                from,
                to,
            });
        }
        Ok(Some(edge))
    }

    async fn delete_edge(
        &self,
        rel: RelationType,
        from: &NodeSelector,
        to: &NodeSelector,
    ) -> StorageResult<bool> {
        let mut data = self.data.write().await;
        let (Some(from), Some(to)) = (data.find_key(from), data.find_key(to)) else {
            return Ok(false);
        };
        let before = data.edges.len();
        data.edges
            .retain(|record| !(record.rel == rel && record.from == from && record.to == to));
        Ok(data.edges.len() < before)
    }

    async fn source_nodes(
        &self,
        rel: RelationType,
        to: &NodeSelector,
    ) -> StorageResult<Vec<GraphNode>> {
        let data = self.data.read().await;
        let Some(target) = data.find_key(to) else {
            return Ok(Vec::new());
        };
        Ok(data
            .edges
            .iter()
            .filter(|record| record.rel == rel && record.to == target)
            .filter_map(|record| data.nodes.get(&record.from).cloned())
            .collect())
    }

    async fn count_nodes(&self, label: NodeLabel) -> StorageResult<u64> {
        let data = self.data.read().await;
        Ok(data.nodes.values().filter(|node| node.label() == label).count() as u64)
    }

    async fn count_edges(&self, rel: RelationType) -> StorageResult<u64> {
        let data = self.data.read().await;
        Ok(data.edges.iter().filter(|record| record.rel == rel).count() as u64)
    }
}
