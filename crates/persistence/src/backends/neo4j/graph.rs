//! GraphStore implementation for Neo4j.
//!
//! Query text is assembled only from the fixed label and relationship
//! enumerations plus whitelisted property keys; property values always
//! travel as bound parameters. Nothing caller-controlled can reach the
//! Cypher source.

use async_trait::async_trait;
use neo4rs::{Graph, Node, Query, query};
use tracing::debug;

use crate::core::graph::validate_properties;
use crate::core::{
    GraphEdge, GraphNode, GraphStore, NodeLabel, NodeSelector, PropertyMap, PropertyValue,
    RelationType,
};
use crate::error::{MirrorError, StorageError, StorageResult};

fn internal_error(message: String) -> StorageError {
    StorageError::Mirror(MirrorError::Internal {
        backend_name: "neo4j".to_string(),
        message,
        source: None,
    })
}

fn with_param(query: Query, key: &str, value: &PropertyValue) -> Query {
    match value {
        PropertyValue::Text(text) => query.param(key, text.as_str()),
        PropertyValue::Integer(int) => query.param(key, *int),
        PropertyValue::Float(float) => query.param(key, *float),
        PropertyValue::Boolean(flag) => query.param(key, *flag),
    }
}

/// The first recognized label on a returned node, if any.
fn node_label(node: &Node) -> Option<NodeLabel> {
    node.labels().iter().find_map(|label| NodeLabel::parse(label))
}

/// Reads a returned node's whitelisted properties.
fn read_node(node: &Node, label: NodeLabel) -> GraphNode {
    let mut properties = PropertyMap::new();
    for key in node.keys() {
        if !label.is_allowed_key(key) {
            continue;
        }
        let value = if let Ok(text) = node.get::<String>(key) {
            PropertyValue::Text(text)
        } else if let Ok(int) = node.get::<i64>(key) {
            PropertyValue::Integer(int)
        } else if let Ok(float) = node.get::<f64>(key) {
            PropertyValue::Float(float)
        } else if let Ok(flag) = node.get::<bool>(key) {
            PropertyValue::Boolean(flag)
        } else {
            continue;
        };
        properties.insert(key.to_string(), value);
    }
    GraphNode::from_stored(label, properties)
}

/// Neo4j-backed graph mirror.
#[derive(Clone)]
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    /// Connects to a Neo4j deployment.
    ///
    /// # Errors
    ///
    /// * `MirrorError::ConnectionFailed` - If the deployment is
    ///   unreachable or rejects the credentials
    pub async fn connect(uri: &str, user: &str, password: &str) -> StorageResult<Self> {
        let graph = Graph::new(uri, user, password).await.map_err(|e| {
            MirrorError::ConnectionFailed {
                backend_name: "neo4j".to_string(),
                message: e.to_string(),
            }
        })?;
        debug!(uri, "connected to neo4j");
        Ok(Neo4jGraphStore { graph })
    }

    /// Wraps an existing driver handle.
    pub fn with_graph(graph: Graph) -> Self {
        Neo4jGraphStore { graph }
    }

    /// Runs a query expected to return one aggregate column.
    async fn read_count(&self, query: Query, column: &str) -> StorageResult<i64> {
        let mut stream = self.graph.execute(query).await?;
        match stream.next().await? {
            Some(row) => row
                .get::<i64>(column)
                .map_err(|e| internal_error(format!("aggregate column {column}: {e}"))),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    fn backend_name(&self) -> &'static str {
        "neo4j"
    }

    async fn upsert_node(&self, node: GraphNode) -> StorageResult<GraphNode> {
        let label = node.label().as_str();
        // Keys come from the label whitelist; values are bound parameters
        let map_entries = node
            .properties()
            .keys()
            .map(|key| format!("{key}: ${key}"))
            .collect::<Vec<_>>()
            .join(", ");

        let text = match node.id() {
            Some(_) => format!("MERGE (n:{label} {{id: $id}}) SET n = {{{map_entries}}}"),
            None => format!("CREATE (n:{label} {{{map_entries}}})"),
        };

        let mut q = query(&text);
        for (key, value) in node.properties() {
            q = with_param(q, key, value);
        }
        self.graph.run(q).await?;
        Ok(node)
    }

    async fn find_node(&self, selector: &NodeSelector) -> StorageResult<Option<GraphNode>> {
        let text = format!(
            "MATCH (n:{} {{{}: $value}}) RETURN n LIMIT 1",
            selector.label().as_str(),
            selector.key()
        );
        let q = with_param(query(&text), "value", selector.value());

        let mut stream = self.graph.execute(q).await?;
        match stream.next().await? {
            Some(row) => {
                let node: Node = row
                    .get("n")
                    .map_err(|e| internal_error(format!("returned node: {e}")))?;
                Ok(Some(read_node(&node, selector.label())))
            }
            None => Ok(None),
        }
    }

    async fn update_node(
        &self,
        selector: &NodeSelector,
        changes: PropertyMap,
    ) -> StorageResult<Option<GraphNode>> {
        validate_properties(selector.label(), &changes)?;
        if changes.is_empty() {
            return self.find_node(selector).await;
        }

        let assignments = changes
            .keys()
            .map(|key| format!("n.{key} = $set_{key}"))
            .collect::<Vec<_>>()
            .join(", ");
        let text = format!(
            "MATCH (n:{} {{{}: $match_value}}) SET {} RETURN n",
            selector.label().as_str(),
            selector.key(),
            assignments
        );

        let mut q = with_param(query(&text), "match_value", selector.value());
        for (key, value) in &changes {
            q = with_param(q, &format!("set_{key}"), value);
        }

        let mut stream = self.graph.execute(q).await?;
        match stream.next().await? {
            Some(row) => {
                let node: Node = row
                    .get("n")
                    .map_err(|e| internal_error(format!("returned node: {e}")))?;
                Ok(Some(read_node(&node, selector.label())))
            }
            None => Ok(None),
        }
    }

    async fn delete_node(&self, selector: &NodeSelector) -> StorageResult<bool> {
        let text = format!(
            "MATCH (n:{} {{{}: $value}}) DETACH DELETE n RETURN count(*) AS removed",
            selector.label().as_str(),
            selector.key()
        );
        let q = with_param(query(&text), "value", selector.value());
        Ok(self.read_count(q, "removed").await? > 0)
    }

    async fn merge_edge(&self, edge: GraphEdge) -> StorageResult<Option<GraphEdge>> {
        let text = format!(
            "MATCH (a:{} {{{}: $from_value}}), (b:{} {{{}: $to_value}}) \
             MERGE (a)-[r:{}]->(b) RETURN count(r) AS merged",
            edge.from.label().as_str(),
            edge.from.key(),
            edge.to.label().as_str(),
            edge.to.key(),
            edge.rel.as_str(),
        );
        let q = with_param(
            with_param(query(&text), "from_value", edge.from.value()),
            "to_value",
            edge.to.value(),
        );

        // A missing endpoint makes the MATCH yield nothing, so nothing merges
        let merged = self.read_count(q, "merged").await? > 0;
        Ok(merged.then_some(edge))
    }

    async fn delete_edge(
        &self,
        rel: RelationType,
        from: &NodeSelector,
        to: &NodeSelector,
    ) -> StorageResult<bool> {
        let text = format!(
            "MATCH (a:{} {{{}: $from_value}})-[r:{}]->(b:{} {{{}: $to_value}}) \
             DELETE r RETURN count(*) AS removed",
            from.label().as_str(),
            from.key(),
            rel.as_str(),
            to.label().as_str(),
            to.key(),
        );
        let q = with_param(
            with_param(query(&text), "from_value", from.value()),
            "to_value",
            to.value(),
        );
        Ok(self.read_count(q, "removed").await? > 0)
    }

    async fn source_nodes(
        &self,
        rel: RelationType,
        to: &NodeSelector,
    ) -> StorageResult<Vec<GraphNode>> {
        let text = format!(
            "MATCH (src)-[:{}]->(t:{} {{{}: $value}}) RETURN src",
            rel.as_str(),
            to.label().as_str(),
            to.key(),
        );
        let q = with_param(query(&text), "value", to.value());

        let mut stream = self.graph.execute(q).await?;
        let mut results = Vec::new();
        while let Some(row) = stream.next().await? {
            let node: Node = row
                .get("src")
                .map_err(|e| internal_error(format!("returned node: {e}")))?;
            // Nodes with no recognized label are not part of the mirror
            let Some(label) = node_label(&node) else {
                continue;
            };
            results.push(read_node(&node, label));
        }
        Ok(results)
    }

    async fn count_nodes(&self, label: NodeLabel) -> StorageResult<u64> {
        let text = format!("MATCH (n:{}) RETURN count(n) AS total", label.as_str());
        Ok(self.read_count(query(&text), "total").await?.max(0) as u64)
    }

    async fn count_edges(&self, rel: RelationType) -> StorageResult<u64> {
        let text = format!("MATCH ()-[r:{}]->() RETURN count(r) AS total", rel.as_str());
        Ok(self.read_count(query(&text), "total").await?.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Query construction is pure; connectivity is covered by the
    // integration environment, not unit tests.

    #[test]
    fn test_param_binding_covers_all_scalar_shapes() {
        let q = query("RETURN $a, $b, $c, $d");
        let q = with_param(q, "a", &PropertyValue::Text("x".to_string()));
        let q = with_param(q, "b", &PropertyValue::Integer(1));
        let q = with_param(q, "c", &PropertyValue::Float(1.5));
        let _ = with_param(q, "d", &PropertyValue::Boolean(true));
    }
}
