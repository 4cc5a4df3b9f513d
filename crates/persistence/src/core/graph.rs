//! Graph mirror trait and property model.
//!
//! The mirror holds a derived projection of the primary store: one node
//! per entity plus explicit relationship edges. It is never authoritative
//! for attribute values; relationship queries traverse it and then
//! resolve identifiers back through the primary store.
//!
//! Labels and relationship types are fixed enumerations, and property
//! keys are checked against a per-label whitelist before they can reach
//! query text. Backends never interpolate caller-supplied strings.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dossier_records::RecordId;

use crate::error::{MirrorError, StorageResult};

/// Node labels known to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeLabel {
    /// Projection of a patient record.
    Patient,
    /// Projection of a physician record.
    Medecin,
    /// Projection of a consultation record.
    Consultation,
    /// Projection of a login principal.
    Principal,
}

impl NodeLabel {
    /// The label as written into queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Patient => "Patient",
            NodeLabel::Medecin => "Medecin",
            NodeLabel::Consultation => "Consultation",
            NodeLabel::Principal => "Principal",
        }
    }

    /// Parses a label read back from a backend row.
    pub fn parse(label: &str) -> Option<NodeLabel> {
        match label {
            "Patient" => Some(NodeLabel::Patient),
            "Medecin" => Some(NodeLabel::Medecin),
            "Consultation" => Some(NodeLabel::Consultation),
            "Principal" => Some(NodeLabel::Principal),
            _ => None,
        }
    }

    /// The property keys a node with this label may carry.
    ///
    /// This is the mirror whitelist: credential fields and anything else
    /// outside this list never become node properties.
    pub fn allowed_keys(&self) -> &'static [&'static str] {
        match self {
            NodeLabel::Patient => &["id", "family_name", "given_name", "birth_date"],
            NodeLabel::Medecin => &["id", "family_name", "given_name", "specialty"],
            NodeLabel::Consultation => &["id", "occurred_at", "reason"],
            NodeLabel::Principal => &["id", "username", "role"],
        }
    }

    /// Returns `true` if the key is in this label's whitelist.
    pub fn is_allowed_key(&self, key: &str) -> bool {
        self.allowed_keys().contains(&key)
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship types known to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// Patient → consultation participation.
    Attends,
    /// Consultation → physician ownership.
    AssignedTo,
    /// Patient → physician standing assignment.
    HasTreatingPhysician,
    /// Principal → linked entity credential link.
    LinkedTo,
}

impl RelationType {
    /// The relationship type as written into queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Attends => "ATTENDS",
            RelationType::AssignedTo => "ASSIGNED_TO",
            RelationType::HasTreatingPhysician => "HAS_TREATING_PHYSICIAN",
            RelationType::LinkedTo => "LINKED_TO",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar property value.
///
/// The mirror only ever stores scalars; nested structures stay in the
/// primary store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A string value.
    Text(String),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit float.
    Float(f64),
    /// A boolean.
    Boolean(bool),
}

impl PropertyValue {
    /// Converts a JSON scalar. Nulls, arrays and objects yield `None`.
    pub fn from_json(value: &Value) -> Option<PropertyValue> {
        match value {
            Value::String(s) => Some(PropertyValue::Text(s.clone())),
            Value::Bool(b) => Some(PropertyValue::Boolean(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(PropertyValue::Integer(i))
                } else {
                    n.as_f64().map(PropertyValue::Float)
                }
            }
            _ => None,
        }
    }

    /// The string content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

/// String-keyed scalar properties, ordered for stable query text.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Checks every key in `properties` against the label's whitelist.
pub fn validate_properties(label: NodeLabel, properties: &PropertyMap) -> Result<(), MirrorError> {
    for key in properties.keys() {
        if !label.is_allowed_key(key) {
            return Err(MirrorError::UnknownPropertyKey {
                label,
                key: key.clone(),
            });
        }
    }
    Ok(())
}

/// A node match expressed as label + one property equality.
///
/// The key is resolved against the label's whitelist at construction, so
/// a selector can only ever name a known property.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSelector {
    label: NodeLabel,
    key: &'static str,
    value: PropertyValue,
}

impl NodeSelector {
    /// Builds a selector, rejecting keys outside the label's whitelist.
    pub fn new(
        label: NodeLabel,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<Self, MirrorError> {
        let key = label
            .allowed_keys()
            .iter()
            .copied()
            .find(|allowed| *allowed == key)
            .ok_or_else(|| MirrorError::UnknownPropertyKey {
                label,
                key: key.to_string(),
            })?;
        Ok(NodeSelector {
            label,
            key,
            value: value.into(),
        })
    }

    /// A selector matching the node mirroring the given record.
    pub fn by_id(label: NodeLabel, id: &RecordId) -> Self {
        NodeSelector {
            label,
            key: "id",
            value: PropertyValue::Text(id.as_str().to_string()),
        }
    }

    /// The node label.
    pub fn label(&self) -> NodeLabel {
        self.label
    }

    /// The matched property key, guaranteed whitelisted.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// The matched property value.
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }
}

impl fmt::Display for NodeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}={:?}]", self.label, self.key, self.value)
    }
}

/// A mirror node: a label plus whitelisted scalar properties.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    label: NodeLabel,
    properties: PropertyMap,
}

impl GraphNode {
    /// Builds a node for writing. Every property key must be in the
    /// label's whitelist.
    pub fn new(label: NodeLabel, properties: PropertyMap) -> Result<Self, MirrorError> {
        validate_properties(label, &properties)?;
        Ok(GraphNode { label, properties })
    }

    /// Wraps properties read back from a backend, dropping any key the
    /// label does not recognize.
    pub fn from_stored(label: NodeLabel, properties: PropertyMap) -> Self {
        let properties = properties
            .into_iter()
            .filter(|(key, _)| label.is_allowed_key(key))
            .collect();
        GraphNode { label, properties }
    }

    /// The node label.
    pub fn label(&self) -> NodeLabel {
        self.label
    }

    /// The node properties.
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// The mirrored record identifier, when present.
    pub fn id(&self) -> Option<&str> {
        self.properties.get("id").and_then(PropertyValue::as_text)
    }
}

/// A directed edge between two node selectors.
///
/// Edges carry no properties of their own; everything attribute-shaped
/// lives on nodes, which keeps edge writes trivially idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// The relationship type.
    pub rel: RelationType,
    /// The source endpoint.
    pub from: NodeSelector,
    /// The target endpoint.
    pub to: NodeSelector,
}

impl GraphEdge {
    /// An edge between two selectors.
    pub fn new(rel: RelationType, from: NodeSelector, to: NodeSelector) -> Self {
        GraphEdge { rel, from, to }
    }
}

/// Storage trait for the graph mirror.
///
/// Implementations project nodes and edges derived from the primary
/// store. All failures surface as [`crate::error::MirrorError`]; the
/// sync layer absorbs them into a secondary status instead of failing
/// the request.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Writes a node.
    ///
    /// When a node with the same label and identifier already exists, its
    /// properties are overwritten in place. Re-applying a projection
    /// therefore never duplicates nodes.
    async fn upsert_node(&self, node: GraphNode) -> StorageResult<GraphNode>;

    /// Finds the node matching the selector.
    async fn find_node(&self, selector: &NodeSelector) -> StorageResult<Option<GraphNode>>;

    /// Merges property changes into the matching node.
    ///
    /// # Returns
    ///
    /// The updated node, or `None` if nothing matched.
    ///
    /// # Errors
    ///
    /// * `MirrorError::UnknownPropertyKey` - If a change key is outside
    ///   the label's whitelist
    async fn update_node(
        &self,
        selector: &NodeSelector,
        changes: PropertyMap,
    ) -> StorageResult<Option<GraphNode>>;

    /// Deletes the matching node together with every incident edge.
    ///
    /// # Returns
    ///
    /// `true` if a node was removed.
    async fn delete_node(&self, selector: &NodeSelector) -> StorageResult<bool>;

    /// Idempotently merges an edge between two existing nodes.
    ///
    /// An already-present `(from, rel, to)` edge is returned unchanged
    /// rather than duplicated.
    ///
    /// # Returns
    ///
    /// The edge, or `None` when either endpoint node does not exist.
    async fn merge_edge(&self, edge: GraphEdge) -> StorageResult<Option<GraphEdge>>;

    /// Deletes the edges of the given type between two nodes.
    ///
    /// # Returns
    ///
    /// `true` if at least one edge was removed.
    async fn delete_edge(
        &self,
        rel: RelationType,
        from: &NodeSelector,
        to: &NodeSelector,
    ) -> StorageResult<bool>;

    /// Source-side nodes of edges with the given type arriving at `to`.
    async fn source_nodes(
        &self,
        rel: RelationType,
        to: &NodeSelector,
    ) -> StorageResult<Vec<GraphNode>>;

    /// Counts the nodes carrying a label.
    async fn count_nodes(&self, label: NodeLabel) -> StorageResult<u64>;

    /// Counts the edges of a relationship type.
    async fn count_edges(&self, rel: RelationType) -> StorageResult<u64>;
}

/// Shared handle to a graph store.
pub type DynGraphStore = Arc<dyn GraphStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_and_relation_names() {
        assert_eq!(NodeLabel::Medecin.as_str(), "Medecin");
        assert_eq!(NodeLabel::parse("Consultation"), Some(NodeLabel::Consultation));
        assert_eq!(NodeLabel::parse("Order"), None);
        assert_eq!(RelationType::HasTreatingPhysician.as_str(), "HAS_TREATING_PHYSICIAN");
        assert_eq!(RelationType::AssignedTo.as_str(), "ASSIGNED_TO");
    }

    #[test]
    fn test_credentials_never_whitelisted() {
        for label in [
            NodeLabel::Patient,
            NodeLabel::Medecin,
            NodeLabel::Consultation,
            NodeLabel::Principal,
        ] {
            assert!(!label.is_allowed_key("password"));
            assert!(!label.is_allowed_key("password_hash"));
        }
    }

    #[test]
    fn test_selector_rejects_unknown_key() {
        let err = NodeSelector::new(NodeLabel::Patient, "password_hash", "x").unwrap_err();
        assert!(matches!(err, MirrorError::UnknownPropertyKey { .. }));

        let ok = NodeSelector::new(NodeLabel::Patient, "family_name", "Ba").unwrap();
        assert_eq!(ok.key(), "family_name");
    }

    #[test]
    fn test_node_new_validates_keys() {
        let mut props = PropertyMap::new();
        props.insert("id".to_string(), "m-1".into());
        props.insert("specialty".to_string(), "Cardiology".into());
        let node = GraphNode::new(NodeLabel::Medecin, props.clone()).unwrap();
        assert_eq!(node.id(), Some("m-1"));

        props.insert("password_hash".to_string(), "secret".into());
        assert!(GraphNode::new(NodeLabel::Medecin, props).is_err());
    }

    #[test]
    fn test_from_stored_drops_foreign_keys() {
        let mut props = PropertyMap::new();
        props.insert("id".to_string(), "p-1".into());
        props.insert("legacy_flag".to_string(), true.into());
        let node = GraphNode::from_stored(NodeLabel::Patient, props);
        assert_eq!(node.id(), Some("p-1"));
        assert!(!node.properties().contains_key("legacy_flag"));
    }

    #[test]
    fn test_property_value_from_json_scalars_only() {
        assert_eq!(
            PropertyValue::from_json(&json!("checkup")),
            Some(PropertyValue::Text("checkup".to_string()))
        );
        assert_eq!(PropertyValue::from_json(&json!(7)), Some(PropertyValue::Integer(7)));
        assert_eq!(PropertyValue::from_json(&json!(1.5)), Some(PropertyValue::Float(1.5)));
        assert_eq!(PropertyValue::from_json(&json!(true)), Some(PropertyValue::Boolean(true)));
        assert_eq!(PropertyValue::from_json(&json!(null)), None);
        assert_eq!(PropertyValue::from_json(&json!({"nested": 1})), None);
        assert_eq!(PropertyValue::from_json(&json!([1, 2])), None);
    }

    #[test]
    fn test_property_value_untagged_serde() {
        let value: PropertyValue = serde_json::from_value(json!("Diallo")).unwrap();
        assert_eq!(value, PropertyValue::Text("Diallo".to_string()));
        let value: PropertyValue = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(value, PropertyValue::Integer(42));
        assert_eq!(serde_json::to_value(PropertyValue::Boolean(false)).unwrap(), json!(false));
    }
}
