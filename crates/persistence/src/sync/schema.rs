//! Projection rules from primary-store documents to mirror properties.
//!
//! The whitelist lives on [`NodeLabel::allowed_keys`]; everything here
//! derives from it. Fields outside the whitelist, and any non-scalar
//! value, are silently dropped — credentials can never leak into the
//! mirror because no label whitelists them.

use serde_json::Value;

use crate::core::{NodeLabel, PropertyMap, PropertyValue};

/// Projects a full document onto the node properties for a label.
///
/// Every whitelisted key present in the document with a scalar value is
/// taken, including the identifier.
pub fn node_projection(label: NodeLabel, content: &Value) -> PropertyMap {
    let mut properties = PropertyMap::new();
    for key in label.allowed_keys() {
        let Some(value) = content.get(key) else {
            continue;
        };
        if let Some(scalar) = PropertyValue::from_json(value) {
            properties.insert((*key).to_string(), scalar);
        }
    }
    properties
}

/// Filters an update payload down to mirrorable property changes.
///
/// The identifier is never part of an update: it is the cross-store join
/// key and moves for no one.
pub fn filtered_changes(label: NodeLabel, changes: &Value) -> PropertyMap {
    let mut properties = node_projection(label, changes);
    properties.remove("id");
    properties
}
