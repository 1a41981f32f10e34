//! Resources: the nodes of the federated tree.

use serde::{Deserialize, Serialize};

use crate::path;

/// Property bag attached to a resource.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// One row of a structured query result.
pub type QueryRow = serde_json::Map<String, serde_json::Value>;

/// Property key holding a resource's type.
pub const PROP_TYPE: &str = "type";

/// Property key holding a resource type's super type.
pub const PROP_SUPER_TYPE: &str = "superType";

/// A node in the federated tree.
///
/// A resource is either backed by a provider or *synthetic*: manufactured by
/// the engine to keep the tree walkable where no provider owns an
/// intermediate path. Synthetic resources carry no properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Absolute path of the resource in the federated namespace.
    pub path: String,
    /// Properties reported by the owning provider; empty for synthetic nodes.
    pub properties: Properties,
    /// True if the engine manufactured this node and no provider owns it.
    pub synthetic: bool,
}

impl Resource {
    /// Create a provider-backed resource.
    pub fn new(path: impl Into<String>, properties: Properties) -> Self {
        Self {
            path: path.into(),
            properties,
            synthetic: false,
        }
    }

    /// Create a synthetic placeholder resource.
    pub fn synthetic(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            properties: Properties::new(),
            synthetic: true,
        }
    }

    /// The final segment of the resource path.
    pub fn name(&self) -> &str {
        path::name(&self.path)
    }

    /// The parent path, or `None` for the root.
    pub fn parent_path(&self) -> Option<&str> {
        path::parent(&self.path)
    }

    /// The resource type, from the `"type"` property.
    pub fn resource_type(&self) -> Option<&str> {
        self.properties.get(PROP_TYPE).and_then(|v| v.as_str())
    }

    /// The resource super type, from the `"superType"` property.
    pub fn super_type(&self) -> Option<&str> {
        self.properties.get(PROP_SUPER_TYPE).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_has_no_properties() {
        let r = Resource::synthetic("/a/b");
        assert!(r.synthetic);
        assert!(r.properties.is_empty());
        assert_eq!(r.name(), "b");
        assert_eq!(r.parent_path(), Some("/a"));
    }

    #[test]
    fn test_typed_resource() {
        let mut props = Properties::new();
        props.insert(PROP_TYPE.into(), "app/page".into());
        props.insert(PROP_SUPER_TYPE.into(), "app/base".into());
        let r = Resource::new("/content/page", props);
        assert!(!r.synthetic);
        assert_eq!(r.resource_type(), Some("app/page"));
        assert_eq!(r.super_type(), Some("app/base"));
    }
}
