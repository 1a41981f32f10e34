//! Path trie over mount paths.
//!
//! The trie is rebuilt from the mount table whenever a mount is registered
//! or unregistered, and is read-only during resolution. Lookup cost is
//! O(path depth): one child-map probe per segment.

use std::collections::BTreeMap;
use std::sync::Arc;

use canopy_types::path;

use crate::registry::MountEntry;

/// One path segment in the trie.
///
/// A node with children but no mount is an intermediate node: no provider
/// owns it, but it keeps the tree continuous and drives synthetic fallback.
#[derive(Default)]
pub struct TreeNode {
    children: BTreeMap<String, TreeNode>,
    mount: Option<Arc<MountEntry>>,
}

impl TreeNode {
    /// The mount registered exactly at this node's path, if any.
    pub fn mount(&self) -> Option<&Arc<MountEntry>> {
        self.mount.as_ref()
    }

    /// Child nodes keyed by segment name, in segment order.
    pub fn children(&self) -> &BTreeMap<String, TreeNode> {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Trie index over mount paths.
pub struct PathTree {
    root: TreeNode,
}

impl PathTree {
    /// Build a trie from the mount table.
    ///
    /// The table guarantees at most one entry per exact path, so no node
    /// ever carries more than one mount.
    pub(crate) fn build(entries: &[Arc<MountEntry>]) -> Self {
        let mut root = TreeNode::default();
        for entry in entries {
            let mut node = &mut root;
            for segment in path::segments(&entry.path) {
                node = node.children.entry(segment.to_string()).or_default();
            }
            node.mount = Some(Arc::clone(entry));
        }
        Self { root }
    }

    /// The mount with the longest path prefix of `path`, or `None` if no
    /// mount is an ancestor of (or equal to) `path`.
    pub fn best_match(&self, path: &str) -> Option<&Arc<MountEntry>> {
        let mut node = &self.root;
        let mut best = node.mount.as_ref();
        for segment in path::segments(path) {
            match node.children.get(segment) {
                Some(child) => {
                    node = child;
                    if child.mount.is_some() {
                        best = child.mount.as_ref();
                    }
                }
                None => break,
            }
        }
        best
    }

    /// The trie node at exactly `path`, if the path was ever traversed by a
    /// mount registration.
    pub fn node_at(&self, path: &str) -> Option<&TreeNode> {
        let mut node = &self.root;
        for segment in path::segments(path) {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// True if `path` is a mount path or an intermediate segment of one.
    ///
    /// The root node always exists, so `is_known_path("/")` is true even
    /// with no mounts registered at all; resolving `/` on an empty
    /// federation therefore yields a synthetic root. This is a fixed
    /// convention, not a fallback.
    pub fn is_known_path(&self, path: &str) -> bool {
        self.node_at(path).is_some()
    }
}
