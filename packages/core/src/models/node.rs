//! Tree Node Data Structures
//!
//! This module defines the `TreeNode` row stored in a nested-set table and the
//! `NodeRef` argument type accepted by every engine operation.
//!
//! # Encoding
//!
//! - **Interval**: `left`/`right` enclose every descendant's interval
//! - **Level**: depth of the node, the root sits at level 1
//! - **Scope**: partitions one table into independent trees
//! - **Parent pointer**: `parent_id` is a cached copy of what the interval implies
//!
//! # Examples
//!
//! ```rust
//! use nestedset_core::models::TreeNode;
//!
//! let root = TreeNode::positioned(1, None, 1, 10, 1, 1);
//! let child = TreeNode::positioned(2, Some(1), 2, 3, 2, 1);
//!
//! assert!(child.is_descendant(&root));
//! assert!(child.is_child(&root));
//! assert!(child.is_leaf());
//! assert_eq!(root.descendant_count(), 4);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier assigned to a row by the backing store
pub type NodeId = i64;

/// Validation errors raised while persisting a node
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid interval [{left}, {right}]")]
    InvalidInterval { left: i64, right: i64 },

    #[error("Invalid level: {0}")]
    InvalidLevel(i64),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),

    #[error("Payload validation failed: {0}")]
    InvalidPayload(String),

    #[error("Rejected by rule '{rule}': {reason}")]
    RuleViolation { rule: String, reason: String },
}

/// One row of a nested-set table.
///
/// # Fields
///
/// - `id`: store-assigned identifier, `None` until the node is persisted
/// - `parent_id`: identifier of the tightly enclosing node (`None` for roots)
/// - `left` / `right`: interval bounds, `0` while the node has no position
/// - `level`: depth, 1 for roots
/// - `scope`: tree partition key
/// - `payload`: caller-owned JSON object, never interpreted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,

    #[serde(default)]
    pub parent_id: Option<NodeId>,

    #[serde(default)]
    pub left: i64,

    #[serde(default)]
    pub right: i64,

    #[serde(default)]
    pub level: i64,

    #[serde(default)]
    pub scope: i64,

    #[serde(default = "empty_payload")]
    pub payload: serde_json::Value,
}

fn empty_payload() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Default for TreeNode {
    fn default() -> Self {
        Self {
            id: None,
            parent_id: None,
            left: 0,
            right: 0,
            level: 0,
            scope: 0,
            payload: empty_payload(),
        }
    }
}

impl TreeNode {
    /// Create an unpersisted, unpositioned node carrying `payload`
    ///
    /// The node receives its interval from whichever engine operation places it.
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            ..Default::default()
        }
    }

    /// Build a node with every structural field set, as loaded from storage
    pub fn positioned(
        id: NodeId,
        parent_id: Option<NodeId>,
        left: i64,
        right: i64,
        level: i64,
        scope: i64,
    ) -> Self {
        Self {
            id: Some(id),
            parent_id,
            left,
            right,
            level,
            scope,
            payload: empty_payload(),
        }
    }

    /// Whether the backing store has assigned an identifier
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Whether the node has been given an interval yet
    pub fn is_positioned(&self) -> bool {
        self.left != 0 || self.right != 0
    }

    /// `right - left + 1`; always even, 2 for a leaf
    pub fn size(&self) -> i64 {
        self.right - self.left + 1
    }

    /// Number of nodes below this one
    pub fn descendant_count(&self) -> i64 {
        (self.size() - 2) / 2
    }

    pub fn has_children(&self) -> bool {
        self.size() > 2
    }

    pub fn is_leaf(&self) -> bool {
        !self.has_children()
    }

    pub fn is_root(&self) -> bool {
        self.left == 1
    }

    /// True when `self` lies strictly inside `other`'s interval in the same scope
    pub fn is_descendant(&self, other: &TreeNode) -> bool {
        self.left > other.left && self.right < other.right && self.scope == other.scope
    }

    /// True when `other` is the direct parent of `self`
    pub fn is_child(&self, other: &TreeNode) -> bool {
        other.id.is_some() && self.parent_id == other.id
    }

    /// True when `self` is the direct parent of `other`
    pub fn is_parent(&self, other: &TreeNode) -> bool {
        other.is_child(self)
    }

    /// True when both nodes share a parent and are distinct.
    ///
    /// Roots have no parent, so a root is never anyone's sibling.
    pub fn is_sibling(&self, other: &TreeNode) -> bool {
        if self.id.is_some() && self.id == other.id {
            return false;
        }
        self.parent_id.is_some() && self.parent_id == other.parent_id
    }

    /// Identifier of a persisted node, `MissingField("id")` otherwise
    pub fn require_id(&self) -> Result<NodeId, ValidationError> {
        self.id
            .ok_or_else(|| ValidationError::MissingField("id".to_string()))
    }

    /// Structural sanity checks applied before every persist
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.left < 1 || self.right <= self.left || (self.right - self.left) % 2 == 0 {
            return Err(ValidationError::InvalidInterval {
                left: self.left,
                right: self.right,
            });
        }

        if self.level < 1 {
            return Err(ValidationError::InvalidLevel(self.level));
        }

        if let (Some(id), Some(parent_id)) = (self.id, self.parent_id) {
            if id == parent_id {
                return Err(ValidationError::InvalidParent(
                    "Node cannot be its own parent".to_string(),
                ));
            }
        }

        if self.level == 1 && self.parent_id.is_some() {
            return Err(ValidationError::InvalidParent(
                "Level 1 nodes cannot have a parent".to_string(),
            ));
        }

        Ok(())
    }
}

/// A node argument: either a bare identifier or an already loaded node.
///
/// Resolved exactly once at the start of each engine operation.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRef {
    Id(NodeId),
    Node(TreeNode),
}

impl NodeRef {
    /// Identifier this reference points at, if known
    pub fn id(&self) -> Option<NodeId> {
        match self {
            NodeRef::Id(id) => Some(*id),
            NodeRef::Node(node) => node.id,
        }
    }
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        NodeRef::Id(id)
    }
}

impl From<TreeNode> for NodeRef {
    fn from(node: TreeNode) -> Self {
        NodeRef::Node(node)
    }
}

impl From<&TreeNode> for NodeRef {
    fn from(node: &TreeNode) -> Self {
        NodeRef::Node(node.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// root [1,10]; D [2,3]; A [4,9]; B [5,8]; C [6,7]
    fn sample() -> (TreeNode, TreeNode, TreeNode, TreeNode, TreeNode) {
        (
            TreeNode::positioned(1, None, 1, 10, 1, 1),
            TreeNode::positioned(2, Some(1), 2, 3, 2, 1),
            TreeNode::positioned(3, Some(1), 4, 9, 2, 1),
            TreeNode::positioned(4, Some(3), 5, 8, 3, 1),
            TreeNode::positioned(5, Some(4), 6, 7, 4, 1),
        )
    }

    #[test]
    fn test_new_node_is_unplaced() {
        let node = TreeNode::new(json!({"title": "draft"}));

        assert!(!node.is_persisted());
        assert!(!node.is_positioned());
        assert_eq!(node.payload["title"], "draft");
    }

    #[test]
    fn test_size_and_counts() {
        let (root, d, a, _, c) = sample();

        assert_eq!(root.size(), 10);
        assert_eq!(root.descendant_count(), 4);
        assert_eq!(a.descendant_count(), 2);
        assert!(d.is_leaf());
        assert!(c.is_leaf());
        assert!(root.has_children());
    }

    #[test]
    fn test_is_descendant() {
        let (root, d, a, b, c) = sample();

        assert!(d.is_descendant(&root));
        assert!(a.is_descendant(&root));
        assert!(b.is_descendant(&root));
        assert!(b.is_descendant(&a));
        assert!(c.is_descendant(&a));
        assert!(!c.is_descendant(&d));
        assert!(!a.is_descendant(&b));
        assert!(!d.is_descendant(&c));
        assert!(!root.is_descendant(&root));
    }

    #[test]
    fn test_is_descendant_requires_same_scope() {
        let (root, _, a, _, _) = sample();
        let mut other_scope = a.clone();
        other_scope.scope = 2;

        assert!(!other_scope.is_descendant(&root));
    }

    #[test]
    fn test_is_child_and_parent() {
        let (root, d, a, b, c) = sample();

        assert!(d.is_child(&root));
        assert!(a.is_child(&root));
        assert!(b.is_child(&a));
        assert!(c.is_child(&b));
        assert!(!b.is_child(&root));
        assert!(!c.is_child(&a));

        assert!(root.is_parent(&d));
        assert!(a.is_parent(&b));
        assert!(!root.is_parent(&b));
        assert!(!d.is_parent(&a));
    }

    #[test]
    fn test_is_child_ignores_unpersisted_targets() {
        let root = TreeNode::new(json!({}));
        let orphan = TreeNode::new(json!({}));

        assert!(!orphan.is_child(&root));
    }

    #[test]
    fn test_is_sibling() {
        let (root, d, a, b, c) = sample();

        assert!(d.is_sibling(&a));
        assert!(a.is_sibling(&d));
        assert!(!b.is_sibling(&c));
        assert!(!a.is_sibling(&a));
        assert!(!root.is_sibling(&root));
    }

    #[test]
    fn test_roots_are_not_siblings() {
        let first = TreeNode::positioned(1, None, 1, 2, 1, 1);
        let second = TreeNode::positioned(2, None, 1, 2, 1, 2);

        assert!(!first.is_sibling(&second));
    }

    #[test]
    fn test_is_root() {
        let (root, d, a, _, _) = sample();

        assert!(root.is_root());
        assert!(!d.is_root());
        assert!(!a.is_root());
    }

    #[test]
    fn test_validate_rejects_bad_intervals() {
        let mut node = TreeNode::positioned(7, None, 3, 3, 1, 1);
        assert!(matches!(
            node.validate(),
            Err(ValidationError::InvalidInterval { .. })
        ));

        node.right = 5;
        assert!(matches!(
            node.validate(),
            Err(ValidationError::InvalidInterval { .. })
        ));

        node.right = 4;
        assert!(node.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_self_parent() {
        let node = TreeNode::positioned(7, Some(7), 2, 3, 2, 1);
        assert!(matches!(
            node.validate(),
            Err(ValidationError::InvalidParent(_))
        ));
    }

    #[test]
    fn test_node_ref_conversions() {
        let (_, _, a, _, _) = sample();

        assert_eq!(NodeRef::from(3).id(), Some(3));
        assert_eq!(NodeRef::from(&a).id(), Some(3));
        assert_eq!(NodeRef::from(TreeNode::new(json!({}))).id(), None);
    }

    #[test]
    fn test_serde_camel_case() {
        let (_, d, _, _, _) = sample();
        let encoded = serde_json::to_value(&d).unwrap();

        assert_eq!(encoded["parentId"], 1);
        let decoded: TreeNode = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, d);
    }
}
