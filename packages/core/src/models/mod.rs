//! Data Models
//!
//! This module contains the data structures shared by every layer:
//!
//! - `TreeNode` - One row of a nested-set table (interval, level, scope, payload)
//! - `NodeRef` - Identifier-or-node argument resolved once per operation
//! - `ValidationError` - Reasons a node is refused at persistence time

mod node;

pub use node::{NodeId, NodeRef, TreeNode, ValidationError};
