//! Node Validation Behaviors
//!
//! This module provides the validation callback the engine runs before every
//! persist:
//!
//! - `NodeValidator` trait - Accept or reject a node about to be stored
//! - Built-in validators (`AcceptAll`, `PayloadIsObject`)
//! - `FnValidator` - Adapts a closure into a validator
//! - `ValidatorChain` - Runs several validators, first failure wins
//!
//! Structural checks (`TreeNode::validate`) always run first; validators only
//! see nodes with a well-formed interval.

use crate::models::{TreeNode, ValidationError};
use std::sync::Arc;

/// Caller-supplied persistence rules
pub trait NodeValidator: Send + Sync {
    fn validate(&self, node: &TreeNode) -> Result<(), ValidationError>;
}

/// Accepts every node
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl NodeValidator for AcceptAll {
    fn validate(&self, _node: &TreeNode) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Requires the payload to be a JSON object
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadIsObject;

impl NodeValidator for PayloadIsObject {
    fn validate(&self, node: &TreeNode) -> Result<(), ValidationError> {
        if node.payload.is_object() {
            Ok(())
        } else {
            Err(ValidationError::InvalidPayload(
                "payload must be a JSON object".to_string(),
            ))
        }
    }
}

/// Closure-backed validator
///
/// ```rust
/// use nestedset_core::behaviors::{FnValidator, NodeValidator};
/// use nestedset_core::models::{TreeNode, ValidationError};
/// use serde_json::json;
///
/// let needs_title = FnValidator::new(|node: &TreeNode| {
///     if node.payload.get("title").is_some() {
///         Ok(())
///     } else {
///         Err(ValidationError::MissingField("title".to_string()))
///     }
/// });
///
/// assert!(needs_title.validate(&TreeNode::new(json!({"title": "Docs"}))).is_ok());
/// assert!(needs_title.validate(&TreeNode::new(json!({}))).is_err());
/// ```
pub struct FnValidator<F>(F);

impl<F> FnValidator<F>
where
    F: Fn(&TreeNode) -> Result<(), ValidationError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> NodeValidator for FnValidator<F>
where
    F: Fn(&TreeNode) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, node: &TreeNode) -> Result<(), ValidationError> {
        (self.0)(node)
    }
}

/// Ordered list of validators
#[derive(Clone, Default)]
pub struct ValidatorChain {
    validators: Vec<Arc<dyn NodeValidator>>,
}

impl ValidatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl NodeValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl NodeValidator for ValidatorChain {
    fn validate(&self, node: &TreeNode) -> Result<(), ValidationError> {
        self.validators.iter().try_for_each(|v| v.validate(node))
    }
}
