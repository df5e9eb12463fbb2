//! Error types for the tree index engine
//!
//! This module defines every error a structural operation or navigation call
//! can return. Variants map one-to-one onto what a caller can do about them:
//! fix the node (`ValidationFailure`), fix the call (`InvalidOperation`),
//! re-read (`NotFound`), or pick another scope (`ScopeUnavailable`).
//!
//! # Examples
//!
//! ```rust
//! use nestedset_core::operations::TreeError;
//!
//! let err = TreeError::invalid_operation("cannot move a node into its own subtree");
//! assert!(err.to_string().contains("own subtree"));
//!
//! let err = TreeError::ScopeUnavailable { scope: 3 };
//! assert_eq!(err.to_string(), "Scope 3 is already in use");
//! ```

use crate::db::DatabaseError;
use crate::models::{NodeId, ValidationError};
use thiserror::Error;

/// Errors that can occur during tree operations
#[derive(Error, Debug)]
pub enum TreeError {
    /// The node was refused at persistence time
    ///
    /// Raised by structural checks or by the configured validator. Inserts
    /// close the gap they opened before returning this error.
    #[error("Validation failed: {0}")]
    ValidationFailure(#[from] ValidationError),

    /// The call itself is not allowed
    ///
    /// Inserting an already persisted node, moving a node onto itself or into
    /// its own subtree, adopting a root as a sibling anchor, filtered deletes.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A referenced node does not exist
    #[error("Node {id} does not exist")]
    NotFound { id: NodeId },

    /// An explicit scope already holds rows
    #[error("Scope {scope} is already in use")]
    ScopeUnavailable { scope: i64 },

    /// The repository failed
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl TreeError {
    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(id: NodeId) -> Self {
        Self::NotFound { id }
    }
}

/// Result alias used throughout the engine
pub type TreeResult<T> = Result<T, TreeError>;
