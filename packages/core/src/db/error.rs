//! Database Error Types
//!
//! This module defines error types for repository operations, providing
//! clear error handling for connection, initialization, and query failures.

use crate::models::NodeId;
use std::path::PathBuf;
use thiserror::Error;

/// Repository operation errors
///
/// Covers connection, schema initialization and row-level failures of a
/// `NodeRepository`. Structural rule violations are reported by the engine's
/// own error type.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A row could not be decoded into a node
    #[error("Failed to decode row: {0}")]
    RowDecode(String),

    /// An update targeted a row that does not exist
    #[error("Row {id} does not exist")]
    RowMissing { id: NodeId },

    /// The store refused the row (constraint violation)
    #[error("Row rejected by store: {0}")]
    Rejected(String),

    /// Table or column configuration is unusable
    #[error("Invalid tree configuration: {0}")]
    InvalidConfig(String),
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create a row decoding error
    pub fn row_decode(msg: impl Into<String>) -> Self {
        Self::RowDecode(msg.into())
    }

    /// Create a missing row error
    pub fn row_missing(id: NodeId) -> Self {
        Self::RowMissing { id }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
