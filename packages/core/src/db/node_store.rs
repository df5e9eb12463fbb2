//! NodeRepository Trait - Storage Abstraction for the Tree Engine
//!
//! This module defines the `NodeRepository` trait the tree index engine drives.
//! The engine never builds SQL or touches a connection; it describes reads,
//! column arithmetic and deletes with the types in [`crate::db::query`] and a
//! repository executes them.
//!
//! # Architecture
//!
//! - **One table per tree type**: a repository models exactly one table
//! - **Multiple Backends**: `MemoryStore` (in-process) and `LibsqlStore` (SQLite)
//! - **Exclusive sections**: structural mutations hold [`ExclusiveSection`]
//!   from acquire to release
//!
//! # Examples
//!
//! ```rust
//! use nestedset_core::db::{Column, Filter, MemoryStore, NodeRepository};
//! use nestedset_core::models::TreeNode;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), nestedset_core::db::DatabaseError> {
//! let store = MemoryStore::new();
//! let root = store
//!     .persist(TreeNode {
//!         left: 1,
//!         right: 2,
//!         level: 1,
//!         scope: 1,
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! let found = store.find_one(&Filter::new().eq(Column::Left, 1)).await?;
//! assert_eq!(found.map(|n| n.id), Some(root.id));
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use crate::db::lock::ExclusiveSection;
use crate::db::query::{Assignment, Column, Filter, Query};
use crate::models::{NodeId, TreeNode};
use async_trait::async_trait;

/// Persistence operations required by the tree index engine
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one repository can be shared by
/// concurrent callers behind an `Arc`.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// Name of the table this repository models
    fn table(&self) -> &str;

    /// First row matching `filter`, if any
    async fn find_one(&self, filter: &Filter) -> Result<Option<TreeNode>, DatabaseError>;

    /// Every row matching the query, ordered and limited as requested
    async fn find_all(&self, query: &Query) -> Result<Vec<TreeNode>, DatabaseError>;

    /// Number of rows matching `filter`
    async fn count(&self, filter: &Filter) -> Result<u64, DatabaseError>;

    /// Apply every assignment to each row matching `filter`; returns rows touched
    ///
    /// The filter is evaluated against rows as they were before the update.
    async fn bulk_update(
        &self,
        assignments: &[Assignment],
        filter: &Filter,
    ) -> Result<u64, DatabaseError>;

    /// Delete every row matching `filter`; returns rows removed
    async fn bulk_delete(&self, filter: &Filter) -> Result<u64, DatabaseError>;

    /// Wait for exclusive access to the named tables
    async fn acquire_exclusive(&self, tables: &[&str]) -> Result<ExclusiveSection, DatabaseError>;

    /// End an exclusive section
    async fn release_exclusive(&self, section: ExclusiveSection) -> Result<(), DatabaseError> {
        drop(section);
        Ok(())
    }

    /// Insert a node without an id, or overwrite the row of a node with one
    ///
    /// Returns the stored node, including its assigned id.
    async fn persist(&self, node: TreeNode) -> Result<TreeNode, DatabaseError>;

    /// Fetch one row by id
    async fn get(&self, id: NodeId) -> Result<Option<TreeNode>, DatabaseError> {
        self.find_one(&Filter::new().eq(Column::Id, id)).await
    }
}
