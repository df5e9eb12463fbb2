//! MemoryStore - In-Process NodeRepository
//!
//! Keeps every row of one tree table in a `BTreeMap` keyed by id. Filters,
//! ordering and column arithmetic are evaluated directly on the rows, with the
//! same NULL semantics the SQL repository gets from SQLite.
//!
//! Used by the test suites, the benchmarks, and callers that want a tree
//! index without a database.

use crate::db::error::DatabaseError;
use crate::db::lock::{ExclusiveSection, TableLocks};
use crate::db::node_store::NodeRepository;
use crate::db::query::{Assignment, Filter, Query};
use crate::models::{NodeId, TreeNode};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Rows {
    next_id: NodeId,
    by_id: BTreeMap<NodeId, TreeNode>,
}

/// In-memory tree table
///
/// Cloning is cheap and every clone sees the same rows and the same locks.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    table: String,
    rows: Arc<RwLock<Rows>>,
    locks: TableLocks,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store for the default `nodes` table
    pub fn new() -> Self {
        Self::with_table("nodes")
    }

    pub fn with_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Arc::new(RwLock::new(Rows::default())),
            locks: TableLocks::new(),
        }
    }

    /// Store rows verbatim, keeping their ids
    ///
    /// Lets tests seed a table with exact numbering, including corrupted
    /// numbering for repair scenarios.
    pub async fn seed(&self, nodes: impl IntoIterator<Item = TreeNode>) -> Result<(), DatabaseError> {
        let mut rows = self.rows.write().await;
        for node in nodes {
            let id = node.require_id().map_err(|e| DatabaseError::Rejected(e.to_string()))?;
            rows.next_id = rows.next_id.max(id);
            rows.by_id.insert(id, node);
        }
        Ok(())
    }

    /// Every row, ordered by id
    pub async fn snapshot(&self) -> Vec<TreeNode> {
        self.rows.read().await.by_id.values().cloned().collect()
    }
}

#[async_trait]
impl NodeRepository for MemoryStore {
    fn table(&self) -> &str {
        &self.table
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<TreeNode>, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(rows.by_id.values().find(|node| filter.matches(node)).cloned())
    }

    async fn find_all(&self, query: &Query) -> Result<Vec<TreeNode>, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(query.apply(rows.by_id.values()))
    }

    async fn count(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(rows.by_id.values().filter(|node| filter.matches(node)).count() as u64)
    }

    async fn bulk_update(
        &self,
        assignments: &[Assignment],
        filter: &Filter,
    ) -> Result<u64, DatabaseError> {
        let mut rows = self.rows.write().await;
        let mut touched = 0;
        for node in rows.by_id.values_mut() {
            if filter.matches(node) {
                for assignment in assignments {
                    assignment.apply(node);
                }
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn bulk_delete(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let mut rows = self.rows.write().await;
        let before = rows.by_id.len();
        rows.by_id.retain(|_, node| !filter.matches(node));
        Ok((before - rows.by_id.len()) as u64)
    }

    async fn acquire_exclusive(&self, tables: &[&str]) -> Result<ExclusiveSection, DatabaseError> {
        Ok(self.locks.acquire(tables).await)
    }

    async fn persist(&self, mut node: TreeNode) -> Result<TreeNode, DatabaseError> {
        let mut rows = self.rows.write().await;
        match node.id {
            Some(id) => {
                let slot = rows
                    .by_id
                    .get_mut(&id)
                    .ok_or_else(|| DatabaseError::row_missing(id))?;
                *slot = node.clone();
            }
            None => {
                rows.next_id += 1;
                let id = rows.next_id;
                node.id = Some(id);
                rows.by_id.insert(id, node.clone());
            }
        }
        Ok(node)
    }
}
