//! LibsqlStore - NodeRepository Implementation for libsql/SQLite
//!
//! This module implements the `NodeRepository` trait on top of an embedded
//! libsql database, rendering the engine's filters and assignments into SQL.
//!
//! # Schema
//!
//! One table per tree type, named by [`TreeConfig`]:
//!
//! ```sql
//! CREATE TABLE nodes (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     parent_id INTEGER NULL,
//!     lft INTEGER NOT NULL,
//!     rgt INTEGER NOT NULL,
//!     lvl INTEGER NOT NULL,
//!     scope INTEGER NOT NULL,
//!     payload TEXT NOT NULL DEFAULT '{}'
//! );
//! CREATE INDEX idx_nodes_scope_left ON nodes(scope, lft);
//! CREATE INDEX idx_nodes_scope_range ON nodes(scope, lft, rgt);
//! ```
//!
//! # Exclusive sections
//!
//! SQLite has no `LOCK TABLES`. A section is held at two levels:
//!
//! - Every handle opened on the same file in one process shares one lock
//!   registry, keyed by the canonical path, so sections queue without
//!   touching SQLite.
//! - While a section is held its connection keeps a `BEGIN IMMEDIATE` write
//!   transaction open, which excludes writers in other processes. It is
//!   committed by `release_exclusive`; a section dropped without release is
//!   rolled back when the next one is acquired.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nestedset_core::config::TreeConfig;
//! use nestedset_core::db::LibsqlStore;
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = LibsqlStore::open(PathBuf::from("./data/tree.db"), TreeConfig::default()).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::TreeConfig;
use crate::db::error::DatabaseError;
use crate::db::lock::{ExclusiveSection, TableLocks};
use crate::db::node_store::NodeRepository;
use crate::db::query::{Assignment, Column, Filter, Predicate, Query, SetOp};
use crate::models::TreeNode;
use async_trait::async_trait;
use libsql::{Builder, Connection, Row, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// Locks shared by every handle on one database file in this process
fn shared_locks(db_path: &Path) -> TableLocks {
    if db_path.as_os_str() == ":memory:" {
        return TableLocks::new();
    }

    static REGISTRY: OnceLock<Mutex<HashMap<PathBuf, TableLocks>>> = OnceLock::new();
    let key = std::fs::canonicalize(db_path).unwrap_or_else(|_| db_path.to_path_buf());
    let mut registry = match REGISTRY.get_or_init(Default::default).lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    registry.entry(key).or_default().clone()
}

/// SQLite-backed tree table
#[derive(Clone)]
pub struct LibsqlStore {
    conn: Connection,
    config: TreeConfig,
    locks: TableLocks,
    /// Write transaction open on `conn` for a section
    in_transaction: Arc<AtomicBool>,
    db_path: PathBuf,
}

impl std::fmt::Debug for LibsqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibsqlStore")
            .field("table", &self.config.table)
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl LibsqlStore {
    /// Open (or create) a database file and make sure the tree table exists
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - The configuration names an invalid identifier
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn open(db_path: PathBuf, config: TreeConfig) -> Result<Self, DatabaseError> {
        config.validate()?;

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let store = Self {
            conn,
            config,
            locks: shared_locks(&db_path),
            in_transaction: Arc::new(AtomicBool::new(false)),
            db_path,
        };
        store.initialize_schema().await?;

        tracing::info!(
            "Opened tree table '{}' at {}",
            store.config.table,
            store.db_path.display()
        );
        Ok(store)
    }

    /// Private in-memory database, gone when the last clone drops
    pub async fn open_in_memory(config: TreeConfig) -> Result<Self, DatabaseError> {
        Self::open(PathBuf::from(":memory:"), config).await
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(&self, pragma: &str) -> Result<(), DatabaseError> {
        let _ = self.conn.query(pragma, ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.execute_pragma("PRAGMA busy_timeout = 5000").await?;

        let c = &self.config.columns;
        let table = quote(&self.config.table);

        self.conn
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        {id} INTEGER PRIMARY KEY AUTOINCREMENT,
                        {parent} INTEGER NULL,
                        {left} INTEGER NOT NULL,
                        {right} INTEGER NOT NULL,
                        {level} INTEGER NOT NULL,
                        {scope} INTEGER NOT NULL,
                        {payload} TEXT NOT NULL DEFAULT '{{}}'
                    )",
                    table = table,
                    id = quote(&c.id),
                    parent = quote(&c.parent),
                    left = quote(&c.left),
                    right = quote(&c.right),
                    level = quote(&c.level),
                    scope = quote(&c.scope),
                    payload = quote(&c.payload),
                ),
                (),
            )
            .await
            .map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create table '{}': {}",
                    self.config.table, e
                ))
            })?;

        // Root lookup: scope + left
        let root_index = format!("idx_{}_scope_left", self.config.table);
        self.conn
            .execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({}, {})",
                    quote(&root_index),
                    table,
                    quote(&c.scope),
                    quote(&c.left)
                ),
                (),
            )
            .await
            .map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create index '{}': {}",
                    root_index, e
                ))
            })?;

        // Range queries: scope + interval
        let range_index = format!("idx_{}_scope_range", self.config.table);
        self.conn
            .execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({}, {}, {})",
                    quote(&range_index),
                    table,
                    quote(&c.scope),
                    quote(&c.left),
                    quote(&c.right)
                ),
                (),
            )
            .await
            .map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create index '{}': {}",
                    range_index, e
                ))
            })?;

        Ok(())
    }

    fn column_name(&self, column: Column) -> String {
        let c = &self.config.columns;
        quote(match column {
            Column::Id => &c.id,
            Column::ParentId => &c.parent,
            Column::Left => &c.left,
            Column::Right => &c.right,
            Column::Level => &c.level,
            Column::Scope => &c.scope,
        })
    }

    fn select_list(&self) -> String {
        [
            Column::Id,
            Column::ParentId,
            Column::Left,
            Column::Right,
            Column::Level,
            Column::Scope,
        ]
        .iter()
        .map(|column| self.column_name(*column))
        .chain(std::iter::once(quote(&self.config.columns.payload)))
        .collect::<Vec<_>>()
        .join(", ")
    }

    fn render_predicate(&self, predicate: &Predicate, params: &mut Vec<Value>) -> String {
        match predicate {
            Predicate::Compare {
                column,
                operator,
                value,
            } => {
                params.push(Value::Integer(*value));
                format!("{} {} ?", self.column_name(*column), operator.as_sql())
            }
            Predicate::IsNull { column } => format!("{} IS NULL", self.column_name(*column)),
            Predicate::Leaf => format!(
                "{} = {} + 1",
                self.column_name(Column::Right),
                self.column_name(Column::Left)
            ),
            Predicate::AnyOf { predicates } => {
                if predicates.is_empty() {
                    return "0".to_string();
                }
                let parts: Vec<String> = predicates
                    .iter()
                    .map(|p| self.render_predicate(p, params))
                    .collect();
                format!("({})", parts.join(" OR "))
            }
        }
    }

    /// Render a WHERE clause (empty string for an empty filter)
    fn render_filter(&self, filter: &Filter, params: &mut Vec<Value>) -> String {
        if filter.is_empty() {
            return String::new();
        }
        let conditions: Vec<String> = filter
            .predicates()
            .iter()
            .map(|p| self.render_predicate(p, params))
            .collect();
        format!(" WHERE {}", conditions.join(" AND "))
    }

    fn render_query(&self, query: &Query, params: &mut Vec<Value>) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.select_list(),
            quote(&self.config.table)
        );
        sql.push_str(&self.render_filter(&query.filter, params));

        if !query.sorting.is_empty() {
            let clauses: Vec<String> = query
                .sorting
                .iter()
                .map(|s| format!("{} {}", self.column_name(s.column), s.direction.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&clauses.join(", "));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }

    fn render_assignment(&self, assignment: &Assignment, params: &mut Vec<Value>) -> String {
        let column = self.column_name(assignment.column);
        match assignment.op {
            SetOp::Add(delta) => {
                params.push(Value::Integer(delta));
                format!("{} = {} + ?", column, column)
            }
            SetOp::Value(value) => {
                params.push(Value::Integer(value));
                format!("{} = ?", column)
            }
        }
    }

    /// Convert a selected row to a node
    ///
    /// Expected columns (in order): id, parent, left, right, level, scope, payload
    fn row_to_node(row: &Row) -> Result<TreeNode, DatabaseError> {
        let get = |idx: i32, name: &str| -> Result<i64, DatabaseError> {
            row.get::<i64>(idx)
                .map_err(|e| DatabaseError::row_decode(format!("Failed to get {}: {}", name, e)))
        };

        let id = get(0, "id")?;
        let parent_id: Option<i64> = row
            .get(1)
            .map_err(|e| DatabaseError::row_decode(format!("Failed to get parent_id: {}", e)))?;
        let payload_json: String = row
            .get(6)
            .map_err(|e| DatabaseError::row_decode(format!("Failed to get payload: {}", e)))?;
        let payload = serde_json::from_str(&payload_json)
            .map_err(|e| DatabaseError::row_decode(format!("Malformed payload JSON: {}", e)))?;

        Ok(TreeNode {
            id: Some(id),
            parent_id,
            left: get(2, "left")?,
            right: get(3, "right")?,
            level: get(4, "level")?,
            scope: get(5, "scope")?,
            payload,
        })
    }

    async fn fetch(&self, sql: &str, params: Vec<Value>) -> Result<Vec<TreeNode>, DatabaseError> {
        tracing::trace!("{}", sql);
        let mut rows = self
            .conn
            .query(sql, libsql::params_from_iter(params))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Query failed: {}", e)))?;

        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Row fetch failed: {}", e)))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, DatabaseError> {
        tracing::trace!("{}", sql);
        self.conn
            .execute(sql, libsql::params_from_iter(params))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Statement failed: {}", e)))
    }
}

#[async_trait]
impl NodeRepository for LibsqlStore {
    fn table(&self) -> &str {
        &self.config.table
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<TreeNode>, DatabaseError> {
        let query = Query::new(filter.clone()).limit(1);
        Ok(self.find_all(&query).await?.into_iter().next())
    }

    async fn find_all(&self, query: &Query) -> Result<Vec<TreeNode>, DatabaseError> {
        let mut params = Vec::new();
        let sql = self.render_query(query, &mut params);
        self.fetch(&sql, params).await
    }

    async fn count(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let mut params = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            quote(&self.config.table),
            self.render_filter(filter, &mut params)
        );

        let mut rows = self
            .conn
            .query(&sql, libsql::params_from_iter(params))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Count failed: {}", e)))?;
        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Row fetch failed: {}", e)))?
            .ok_or_else(|| DatabaseError::sql_execution("COUNT returned no row"))?;
        let count: i64 = row
            .get(0)
            .map_err(|e| DatabaseError::row_decode(format!("Failed to get count: {}", e)))?;
        Ok(count as u64)
    }

    async fn bulk_update(
        &self,
        assignments: &[Assignment],
        filter: &Filter,
    ) -> Result<u64, DatabaseError> {
        if assignments.is_empty() {
            return Ok(0);
        }

        let mut params = Vec::new();
        let set_clause: Vec<String> = assignments
            .iter()
            .map(|a| self.render_assignment(a, &mut params))
            .collect();
        let sql = format!(
            "UPDATE {} SET {}{}",
            quote(&self.config.table),
            set_clause.join(", "),
            self.render_filter(filter, &mut params)
        );
        self.execute(&sql, params).await
    }

    async fn bulk_delete(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let mut params = Vec::new();
        let sql = format!(
            "DELETE FROM {}{}",
            quote(&self.config.table),
            self.render_filter(filter, &mut params)
        );
        self.execute(&sql, params).await
    }

    async fn acquire_exclusive(&self, tables: &[&str]) -> Result<ExclusiveSection, DatabaseError> {
        let section = self.locks.acquire(tables).await;

        if self.in_transaction.swap(false, Ordering::SeqCst) {
            tracing::warn!(
                "Rolling back write transaction of an unreleased section on {}",
                self.db_path.display()
            );
            self.execute("ROLLBACK", Vec::new()).await?;
        }
        self.execute("BEGIN IMMEDIATE", Vec::new()).await?;
        self.in_transaction.store(true, Ordering::SeqCst);

        Ok(section)
    }

    async fn release_exclusive(&self, section: ExclusiveSection) -> Result<(), DatabaseError> {
        let committed = if self.in_transaction.swap(false, Ordering::SeqCst) {
            match self.execute("COMMIT", Vec::new()).await {
                Ok(_) => Ok(()),
                Err(e) => {
                    tracing::warn!("Commit of exclusive section failed, rolling back: {}", e);
                    let _ = self.execute("ROLLBACK", Vec::new()).await;
                    Err(e)
                }
            }
        } else {
            Ok(())
        };
        drop(section);
        committed
    }

    async fn persist(&self, node: TreeNode) -> Result<TreeNode, DatabaseError> {
        let c = &self.config.columns;
        let payload = serde_json::to_string(&node.payload)
            .map_err(|e| DatabaseError::Rejected(format!("Payload is not serializable: {}", e)))?;
        let parent = node.parent_id.map(Value::Integer).unwrap_or(Value::Null);

        match node.id {
            Some(id) => {
                let sql = format!(
                    "UPDATE {} SET {} = ?, {} = ?, {} = ?, {} = ?, {} = ?, {} = ? WHERE {} = ?",
                    quote(&self.config.table),
                    quote(&c.parent),
                    quote(&c.left),
                    quote(&c.right),
                    quote(&c.level),
                    quote(&c.scope),
                    quote(&c.payload),
                    quote(&c.id),
                );
                let params = vec![
                    parent,
                    Value::Integer(node.left),
                    Value::Integer(node.right),
                    Value::Integer(node.level),
                    Value::Integer(node.scope),
                    Value::Text(payload),
                    Value::Integer(id),
                ];
                if self.execute(&sql, params).await? == 0 {
                    return Err(DatabaseError::row_missing(id));
                }
                Ok(node)
            }
            None => {
                let sql = format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?)",
                    quote(&self.config.table),
                    quote(&c.parent),
                    quote(&c.left),
                    quote(&c.right),
                    quote(&c.level),
                    quote(&c.scope),
                    quote(&c.payload),
                );
                let params = vec![
                    parent,
                    Value::Integer(node.left),
                    Value::Integer(node.right),
                    Value::Integer(node.level),
                    Value::Integer(node.scope),
                    Value::Text(payload),
                ];
                self.execute(&sql, params).await?;

                Ok(TreeNode {
                    id: Some(self.conn.last_insert_rowid()),
                    ..node
                })
            }
        }
    }
}

/// Double-quote an identifier already checked by `TreeConfig::validate`
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::SortDirection;
    use serde_json::json;
    use tempfile::TempDir;

    async fn create_test_store() -> (LibsqlStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("tree.db");
        let store = LibsqlStore::open(db_path, TreeConfig::default())
            .await
            .unwrap();
        (store, temp_dir)
    }

    fn placed(parent_id: Option<i64>, left: i64, right: i64, level: i64) -> TreeNode {
        TreeNode {
            parent_id,
            left,
            right,
            level,
            scope: 1,
            ..TreeNode::new(json!({"label": format!("{}-{}", left, right)}))
        }
    }

    #[tokio::test]
    async fn test_persist_round_trips_payload() {
        let (store, _temp) = create_test_store().await;

        let root = store.persist(placed(None, 1, 4, 1)).await.unwrap();
        let child = store.persist(placed(root.id, 2, 3, 2)).await.unwrap();

        let loaded = store.get(child.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(loaded.parent_id, root.id);
        assert_eq!(loaded.payload["label"], "2-3");
        assert_eq!((loaded.left, loaded.right, loaded.level), (2, 3, 2));
    }

    #[tokio::test]
    async fn test_update_missing_row_fails() {
        let (store, _temp) = create_test_store().await;
        let ghost = TreeNode::positioned(99, None, 1, 2, 1, 1);

        assert!(matches!(
            store.persist(ghost).await,
            Err(DatabaseError::RowMissing { id: 99 })
        ));
    }

    #[tokio::test]
    async fn test_filters_render_like_memory_evaluation() {
        let (store, _temp) = create_test_store().await;
        let root = store.persist(placed(None, 1, 6, 1)).await.unwrap();
        store.persist(placed(root.id, 2, 3, 2)).await.unwrap();
        store.persist(placed(root.id, 4, 5, 2)).await.unwrap();

        let leaves = store
            .find_all(
                &Query::new(Filter::new().eq(Column::Scope, 1).and(Predicate::Leaf))
                    .order_by(Column::Left, SortDirection::Descending),
            )
            .await
            .unwrap();
        assert_eq!(leaves.iter().map(|n| n.left).collect::<Vec<_>>(), vec![4, 2]);

        let roots = store
            .count(&Filter::new().is_null(Column::ParentId))
            .await
            .unwrap();
        assert_eq!(roots, 1);
    }

    #[tokio::test]
    async fn test_bulk_update_reads_pre_update_values() {
        let (store, _temp) = create_test_store().await;
        let root = store.persist(placed(None, 1, 4, 1)).await.unwrap();
        store.persist(placed(root.id, 2, 3, 2)).await.unwrap();

        let touched = store
            .bulk_update(
                &[
                    Assignment::add(Column::Left, 10),
                    Assignment::add(Column::Right, 10),
                    Assignment::set(Column::Scope, 5),
                ],
                &Filter::new().gte(Column::Left, 2).eq(Column::Scope, 1),
            )
            .await
            .unwrap();
        assert_eq!(touched, 1);

        let moved = store
            .find_one(&Filter::new().eq(Column::Scope, 5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!((moved.left, moved.right), (12, 13));
    }

    #[tokio::test]
    async fn test_bulk_delete() {
        let (store, _temp) = create_test_store().await;
        let root = store.persist(placed(None, 1, 4, 1)).await.unwrap();
        store.persist(placed(root.id, 2, 3, 2)).await.unwrap();

        let removed = store
            .bulk_delete(&Filter::new().gte(Column::Left, 1).lte(Column::Right, 4))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_custom_column_names() {
        let temp_dir = TempDir::new().unwrap();
        let config = TreeConfig::from_json(
            r#"{ "table": "menu", "columns": { "left": "l", "right": "r", "level": "depth" } }"#,
        )
        .unwrap();
        let store = LibsqlStore::open(temp_dir.path().join("menu.db"), config)
            .await
            .unwrap();

        let root = store.persist(placed(None, 1, 2, 1)).await.unwrap();
        assert_eq!(store.table(), "menu");
        assert_eq!(store.get(root.id.unwrap()).await.unwrap(), Some(root));
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let result = LibsqlStore::open(
            temp_dir.path().join("bad.db"),
            TreeConfig::for_table("bad name"),
        )
        .await;

        assert!(matches!(result, Err(DatabaseError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("tree.db");

        {
            let store = LibsqlStore::open(db_path.clone(), TreeConfig::default())
                .await
                .unwrap();
            store.persist(placed(None, 1, 2, 1)).await.unwrap();
        }

        let store = LibsqlStore::open(db_path, TreeConfig::default())
            .await
            .unwrap();
        assert_eq!(store.count(&Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_handles_on_one_file_share_sections() {
        let (first, temp) = create_test_store().await;
        let second = LibsqlStore::open(temp.path().join("tree.db"), TreeConfig::default())
            .await
            .unwrap();

        let held = first.acquire_exclusive(&["nodes"]).await.unwrap();
        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            second.acquire_exclusive(&["nodes"]),
        )
        .await;
        assert!(blocked.is_err(), "Second handle entered a held section");

        first.release_exclusive(held).await.unwrap();
        let section = second.acquire_exclusive(&["nodes"]).await.unwrap();
        second.release_exclusive(section).await.unwrap();
    }

    #[tokio::test]
    async fn test_released_section_commits() {
        let (store, _temp) = create_test_store().await;

        let section = store.acquire_exclusive(&["nodes"]).await.unwrap();
        store.persist(placed(None, 1, 2, 1)).await.unwrap();
        store.release_exclusive(section).await.unwrap();

        assert_eq!(store.count(&Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unreleased_section_rolls_back() {
        let (store, _temp) = create_test_store().await;

        let section = store.acquire_exclusive(&["nodes"]).await.unwrap();
        store.persist(placed(None, 1, 2, 1)).await.unwrap();
        drop(section);

        let section = store.acquire_exclusive(&["nodes"]).await.unwrap();
        assert_eq!(store.count(&Filter::new()).await.unwrap(), 0);
        store.release_exclusive(section).await.unwrap();
    }

    #[tokio::test]
    async fn test_statement_errors_carry_context() {
        let (store, _temp) = create_test_store().await;

        let err = store.execute("UPDATE missing_table SET x = 1", Vec::new()).await;
        assert!(matches!(
            err,
            Err(DatabaseError::SqlExecutionError { ref context }) if context.starts_with("Statement failed")
        ));
    }
}
