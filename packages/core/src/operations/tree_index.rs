//! Tree Index Engine
//!
//! `TreeIndex` owns the nested-set numbering of one table. It allocates and
//! reclaims interval space, places new nodes, relocates subtrees (within a
//! scope or across scopes), deletes subtrees and repairs numbering from the
//! `parent_id` graph.
//!
//! # Exclusive Sections
//!
//! Every structural mutation runs inside an exclusive section on the node
//! table. The section handle is threaded explicitly through every internal
//! step; the gap primitives refuse to run without one that covers the table.
//!
//! # Known Race
//!
//! Relocation reads the moving node *before* entering the exclusive section
//! and only re-reads the target under exclusion. A concurrent structural
//! change that lands between the two reads can leave the move working from a
//! stale interval.
//!
//! # Examples
//!
//! ```rust
//! use nestedset_core::db::MemoryStore;
//! use nestedset_core::models::TreeNode;
//! use nestedset_core::operations::TreeIndex;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), nestedset_core::operations::TreeError> {
//! let tree = TreeIndex::new(Arc::new(MemoryStore::new()));
//!
//! let root = tree.make_root(TreeNode::new(json!({"title": "root"})), None).await?;
//! let child = tree
//!     .insert_as_last_child(TreeNode::new(json!({"title": "child"})), &root)
//!     .await?;
//!
//! assert_eq!((child.left, child.right, child.level), (2, 3, 2));
//! assert_eq!(tree.reload(&root).await?.right, 4);
//! # Ok(())
//! # }
//! ```

use crate::behaviors::{AcceptAll, NodeValidator};
use crate::db::{
    Assignment, Column, DatabaseError, ExclusiveSection, Filter, NodeRepository, Query,
    SortDirection,
};
use crate::models::{NodeId, NodeRef, TreeNode, ValidationError};
use crate::operations::error::{TreeError, TreeResult};
use crate::operations::relations::{self, DescendantsOptions, ParentsOptions, Relation};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Where a node lands relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    FirstChild,
    LastChild,
    PrevSibling,
    NextSibling,
}

impl Placement {
    /// Left value the placed node (or subtree) will start at
    pub fn anchor(&self, target: &TreeNode) -> i64 {
        match self {
            Placement::FirstChild => target.left + 1,
            Placement::LastChild => target.right,
            Placement::PrevSibling => target.left,
            Placement::NextSibling => target.right + 1,
        }
    }

    /// Depth of the placed node relative to the target
    pub fn level_offset(&self) -> i64 {
        if self.is_child() {
            1
        } else {
            0
        }
    }

    /// Parent the placed node will have
    pub fn parent_for(&self, target: &TreeNode) -> Option<NodeId> {
        if self.is_child() {
            target.id
        } else {
            target.parent_id
        }
    }

    /// Sibling placements need a parent, so a root cannot anchor them
    pub fn allows_root_target(&self) -> bool {
        self.is_child()
    }

    fn is_child(&self) -> bool {
        matches!(self, Placement::FirstChild | Placement::LastChild)
    }
}

type RebuildFuture<'a> = Pin<Box<dyn Future<Output = TreeResult<i64>> + Send + 'a>>;

/// Nested-set engine over one node repository
#[derive(Clone)]
pub struct TreeIndex {
    repo: Arc<dyn NodeRepository>,
    validator: Arc<dyn NodeValidator>,
}

impl std::fmt::Debug for TreeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeIndex")
            .field("table", &self.repo.table())
            .finish()
    }
}

impl TreeIndex {
    /// Engine that accepts every structurally valid node
    pub fn new(repo: Arc<dyn NodeRepository>) -> Self {
        Self {
            repo,
            validator: Arc::new(AcceptAll),
        }
    }

    /// Run `validator` before every persist
    pub fn with_validator(mut self, validator: impl NodeValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn repository(&self) -> &Arc<dyn NodeRepository> {
        &self.repo
    }

    // ------------------------------------------------------------------
    // Exclusive sections
    // ------------------------------------------------------------------

    /// Enter the exclusive section for this engine's table
    pub async fn exclusive(&self) -> TreeResult<ExclusiveSection> {
        Ok(self.repo.acquire_exclusive(&[self.repo.table()]).await?)
    }

    /// Release `section`, then surface the operation's error ahead of a release error
    async fn finish<T>(&self, section: ExclusiveSection, result: TreeResult<T>) -> TreeResult<T> {
        let released = self.repo.release_exclusive(section).await;
        let value = result?;
        released?;
        Ok(value)
    }

    /// End a section obtained from [`TreeIndex::exclusive`]
    pub async fn release(&self, section: ExclusiveSection) -> TreeResult<()> {
        Ok(self.repo.release_exclusive(section).await?)
    }

    fn ensure_covered(&self, section: &ExclusiveSection) -> TreeResult<()> {
        if section.covers(self.repo.table()) {
            Ok(())
        } else {
            Err(TreeError::invalid_operation(format!(
                "exclusive section does not cover table '{}'",
                self.repo.table()
            )))
        }
    }

    // ------------------------------------------------------------------
    // Loading and persisting
    // ------------------------------------------------------------------

    /// Turn a reference into a node; loaded nodes are taken as given
    async fn resolve(&self, node: NodeRef) -> TreeResult<TreeNode> {
        match node {
            NodeRef::Id(id) => self.load(id).await,
            NodeRef::Node(node) => Ok(node),
        }
    }

    /// Turn a reference into the latest stored row
    async fn fetch(&self, node: NodeRef) -> TreeResult<TreeNode> {
        match node.id() {
            Some(id) => self.load(id).await,
            None => Err(TreeError::invalid_operation(
                "node has not been persisted yet",
            )),
        }
    }

    async fn load(&self, id: NodeId) -> TreeResult<TreeNode> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| TreeError::not_found(id))
    }

    /// Validate and persist one node
    async fn store(&self, node: TreeNode) -> TreeResult<TreeNode> {
        self.check(&node)?;

        match self.repo.persist(node).await {
            Ok(saved) => Ok(saved),
            Err(DatabaseError::RowMissing { id }) => Err(TreeError::not_found(id)),
            Err(DatabaseError::Rejected(reason)) => Err(ValidationError::RuleViolation {
                rule: "store".to_string(),
                reason,
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    fn check(&self, node: &TreeNode) -> TreeResult<()> {
        node.validate()?;
        self.validator.validate(node)?;
        Ok(())
    }

    /// Latest stored row for `node`
    pub async fn reload(&self, node: impl Into<NodeRef>) -> TreeResult<TreeNode> {
        self.fetch(node.into()).await
    }

    /// Persist payload edits, or promote a brand-new unplaced node to a root
    ///
    /// Only the payload of a persisted node is written; its position is read
    /// back from the stored row inside the exclusive section, so a copy loaded
    /// before some other structural change cannot roll that change back.
    pub async fn save(&self, node: TreeNode) -> TreeResult<TreeNode> {
        let Some(id) = node.id else {
            if node.is_positioned() {
                return Err(TreeError::invalid_operation(
                    "new nodes are placed with make_root or insert_as_*",
                ));
            }
            return self.make_root(node, None).await;
        };

        let section = self.exclusive().await?;
        let result = async {
            let stored = self.load(id).await?;
            self.store(TreeNode {
                payload: node.payload,
                ..stored
            })
            .await
        }
        .await;
        self.finish(section, result).await
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    /// One past the highest scope in use, 1 for an empty table
    pub async fn get_next_scope(&self) -> TreeResult<i64> {
        let query = Query::new(Filter::new())
            .order_by(Column::Scope, SortDirection::Descending)
            .limit(1);
        let highest = self.repo.find_all(&query).await?;

        Ok(match highest.first() {
            Some(node) if node.scope > 0 => node.scope + 1,
            _ => 1,
        })
    }

    /// True when no row lives in `scope`
    pub async fn scope_available(&self, scope: i64) -> TreeResult<bool> {
        Ok(self.repo.count(&Filter::new().eq(Column::Scope, scope)).await? == 0)
    }

    // ------------------------------------------------------------------
    // Gap primitives
    // ------------------------------------------------------------------

    /// Shift every bound at or after `start` in `scope` up by `size`
    pub async fn create_space(
        &self,
        section: &ExclusiveSection,
        start: i64,
        size: i64,
        scope: i64,
    ) -> TreeResult<()> {
        self.shift_bounds(section, start, size, scope).await
    }

    /// Shift every bound at or after `start` in `scope` down by `size`
    pub async fn delete_space(
        &self,
        section: &ExclusiveSection,
        start: i64,
        size: i64,
        scope: i64,
    ) -> TreeResult<()> {
        self.shift_bounds(section, start, -size, scope).await
    }

    async fn shift_bounds(
        &self,
        section: &ExclusiveSection,
        start: i64,
        delta: i64,
        scope: i64,
    ) -> TreeResult<()> {
        self.ensure_covered(section)?;

        tracing::debug!(
            "Shifting bounds >= {} by {} in scope {} of '{}'",
            start,
            delta,
            scope,
            self.repo.table()
        );

        self.repo
            .bulk_update(
                &[Assignment::add(Column::Left, delta)],
                &Filter::new().gte(Column::Left, start).eq(Column::Scope, scope),
            )
            .await?;
        self.repo
            .bulk_update(
                &[Assignment::add(Column::Right, delta)],
                &Filter::new().gte(Column::Right, start).eq(Column::Scope, scope),
            )
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Roots
    // ------------------------------------------------------------------

    /// Make `node` the root of a scope
    ///
    /// A new node becomes a single-node tree. An existing node is promoted
    /// together with its subtree, and the space it occupied in its old scope
    /// is closed. Loaded roots are returned unchanged.
    pub async fn make_root(
        &self,
        node: impl Into<NodeRef>,
        scope: Option<i64>,
    ) -> TreeResult<TreeNode> {
        let node = match node.into() {
            NodeRef::Node(node) if !node.is_persisted() => node,
            existing => self.fetch(existing).await?,
        };

        if node.is_persisted() && node.is_root() {
            return Ok(node);
        }

        let section = self.exclusive().await?;
        let result = self.make_root_locked(&section, node, scope).await;
        self.finish(section, result).await
    }

    async fn make_root_locked(
        &self,
        section: &ExclusiveSection,
        node: TreeNode,
        scope: Option<i64>,
    ) -> TreeResult<TreeNode> {
        let scope = match scope {
            None => self.get_next_scope().await?,
            Some(scope) => {
                if !self.scope_available(scope).await? {
                    return Err(TreeError::ScopeUnavailable { scope });
                }
                scope
            }
        };

        if !node.is_persisted() {
            let root = TreeNode {
                parent_id: None,
                left: 1,
                right: 2,
                level: 1,
                scope,
                ..node
            };
            let root = self.store(root).await?;
            tracing::info!("Created root {:?} in scope {}", root.id, scope);
            return Ok(root);
        }

        let old = node;
        let promoted = TreeNode {
            parent_id: None,
            left: 1,
            right: old.size(),
            level: 1,
            scope,
            ..old.clone()
        };
        self.check(&promoted)?;

        self.ensure_covered(section)?;
        self.repo
            .bulk_update(
                &[
                    Assignment::add(Column::Left, -(old.left - 1)),
                    Assignment::add(Column::Right, -(old.left - 1)),
                    Assignment::add(Column::Level, -(old.level - 1)),
                    Assignment::set(Column::Scope, scope),
                ],
                &Filter::new()
                    .gte(Column::Left, old.left + 1)
                    .lte(Column::Right, old.right - 1)
                    .eq(Column::Scope, old.scope),
            )
            .await?;
        self.delete_space(section, old.left, old.size(), old.scope)
            .await?;

        let root = match self.store(promoted).await {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!(
                    "Promotion of node {:?} failed, moving its subtree back to scope {}: {}",
                    old.id,
                    old.scope,
                    e
                );
                self.restore_promoted(section, &old, scope).await?;
                return Err(e);
            }
        };
        tracing::info!(
            "Promoted node {:?} from scope {} to root of scope {}",
            root.id,
            old.scope,
            scope
        );
        Ok(root)
    }

    /// Reverse the descendant shift and gap closing of a promotion whose
    /// final persist was refused
    async fn restore_promoted(
        &self,
        section: &ExclusiveSection,
        old: &TreeNode,
        scope: i64,
    ) -> TreeResult<()> {
        self.create_space(section, old.left, old.size(), old.scope)
            .await?;
        self.repo
            .bulk_update(
                &[
                    Assignment::add(Column::Left, old.left - 1),
                    Assignment::add(Column::Right, old.left - 1),
                    Assignment::add(Column::Level, old.level - 1),
                    Assignment::set(Column::Scope, old.scope),
                ],
                &Filter::new()
                    .gte(Column::Left, 2)
                    .lte(Column::Right, old.size() - 1)
                    .eq(Column::Scope, scope),
            )
            .await?;
        self.repo.persist(old.clone()).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inserts
    // ------------------------------------------------------------------

    pub async fn insert_as_first_child(
        &self,
        node: TreeNode,
        target: impl Into<NodeRef>,
    ) -> TreeResult<TreeNode> {
        self.insert(node, target.into(), Placement::FirstChild).await
    }

    pub async fn insert_as_last_child(
        &self,
        node: TreeNode,
        target: impl Into<NodeRef>,
    ) -> TreeResult<TreeNode> {
        self.insert(node, target.into(), Placement::LastChild).await
    }

    pub async fn insert_as_prev_sibling(
        &self,
        node: TreeNode,
        target: impl Into<NodeRef>,
    ) -> TreeResult<TreeNode> {
        self.insert(node, target.into(), Placement::PrevSibling).await
    }

    pub async fn insert_as_next_sibling(
        &self,
        node: TreeNode,
        target: impl Into<NodeRef>,
    ) -> TreeResult<TreeNode> {
        self.insert(node, target.into(), Placement::NextSibling).await
    }

    /// Place a new node relative to `target`
    ///
    /// Persisted nodes are rejected; use the `move_to_*` family for those.
    pub async fn insert(
        &self,
        node: TreeNode,
        target: NodeRef,
        placement: Placement,
    ) -> TreeResult<TreeNode> {
        if node.is_persisted() {
            return Err(TreeError::invalid_operation(
                "only new nodes can be inserted; move persisted nodes instead",
            ));
        }

        let section = self.exclusive().await?;
        let result = self.insert_locked(&section, node, target, placement).await;
        self.finish(section, result).await
    }

    async fn insert_locked(
        &self,
        section: &ExclusiveSection,
        node: TreeNode,
        target: NodeRef,
        placement: Placement,
    ) -> TreeResult<TreeNode> {
        let target = self.fetch(target).await?;

        if !placement.allows_root_target() && target.is_root() {
            return Err(TreeError::invalid_operation(
                "a root cannot have siblings",
            ));
        }

        let anchor = placement.anchor(&target);
        let placed = TreeNode {
            parent_id: placement.parent_for(&target),
            left: anchor,
            right: anchor + 1,
            level: target.level + placement.level_offset(),
            scope: target.scope,
            ..node
        };

        self.create_space(section, anchor, 2, target.scope).await?;

        match self.store(placed).await {
            Ok(saved) => {
                tracing::info!(
                    "Inserted node {:?} at [{}, {}] in scope {} ({:?} of {:?})",
                    saved.id,
                    saved.left,
                    saved.right,
                    saved.scope,
                    placement,
                    target.id
                );
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!(
                    "Insert at {} in scope {} failed, closing the gap: {}",
                    anchor,
                    target.scope,
                    e
                );
                self.delete_space(section, anchor, 2, target.scope).await?;
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Moves
    // ------------------------------------------------------------------

    pub async fn move_to_first_child(
        &self,
        node: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
    ) -> TreeResult<TreeNode> {
        self.relocate(node.into(), target.into(), Placement::FirstChild)
            .await
    }

    pub async fn move_to_last_child(
        &self,
        node: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
    ) -> TreeResult<TreeNode> {
        self.relocate(node.into(), target.into(), Placement::LastChild)
            .await
    }

    pub async fn move_to_prev_sibling(
        &self,
        node: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
    ) -> TreeResult<TreeNode> {
        self.relocate(node.into(), target.into(), Placement::PrevSibling)
            .await
    }

    pub async fn move_to_next_sibling(
        &self,
        node: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
    ) -> TreeResult<TreeNode> {
        self.relocate(node.into(), target.into(), Placement::NextSibling)
            .await
    }

    /// Move `node` and its subtree relative to `target`, possibly into another scope
    pub async fn relocate(
        &self,
        node: NodeRef,
        target: NodeRef,
        placement: Placement,
    ) -> TreeResult<TreeNode> {
        // Read outside the section; see "Known Race" above.
        let moving = self.fetch(node).await?;

        let section = self.exclusive().await?;
        let result = self
            .relocate_locked(&section, moving, target, placement)
            .await;
        self.finish(section, result).await
    }

    async fn relocate_locked(
        &self,
        section: &ExclusiveSection,
        moving: TreeNode,
        target: NodeRef,
        placement: Placement,
    ) -> TreeResult<TreeNode> {
        let target = self.fetch(target).await?;
        let moving_id = moving.require_id()?;

        if target.id == moving.id {
            return Err(TreeError::invalid_operation(
                "cannot move a node relative to itself",
            ));
        }
        if target.is_descendant(&moving) {
            return Err(TreeError::invalid_operation(
                "cannot move a node into its own subtree",
            ));
        }
        if !placement.allows_root_target() && target.is_root() {
            return Err(TreeError::invalid_operation(
                "a root cannot have siblings",
            ));
        }

        let size = moving.size();
        let anchor = placement.anchor(&target);
        let level_delta = target.level + placement.level_offset() - moving.level;
        let new_parent = placement.parent_for(&target);

        self.check(&TreeNode {
            parent_id: new_parent,
            left: anchor,
            right: anchor + size - 1,
            level: moving.level + level_delta,
            scope: target.scope,
            ..moving.clone()
        })?;

        self.create_space(section, anchor, size, target.scope)
            .await?;

        // Opening the gap may have shifted the subtree itself
        let moving = if target.scope == moving.scope {
            self.load(moving_id).await?
        } else {
            moving
        };

        let offset = anchor - moving.left;
        self.repo
            .bulk_update(
                &[
                    Assignment::add(Column::Left, offset),
                    Assignment::add(Column::Right, offset),
                    Assignment::add(Column::Level, level_delta),
                    Assignment::set(Column::Scope, target.scope),
                ],
                &Filter::new()
                    .gte(Column::Left, moving.left)
                    .lte(Column::Right, moving.right)
                    .eq(Column::Scope, moving.scope),
            )
            .await?;

        self.delete_space(section, moving.left, size, moving.scope)
            .await?;

        let mut moved = self.load(moving_id).await?;
        if moved.parent_id != new_parent {
            moved.parent_id = new_parent;
            moved = self.store(moved).await?;
        }

        tracing::info!(
            "Moved node {} ({} rows) to [{}, {}] in scope {} ({:?} of {:?})",
            moving_id,
            size / 2,
            moved.left,
            moved.right,
            moved.scope,
            placement,
            target.id
        );
        Ok(moved)
    }

    // ------------------------------------------------------------------
    // Deletes
    // ------------------------------------------------------------------

    /// Delete `node` and its whole subtree, returning the number of rows removed
    pub async fn delete(&self, node: impl Into<NodeRef>) -> TreeResult<u64> {
        let node = node.into();
        let section = self.exclusive().await?;
        let result = self.delete_locked(&section, node).await;
        self.finish(section, result).await
    }

    async fn delete_locked(&self, section: &ExclusiveSection, node: NodeRef) -> TreeResult<u64> {
        let node = self.fetch(node).await?;
        self.ensure_covered(section)?;

        let removed = self
            .repo
            .bulk_delete(
                &Filter::new()
                    .gte(Column::Left, node.left)
                    .lte(Column::Right, node.right)
                    .eq(Column::Scope, node.scope),
            )
            .await?;
        self.delete_space(section, node.left, node.size(), node.scope)
            .await?;

        tracing::info!(
            "Deleted subtree of node {:?} ({} rows) from scope {}",
            node.id,
            removed,
            node.scope
        );
        Ok(removed)
    }

    /// Filtered deletes would bypass gap management and are always refused
    pub async fn delete_where(&self, _filter: &Filter) -> TreeResult<u64> {
        Err(TreeError::invalid_operation(
            "deleting by filter is not supported; delete a subtree through its root node",
        ))
    }

    // ------------------------------------------------------------------
    // Repair
    // ------------------------------------------------------------------

    /// Renumber the subtree under `target` from the `parent_id` graph
    ///
    /// Children are visited in their current left order (ties by id), each
    /// node is persisted with its new bounds, level and scope, and the next
    /// free counter after `target`'s right bound is returned. Rows not
    /// reachable from `target` keep their numbering.
    pub async fn rebuild_tree(&self, target: impl Into<NodeRef>, left: i64) -> TreeResult<i64> {
        let target = target.into();
        let section = self.exclusive().await?;
        let result = async {
            let target = self.fetch(target).await?;
            let (level, scope, parent_id) = (target.level, target.scope, target.parent_id);
            let mut visited = HashSet::new();
            self.rebuild_node(&section, target, left, level, scope, parent_id, &mut visited)
                .await
        }
        .await;
        let next = self.finish(section, result).await?;

        tracing::info!("Rebuilt tree numbering, next free bound {}", next);
        Ok(next)
    }

    #[allow(clippy::too_many_arguments)]
    fn rebuild_node<'a>(
        &'a self,
        section: &'a ExclusiveSection,
        node: TreeNode,
        left: i64,
        level: i64,
        scope: i64,
        parent_id: Option<NodeId>,
        visited: &'a mut HashSet<NodeId>,
    ) -> RebuildFuture<'a> {
        Box::pin(async move {
            self.ensure_covered(section)?;
            let id = node.require_id()?;
            if !visited.insert(id) {
                return Err(TreeError::invalid_operation(format!(
                    "parent_id cycle through node {}",
                    id
                )));
            }

            let children = self
                .repo
                .find_all(
                    &Query::new(Filter::new().eq(Column::ParentId, id))
                        .order_by(Column::Left, SortDirection::Ascending)
                        .order_by(Column::Id, SortDirection::Ascending),
                )
                .await?;

            let mut right = left + 1;
            for child in children {
                right = self
                    .rebuild_node(section, child, right, level + 1, scope, Some(id), visited)
                    .await?;
            }

            self.store(TreeNode {
                parent_id,
                left,
                right,
                level,
                scope,
                ..node
            })
            .await?;

            Ok(right + 1)
        })
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    pub async fn is_descendant(
        &self,
        node: impl Into<NodeRef>,
        other: impl Into<NodeRef>,
    ) -> TreeResult<bool> {
        let node = self.resolve(node.into()).await?;
        let other = self.resolve(other.into()).await?;
        Ok(node.is_descendant(&other))
    }

    pub async fn is_child(
        &self,
        node: impl Into<NodeRef>,
        other: impl Into<NodeRef>,
    ) -> TreeResult<bool> {
        let node = self.resolve(node.into()).await?;
        let other = self.resolve(other.into()).await?;
        Ok(node.is_child(&other))
    }

    pub async fn is_parent(
        &self,
        node: impl Into<NodeRef>,
        other: impl Into<NodeRef>,
    ) -> TreeResult<bool> {
        let node = self.resolve(node.into()).await?;
        let other = self.resolve(other.into()).await?;
        Ok(node.is_parent(&other))
    }

    pub async fn is_sibling(
        &self,
        node: impl Into<NodeRef>,
        other: impl Into<NodeRef>,
    ) -> TreeResult<bool> {
        let node = self.resolve(node.into()).await?;
        let other = self.resolve(other.into()).await?;
        Ok(node.is_sibling(&other))
    }

    pub async fn is_root(&self, node: impl Into<NodeRef>) -> TreeResult<bool> {
        Ok(self.resolve(node.into()).await?.is_root())
    }

    pub async fn is_leaf(&self, node: impl Into<NodeRef>) -> TreeResult<bool> {
        Ok(self.resolve(node.into()).await?.is_leaf())
    }

    /// True when `node` is in `target`'s ancestor chain, `target` included
    pub async fn is_in_parents(
        &self,
        node: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
        include_root: bool,
    ) -> TreeResult<bool> {
        let node = self.resolve(node.into()).await?;
        let Some(id) = node.id else {
            return Ok(false);
        };

        let chain = self
            .parents(
                target,
                ParentsOptions {
                    include_root,
                    include_self: true,
                    ..Default::default()
                },
            )
            .await?;
        Ok(chain.ids().await?.contains(&id))
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    fn relation(&self, query: Query) -> Relation {
        tracing::debug!("Translated relation query: {:?}", query);
        Relation::new(self.repo.clone(), query)
    }

    pub async fn parents(
        &self,
        node: impl Into<NodeRef>,
        options: ParentsOptions,
    ) -> TreeResult<Relation> {
        let node = self.resolve(node.into()).await?;
        Ok(self.relation(relations::parents(&node, options)))
    }

    pub async fn descendants(
        &self,
        node: impl Into<NodeRef>,
        options: DescendantsOptions,
    ) -> TreeResult<Relation> {
        let node = self.resolve(node.into()).await?;
        Ok(self.relation(relations::descendants(&node, options)))
    }

    pub async fn children(
        &self,
        node: impl Into<NodeRef>,
        include_self: bool,
        direction: SortDirection,
        limit: Option<usize>,
    ) -> TreeResult<Relation> {
        let node = self.resolve(node.into()).await?;
        Ok(self.relation(relations::children(&node, include_self, direction, limit)))
    }

    pub async fn leaves(
        &self,
        node: impl Into<NodeRef>,
        include_self: bool,
        direction: SortDirection,
    ) -> TreeResult<Relation> {
        let node = self.resolve(node.into()).await?;
        Ok(self.relation(relations::leaves(&node, include_self, direction)))
    }

    /// Nodes sharing `node`'s parent; always empty for a root
    pub async fn siblings(
        &self,
        node: impl Into<NodeRef>,
        include_self: bool,
        direction: SortDirection,
    ) -> TreeResult<Relation> {
        let node = self.resolve(node.into()).await?;
        let parent = match node.parent_id {
            Some(parent_id) if !node.is_root() => self.repo.get(parent_id).await?,
            _ => None,
        };

        let query = parent
            .as_ref()
            .and_then(|parent| relations::siblings(&node, parent, include_self, direction));
        Ok(match query {
            Some(query) => self.relation(query),
            None => Relation::empty(self.repo.clone()),
        })
    }

    /// Root of `scope`, or of `node`'s scope when no scope is given
    pub async fn root(&self, node: impl Into<NodeRef>, scope: Option<i64>) -> TreeResult<Relation> {
        let scope = match scope {
            Some(scope) => scope,
            None => {
                let node = self.resolve(node.into()).await?;
                if !node.is_persisted() {
                    return Err(TreeError::invalid_operation(
                        "root lookup needs a scope or a persisted node",
                    ));
                }
                node.scope
            }
        };
        Ok(self.relation(relations::root(scope)))
    }

    /// Root of `scope`
    pub fn scope_root(&self, scope: i64) -> Relation {
        self.relation(relations::root(scope))
    }

    /// Every root across all scopes
    pub fn roots(&self) -> Relation {
        self.relation(relations::roots())
    }

    /// Every node, optionally restricted to one scope
    pub fn fulltree(&self, scope: Option<i64>) -> Relation {
        self.relation(relations::fulltree(scope))
    }

    /// Direct parent through the cached `parent_id`; `None` for a root
    pub async fn parent(&self, node: impl Into<NodeRef>) -> TreeResult<Option<TreeNode>> {
        let node = self.resolve(node.into()).await?;
        if node.is_root() {
            return Ok(None);
        }
        match node.parent_id {
            Some(parent_id) => Ok(self.repo.get(parent_id).await?),
            None => Ok(None),
        }
    }

    pub async fn first_child(&self, node: impl Into<NodeRef>) -> TreeResult<Option<TreeNode>> {
        self.children(node, false, SortDirection::Ascending, Some(1))
            .await?
            .first()
            .await
    }

    pub async fn last_child(&self, node: impl Into<NodeRef>) -> TreeResult<Option<TreeNode>> {
        self.children(node, false, SortDirection::Descending, Some(1))
            .await?
            .first()
            .await
    }
}
