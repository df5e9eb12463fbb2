//! Relation Query Translator
//!
//! Turns a structural relation of a loaded node (ancestors, descendants,
//! siblings, leaves, roots) into interval/level/scope predicates. Translation
//! is pure; execution happens when a [`Relation`] is consumed.
//!
//! # Query Pattern Examples
//!
//! For a node at `[4, 9]`, level 2, scope 1:
//!
//! - Ancestors: `left < 4 AND right > 9 AND scope = 1`
//! - Descendants: `left > 4 AND right < 9 AND scope = 1`
//! - Children: descendants `AND level = 3`
//! - Leaves: descendants `AND right = left + 1`

use crate::db::{Column, Filter, FilterOperator, NodeRepository, Predicate, Query, SortDirection};
use crate::models::TreeNode;
use crate::operations::error::TreeResult;
use std::sync::Arc;

/// Options for [`parents`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentsOptions {
    /// Keep the scope's root in the chain (default: true)
    pub include_root: bool,
    /// Put the node itself at the end of the chain (default: false)
    pub include_self: bool,
    pub direction: SortDirection,
    /// Only the direct parent, at most one row (default: false)
    pub direct_only: bool,
}

impl Default for ParentsOptions {
    fn default() -> Self {
        Self {
            include_root: true,
            include_self: false,
            direction: SortDirection::Ascending,
            direct_only: false,
        }
    }
}

/// Options for [`descendants`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescendantsOptions {
    pub include_self: bool,
    pub direction: SortDirection,
    /// Only one level down (plus the node itself when `include_self`)
    pub direct_only: bool,
    pub leaves_only: bool,
    pub limit: Option<usize>,
}

/// Every ancestor of `node`, ordered by left
pub fn parents(node: &TreeNode, options: ParentsOptions) -> Query {
    let (left_op, right_op) = if options.include_self {
        (
            FilterOperator::LessThanOrEqual,
            FilterOperator::GreaterThanOrEqual,
        )
    } else {
        (FilterOperator::LessThan, FilterOperator::GreaterThan)
    };

    let mut filter = Filter::new()
        .compare(Column::Left, left_op, node.left)
        .compare(Column::Right, right_op, node.right)
        .eq(Column::Scope, node.scope);

    if !options.include_root {
        filter = filter.ne(Column::Left, 1);
    }

    if options.direct_only {
        Query::new(filter.eq(Column::Level, node.level - 1))
            .order_by(Column::Left, options.direction)
            .limit(1)
    } else {
        Query::new(filter).order_by(Column::Left, options.direction)
    }
}

/// Every node inside `node`'s interval, ordered by left
pub fn descendants(node: &TreeNode, options: DescendantsOptions) -> Query {
    let (left_op, right_op) = if options.include_self {
        (
            FilterOperator::GreaterThanOrEqual,
            FilterOperator::LessThanOrEqual,
        )
    } else {
        (FilterOperator::GreaterThan, FilterOperator::LessThan)
    };

    let mut filter = Filter::new()
        .compare(Column::Left, left_op, node.left)
        .compare(Column::Right, right_op, node.right)
        .eq(Column::Scope, node.scope);

    if options.direct_only {
        filter = if options.include_self {
            filter.and(Predicate::AnyOf {
                predicates: vec![
                    level_is(node.level),
                    level_is(node.level + 1),
                ],
            })
        } else {
            filter.eq(Column::Level, node.level + 1)
        };
    }

    if options.leaves_only {
        filter = filter.and(Predicate::Leaf);
    }

    let mut query = Query::new(filter).order_by(Column::Left, options.direction);
    query.limit = options.limit;
    query
}

/// Direct children of `node`
pub fn children(
    node: &TreeNode,
    include_self: bool,
    direction: SortDirection,
    limit: Option<usize>,
) -> Query {
    descendants(
        node,
        DescendantsOptions {
            include_self,
            direction,
            direct_only: true,
            leaves_only: false,
            limit,
        },
    )
}

/// Leaf descendants of `node`
pub fn leaves(node: &TreeNode, include_self: bool, direction: SortDirection) -> Query {
    descendants(
        node,
        DescendantsOptions {
            include_self,
            direction,
            direct_only: false,
            leaves_only: true,
            limit: None,
        },
    )
}

/// Nodes sharing `node`'s parent; `None` for a root, which has no siblings
pub fn siblings(
    node: &TreeNode,
    parent: &TreeNode,
    include_self: bool,
    direction: SortDirection,
) -> Option<Query> {
    if node.is_root() {
        return None;
    }

    let mut filter = Filter::new()
        .gt(Column::Left, parent.left)
        .lt(Column::Right, parent.right)
        .eq(Column::Scope, node.scope)
        .eq(Column::Level, node.level);

    if !include_self {
        if let Some(id) = node.id {
            filter = filter.ne(Column::Id, id);
        }
    }

    Some(Query::new(filter).order_by(Column::Left, direction))
}

/// The root of `scope`
pub fn root(scope: i64) -> Query {
    Query::new(Filter::new().eq(Column::Left, 1).eq(Column::Scope, scope)).limit(1)
}

/// Every root across all scopes, ordered by scope
pub fn roots() -> Query {
    Query::new(Filter::new().eq(Column::Left, 1)).order_by(Column::Scope, SortDirection::Ascending)
}

/// Every node, optionally restricted to one scope, ordered by scope then left
pub fn fulltree(scope: Option<i64>) -> Query {
    let filter = match scope {
        Some(scope) => Filter::new().eq(Column::Scope, scope),
        None => Filter::new(),
    };
    Query::new(filter)
        .order_by(Column::Scope, SortDirection::Ascending)
        .order_by(Column::Left, SortDirection::Ascending)
}

fn level_is(level: i64) -> Predicate {
    Predicate::Compare {
        column: Column::Level,
        operator: FilterOperator::Equals,
        value: level,
    }
}

/// A translated relation, executed only when consumed
///
/// Each consumption runs the query again, so a relation can be iterated any
/// number of times and always reflects the current rows.
#[derive(Clone)]
pub struct Relation {
    repo: Arc<dyn NodeRepository>,
    query: Option<Query>,
}

impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("table", &self.repo.table())
            .field("query", &self.query)
            .finish()
    }
}

impl Relation {
    pub fn new(repo: Arc<dyn NodeRepository>, query: Query) -> Self {
        Self {
            repo,
            query: Some(query),
        }
    }

    /// A relation that always yields nothing
    pub fn empty(repo: Arc<dyn NodeRepository>) -> Self {
        Self { repo, query: None }
    }

    /// The translated query (`None` for an empty relation)
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    pub async fn all(&self) -> TreeResult<Vec<TreeNode>> {
        match &self.query {
            Some(query) => Ok(self.repo.find_all(query).await?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn first(&self) -> TreeResult<Option<TreeNode>> {
        match &self.query {
            Some(query) => {
                let single = query.clone().limit(1);
                Ok(self.repo.find_all(&single).await?.into_iter().next())
            }
            None => Ok(None),
        }
    }

    pub async fn count(&self) -> TreeResult<u64> {
        match &self.query {
            Some(query) => {
                let total = self.repo.count(&query.filter).await?;
                Ok(match query.limit {
                    Some(limit) => total.min(limit as u64),
                    None => total,
                })
            }
            None => Ok(0),
        }
    }

    /// Identifiers of every node in the relation, in order
    pub async fn ids(&self) -> TreeResult<Vec<i64>> {
        Ok(self.all().await?.into_iter().filter_map(|n| n.id).collect())
    }
}
