//! Integrity Checker
//!
//! Reads the rows of a tree table and reports every place where the stored
//! numbering disagrees with the nested-set encoding: gaps or duplicates in the
//! bounds of a scope, malformed or crossing intervals, wrong levels, stale
//! `parent_id` values, and scopes without exactly one root.
//!
//! The checker never writes. Repairs go through `TreeIndex::rebuild_tree`.

use crate::db::{Column, DatabaseError, Filter, NodeRepository, Query, SortDirection};
use crate::models::{NodeId, TreeNode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One broken rule in one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TreeViolation {
    /// Bounds of the scope are not exactly `1..=2N`
    Numbering {
        scope: i64,
        missing: Vec<i64>,
        duplicated: Vec<i64>,
    },
    /// `left >= right`, or an even-sized interval
    MalformedInterval {
        id: Option<NodeId>,
        left: i64,
        right: i64,
    },
    /// Interval overlaps an enclosing interval without being inside it
    CrossingInterval {
        id: Option<NodeId>,
        enclosing: Option<NodeId>,
    },
    /// Level differs from the nesting depth implied by the intervals
    LevelMismatch {
        id: Option<NodeId>,
        expected: i64,
        actual: i64,
    },
    /// `parent_id` is not the tightly enclosing node
    StaleParent {
        id: Option<NodeId>,
        expected: Option<NodeId>,
        actual: Option<NodeId>,
    },
    /// No row with `left = 1`
    MissingRoot { scope: i64 },
    /// Several top-level intervals in one scope
    MultipleRoots { scope: i64, ids: Vec<Option<NodeId>> },
}

impl fmt::Display for TreeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeViolation::Numbering {
                scope,
                missing,
                duplicated,
            } => write!(
                f,
                "scope {}: bounds missing {:?}, duplicated {:?}",
                scope, missing, duplicated
            ),
            TreeViolation::MalformedInterval { id, left, right } => {
                write!(f, "node {:?}: malformed interval [{}, {}]", id, left, right)
            }
            TreeViolation::CrossingInterval { id, enclosing } => {
                write!(f, "node {:?}: interval crosses node {:?}", id, enclosing)
            }
            TreeViolation::LevelMismatch {
                id,
                expected,
                actual,
            } => write!(
                f,
                "node {:?}: level {} but nested at depth {}",
                id, actual, expected
            ),
            TreeViolation::StaleParent {
                id,
                expected,
                actual,
            } => write!(
                f,
                "node {:?}: parent_id {:?} but enclosed by {:?}",
                id, actual, expected
            ),
            TreeViolation::MissingRoot { scope } => write!(f, "scope {}: no root", scope),
            TreeViolation::MultipleRoots { scope, ids } => {
                write!(f, "scope {}: several roots {:?}", scope, ids)
            }
        }
    }
}

/// Check one scope
pub async fn check_scope(
    repo: &dyn NodeRepository,
    scope: i64,
) -> Result<Vec<TreeViolation>, DatabaseError> {
    let rows = repo
        .find_all(
            &Query::new(Filter::new().eq(Column::Scope, scope))
                .order_by(Column::Left, SortDirection::Ascending)
                .order_by(Column::Id, SortDirection::Ascending),
        )
        .await?;
    Ok(check_rows(scope, &rows))
}

/// Check every scope of the table
pub async fn check_all(repo: &dyn NodeRepository) -> Result<Vec<TreeViolation>, DatabaseError> {
    let rows = repo
        .find_all(
            &Query::new(Filter::new())
                .order_by(Column::Scope, SortDirection::Ascending)
                .order_by(Column::Left, SortDirection::Ascending)
                .order_by(Column::Id, SortDirection::Ascending),
        )
        .await?;

    let mut by_scope: BTreeMap<i64, Vec<TreeNode>> = BTreeMap::new();
    for node in rows {
        by_scope.entry(node.scope).or_default().push(node);
    }

    let violations: Vec<TreeViolation> = by_scope
        .iter()
        .flat_map(|(scope, rows)| check_rows(*scope, rows))
        .collect();

    tracing::debug!(
        "Checked {} scopes of '{}', {} violations",
        by_scope.len(),
        repo.table(),
        violations.len()
    );
    Ok(violations)
}

/// Check the rows of one scope, which must be ordered by left
fn check_rows(scope: i64, rows: &[TreeNode]) -> Vec<TreeViolation> {
    let mut violations = Vec::new();
    if rows.is_empty() {
        return violations;
    }

    // Every bound 1..=2N exactly once
    let mut seen: BTreeMap<i64, usize> = BTreeMap::new();
    for node in rows {
        *seen.entry(node.left).or_default() += 1;
        *seen.entry(node.right).or_default() += 1;
    }
    let upper = 2 * rows.len() as i64;
    let missing: Vec<i64> = (1..=upper).filter(|b| !seen.contains_key(b)).collect();
    let duplicated: Vec<i64> = seen
        .iter()
        .filter(|(bound, count)| **count > 1 || **bound < 1 || **bound > upper)
        .map(|(bound, _)| *bound)
        .collect();
    if !missing.is_empty() || !duplicated.is_empty() {
        violations.push(TreeViolation::Numbering {
            scope,
            missing,
            duplicated,
        });
    }

    // Walk intervals in left order with a stack of open ancestors
    let mut open: Vec<&TreeNode> = Vec::new();
    let mut top_level: Vec<Option<NodeId>> = Vec::new();

    for node in rows {
        if node.right <= node.left || (node.right - node.left) % 2 == 0 {
            violations.push(TreeViolation::MalformedInterval {
                id: node.id,
                left: node.left,
                right: node.right,
            });
            continue;
        }

        while open.last().is_some_and(|top| top.right < node.left) {
            open.pop();
        }

        let enclosing = open.last().copied();
        if let Some(top) = enclosing {
            if node.right > top.right {
                violations.push(TreeViolation::CrossingInterval {
                    id: node.id,
                    enclosing: top.id,
                });
                continue;
            }
        } else {
            top_level.push(node.id);
        }

        let depth = open.len() as i64 + 1;
        if node.level != depth {
            violations.push(TreeViolation::LevelMismatch {
                id: node.id,
                expected: depth,
                actual: node.level,
            });
        }

        let expected_parent = enclosing.and_then(|top| top.id);
        if node.parent_id != expected_parent {
            violations.push(TreeViolation::StaleParent {
                id: node.id,
                expected: expected_parent,
                actual: node.parent_id,
            });
        }

        open.push(node);
    }

    if !rows.iter().any(|node| node.left == 1) {
        violations.push(TreeViolation::MissingRoot { scope });
    }
    if top_level.len() > 1 {
        violations.push(TreeViolation::MultipleRoots {
            scope,
            ids: top_level,
        });
    }

    violations
}
