//! Query Model - Predicates, Ordering and Column Arithmetic
//!
//! Backend-neutral description of what the engine asks a repository to do.
//! The in-memory repository evaluates these structures directly; the SQL
//! repository renders them into statements.
//!
//! # Examples
//!
//! ```rust
//! use nestedset_core::db::{Column, Filter, Query, SortDirection};
//!
//! // Descendants of the interval [4, 9] in scope 1, deepest-first by left
//! let query = Query::new(
//!     Filter::new()
//!         .gt(Column::Left, 4)
//!         .lt(Column::Right, 9)
//!         .eq(Column::Scope, 1),
//! )
//! .order_by(Column::Left, SortDirection::Descending);
//!
//! assert_eq!(query.filter.predicates().len(), 3);
//! ```

use crate::models::TreeNode;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Structural columns every tree table carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Id,
    ParentId,
    Left,
    Right,
    Level,
    Scope,
}

impl Column {
    /// Value of this column on a loaded node (`None` for a NULL)
    pub fn value_of(&self, node: &TreeNode) -> Option<i64> {
        match self {
            Column::Id => node.id,
            Column::ParentId => node.parent_id,
            Column::Left => Some(node.left),
            Column::Right => Some(node.right),
            Column::Level => Some(node.level),
            Column::Scope => Some(node.scope),
        }
    }

    fn slot<'a>(&self, node: &'a mut TreeNode) -> Option<&'a mut i64> {
        match self {
            Column::Left => Some(&mut node.left),
            Column::Right => Some(&mut node.right),
            Column::Level => Some(&mut node.level),
            Column::Scope => Some(&mut node.scope),
            Column::Id | Column::ParentId => None,
        }
    }
}

/// Comparison operator for predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    #[serde(rename = "eq")]
    Equals,
    #[serde(rename = "ne")]
    NotEquals,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "gte")]
    GreaterThanOrEqual,
    #[serde(rename = "lte")]
    LessThanOrEqual,
}

impl FilterOperator {
    /// SQL spelling of the operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "=",
            FilterOperator::NotEquals => "<>",
            FilterOperator::GreaterThan => ">",
            FilterOperator::LessThan => "<",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::LessThanOrEqual => "<=",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            FilterOperator::Equals => ordering == Ordering::Equal,
            FilterOperator::NotEquals => ordering != Ordering::Equal,
            FilterOperator::GreaterThan => ordering == Ordering::Greater,
            FilterOperator::LessThan => ordering == Ordering::Less,
            FilterOperator::GreaterThanOrEqual => ordering != Ordering::Less,
            FilterOperator::LessThanOrEqual => ordering != Ordering::Greater,
        }
    }
}

/// One condition over a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Predicate {
    /// `column <op> value`; never matches a NULL column
    Compare {
        column: Column,
        operator: FilterOperator,
        value: i64,
    },
    /// `column IS NULL`
    IsNull { column: Column },
    /// `right = left + 1`
    Leaf,
    /// Disjunction of predicates
    AnyOf { predicates: Vec<Predicate> },
}

impl Predicate {
    /// Evaluate against a loaded node with SQL NULL semantics
    pub fn matches(&self, node: &TreeNode) -> bool {
        match self {
            Predicate::Compare {
                column,
                operator,
                value,
            } => column
                .value_of(node)
                .map(|actual| operator.holds(actual.cmp(value)))
                .unwrap_or(false),
            Predicate::IsNull { column } => column.value_of(node).is_none(),
            Predicate::Leaf => node.right == node.left + 1,
            Predicate::AnyOf { predicates } => predicates.iter().any(|p| p.matches(node)),
        }
    }
}

/// Conjunction of predicates; an empty filter matches every row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Add an arbitrary predicate
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add `column <operator> value`
    pub fn compare(self, column: Column, operator: FilterOperator, value: i64) -> Self {
        self.and(Predicate::Compare {
            column,
            operator,
            value,
        })
    }

    pub fn eq(self, column: Column, value: i64) -> Self {
        self.compare(column, FilterOperator::Equals, value)
    }

    pub fn ne(self, column: Column, value: i64) -> Self {
        self.compare(column, FilterOperator::NotEquals, value)
    }

    pub fn gt(self, column: Column, value: i64) -> Self {
        self.compare(column, FilterOperator::GreaterThan, value)
    }

    pub fn gte(self, column: Column, value: i64) -> Self {
        self.compare(column, FilterOperator::GreaterThanOrEqual, value)
    }

    pub fn lt(self, column: Column, value: i64) -> Self {
        self.compare(column, FilterOperator::LessThan, value)
    }

    pub fn lte(self, column: Column, value: i64) -> Self {
        self.compare(column, FilterOperator::LessThanOrEqual, value)
    }

    pub fn is_null(self, column: Column) -> Self {
        self.and(Predicate::IsNull { column })
    }

    pub fn matches(&self, node: &TreeNode) -> bool {
        self.predicates.iter().all(|p| p.matches(node))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Sorting configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortConfig {
    pub column: Column,
    pub direction: SortDirection,
}

/// Filter plus ordering and an optional row limit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub filter: Filter,
    pub sorting: Vec<SortConfig>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn order_by(mut self, column: Column, direction: SortDirection) -> Self {
        self.sorting.push(SortConfig { column, direction });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply filter, ordering and limit to an in-memory row set
    pub fn apply<'a, I>(&self, rows: I) -> Vec<TreeNode>
    where
        I: IntoIterator<Item = &'a TreeNode>,
    {
        let mut matched: Vec<TreeNode> = rows
            .into_iter()
            .filter(|node| self.filter.matches(node))
            .cloned()
            .collect();

        sort_nodes(&mut matched, &self.sorting);

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Sort nodes in-place; ties keep their incoming order
pub fn sort_nodes(nodes: &mut [TreeNode], sorting: &[SortConfig]) {
    if sorting.is_empty() {
        return;
    }

    nodes.sort_by(|a, b| {
        for sort_config in sorting {
            let ordering = sort_config
                .column
                .value_of(a)
                .cmp(&sort_config.column.value_of(b));
            let ordering = match sort_config.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// How an assignment changes a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetOp {
    /// `column = column + delta` (negative delta subtracts)
    Add(i64),
    /// `column = value`
    Value(i64),
}

/// One `SET` clause of a bulk update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: Column,
    pub op: SetOp,
}

impl Assignment {
    pub fn add(column: Column, delta: i64) -> Self {
        Self {
            column,
            op: SetOp::Add(delta),
        }
    }

    pub fn set(column: Column, value: i64) -> Self {
        Self {
            column,
            op: SetOp::Value(value),
        }
    }

    /// Apply to an in-memory row.
    ///
    /// All assignments of one update read the row as it was before the update,
    /// so callers must evaluate the filter first.
    pub fn apply(&self, node: &mut TreeNode) {
        if let Some(slot) = self.column.slot(node) {
            match self.op {
                SetOp::Add(delta) => *slot += delta,
                SetOp::Value(value) => *slot = value,
            }
        }
    }
}
