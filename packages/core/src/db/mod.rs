//! Database Layer
//!
//! This module holds everything the tree engine needs from storage:
//!
//! - `NodeRepository` - the async trait the engine drives
//! - Query model - predicates, ordering and column arithmetic (`query`)
//! - Exclusive sections for structural mutations (`lock`)
//! - `MemoryStore` - in-process repository
//! - `LibsqlStore` - SQLite repository built on libsql
//!
//! # Architecture
//!
//! The engine describes reads and writes with backend-neutral types and never
//! sees SQL. Each repository models exactly one tree table.

mod error;
mod libsql_store;
pub mod lock;
mod memory_store;
mod node_store;
pub mod query;

pub use error::DatabaseError;
pub use libsql_store::LibsqlStore;
pub use lock::{ExclusiveSection, TableLocks};
pub use memory_store::MemoryStore;
pub use node_store::NodeRepository;
pub use query::{
    Assignment, Column, Filter, FilterOperator, Predicate, Query, SetOp, SortConfig,
    SortDirection,
};
