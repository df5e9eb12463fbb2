//! Nested-Set Tree Index
//!
//! This crate maintains tree-shaped data inside a flat table using the
//! nested-set (MPTT) encoding. Every row carries `left`/`right` bounds, a
//! `level` and a `scope`; ancestry, descent and sibling relations are derived
//! by comparing intervals, and several independent trees share one table.
//!
//! # Architecture
//!
//! - **Engine over a repository**: `TreeIndex` computes offsets and issues bulk
//!   range updates; it never builds SQL itself
//! - **Exclusive sections**: every structural mutation holds the table's
//!   section for its full duration
//! - **libsql**: embedded SQLite-compatible storage, plus an in-memory store
//!
//! # Modules
//!
//! - [`models`] - Node rows and node references
//! - [`behaviors`] - Validation callbacks run before every persist
//! - [`db`] - Repository trait, query model, locks, libsql and memory stores
//! - [`operations`] - The tree index engine and relation queries
//! - [`services`] - Integrity checking
//! - [`config`] - Table and column naming

pub mod behaviors;
pub mod config;
pub mod db;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use behaviors::{NodeValidator, ValidatorChain};
pub use config::TreeConfig;
pub use db::{DatabaseError, LibsqlStore, MemoryStore, NodeRepository};
pub use models::*;
pub use operations::{Placement, Relation, TreeError, TreeIndex, TreeResult};
pub use services::{check_all, check_scope, TreeViolation};
