//! Tree Services
//!
//! Read-only services layered over a node repository:
//!
//! - `integrity` - Verifies the nested-set encoding of a table, scope by scope

pub mod integrity;

pub use integrity::{check_all, check_scope, TreeViolation};
