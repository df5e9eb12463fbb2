//! Tree Operations
//!
//! This module contains the structural side of the crate:
//!
//! - `TreeIndex` - Gap management, inserts, moves, deletes, repair
//! - `relations` - Translation of structural relations into queries
//! - `TreeError` - Errors returned by every operation
//!
//! Navigation methods on `TreeIndex` return a lazy [`Relation`]; nothing is
//! read from the repository until it is consumed.

mod error;
pub mod relations;
mod tree_index;

pub use error::{TreeError, TreeResult};
pub use relations::{DescendantsOptions, ParentsOptions, Relation};
pub use tree_index::{Placement, TreeIndex};
