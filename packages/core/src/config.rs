//! Tree Table Configuration
//!
//! Names the table and columns a nested-set tree lives in. Repositories that
//! generate SQL read every identifier from here; the in-memory repository only
//! uses the table name for its exclusive section.
//!
//! # Examples
//!
//! ```rust
//! use nestedset_core::config::TreeConfig;
//!
//! let config = TreeConfig::from_json(r#"{ "table": "categories", "columns": { "left": "l" } }"#)
//!     .unwrap();
//!
//! assert_eq!(config.table, "categories");
//! assert_eq!(config.columns.left, "l");
//! assert_eq!(config.columns.right, "rgt");
//! ```

use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Column names of a tree table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub id: String,
    pub parent: String,
    pub left: String,
    pub right: String,
    pub level: String,
    pub scope: String,
    pub payload: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            parent: "parent_id".to_string(),
            left: "lft".to_string(),
            right: "rgt".to_string(),
            level: "lvl".to_string(),
            scope: "scope".to_string(),
            payload: "payload".to_string(),
        }
    }
}

/// Configuration for one modeled tree type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Table holding the tree rows (default: `nodes`)
    pub table: String,
    /// Column names (defaults: `id`, `parent_id`, `lft`, `rgt`, `lvl`, `scope`, `payload`)
    pub columns: ColumnNames,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            table: "nodes".to_string(),
            columns: ColumnNames::default(),
        }
    }
}

impl TreeConfig {
    /// Configuration for `table` with default column names
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json(raw: &str) -> Result<Self, DatabaseError> {
        let config: TreeConfig = serde_json::from_str(raw)
            .map_err(|e| DatabaseError::invalid_config(format!("Malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Every identifier must be a plain SQL identifier and column names must be distinct
    pub fn validate(&self) -> Result<(), DatabaseError> {
        let columns = [
            &self.columns.id,
            &self.columns.parent,
            &self.columns.left,
            &self.columns.right,
            &self.columns.level,
            &self.columns.scope,
            &self.columns.payload,
        ];

        for name in std::iter::once(&self.table).chain(columns.iter().copied()) {
            if !is_identifier(name) {
                return Err(DatabaseError::invalid_config(format!(
                    "'{}' is not a valid SQL identifier",
                    name
                )));
            }
        }

        for (i, a) in columns.iter().enumerate() {
            if columns[i + 1..].iter().any(|b| a == b) {
                return Err(DatabaseError::invalid_config(format!(
                    "Column name '{}' is used twice",
                    a
                )));
            }
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TreeConfig::default();
        assert_eq!(config.table, "nodes");
        assert_eq!(config.columns.left, "lft");
        assert_eq!(config.columns.right, "rgt");
        assert_eq!(config.columns.level, "lvl");
        assert_eq!(config.columns.scope, "scope");
        assert_eq!(config.columns.parent, "parent_id");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = TreeConfig::from_json(r#"{ "columns": { "scope": "tree_id" } }"#).unwrap();
        assert_eq!(config.table, "nodes");
        assert_eq!(config.columns.scope, "tree_id");
        assert_eq!(config.columns.id, "id");
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        let config = TreeConfig::for_table("nodes; DROP TABLE nodes");
        assert!(matches!(
            config.validate(),
            Err(DatabaseError::InvalidConfig(_))
        ));

        let mut config = TreeConfig::default();
        config.columns.level = "1lvl".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let mut config = TreeConfig::default();
        config.columns.right = "lft".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(TreeConfig::from_json("{ table: ").is_err());
    }
}
