//! Exclusive Sections for Structural Mutations
//!
//! Nested-set mutations rewrite many rows with column arithmetic; two of them
//! interleaving on the same table corrupt the numbering for good. Repositories
//! hand out an `ExclusiveSection` per table for the whole duration of a
//! structural operation.
//!
//! # Lock Ordering
//!
//! Sections spanning several tables acquire them in lexicographic order so two
//! callers naming the same tables in different orders cannot deadlock.
//!
//! # Release
//!
//! Dropping the section releases every table it holds, so an early return or
//! an error between acquire and release can never leak the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-table locks shared by every handle of one repository
#[derive(Debug, Clone, Default)]
pub struct TableLocks {
    tables: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl TableLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, table: &str) -> Arc<AsyncMutex<()>> {
        let mut tables = match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tables
            .entry(table.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait until every named table is free, then hold them all
    pub async fn acquire(&self, tables: &[&str]) -> ExclusiveSection {
        let mut names: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
        names.sort();
        names.dedup();

        let mut guards = Vec::with_capacity(names.len());
        for name in &names {
            guards.push(self.lock_for(name).lock_owned().await);
        }

        tracing::debug!("Acquired exclusive section on {:?}", names);
        ExclusiveSection {
            tables: names,
            _guards: guards,
        }
    }
}

/// Proof that the caller holds exclusive access to a set of tables
#[derive(Debug)]
pub struct ExclusiveSection {
    tables: Vec<String>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl ExclusiveSection {
    /// Tables covered by this section, sorted
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn covers(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }
}

impl Drop for ExclusiveSection {
    fn drop(&mut self) {
        tracing::debug!("Released exclusive section on {:?}", self.tables);
    }
}
