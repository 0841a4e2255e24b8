//! Named tables held by a session, one of which is active.

use crate::error::{AnalysisError, Result};
use polars::prelude::DataFrame;
use std::collections::HashMap;
use tracing::info;

/// Per-session table store.
///
/// `active`, when set, always names a stored table.
#[derive(Debug, Default, Clone)]
pub struct DatasetRegistry {
    tables: HashMap<String, DataFrame>,
    active: Option<String>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `df` under `name`, replacing any previous table of that name,
    /// and make it the active table.
    pub fn put(&mut self, name: impl Into<String>, df: DataFrame) {
        let name = name.into();
        info!(
            "Registered table '{}' ({} rows x {} columns)",
            name,
            df.height(),
            df.width()
        );
        self.tables.insert(name.clone(), df);
        self.active = Some(name);
    }

    /// The named table, or the active one when `name` is `None`.
    pub fn get(&self, name: Option<&str>) -> Result<&DataFrame> {
        let key = name.or(self.active.as_deref());
        key.and_then(|k| self.tables.get(k))
            .ok_or(AnalysisError::NoActiveDataset)
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Stored table names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
