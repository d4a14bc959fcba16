//! Application identifier to display name mapping.

use std::collections::HashMap;

use crate::types::{AppId, NameRecord};

/// Last known display name for every application seen so far.
///
/// Entries are last-write-wins and never removed while the process runs.
#[derive(Debug, Clone, Default)]
pub struct NameDirectory {
    names: HashMap<AppId, String>,
}

impl NameDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the directory from a full scan of stored name records.
    ///
    /// Later records win over earlier ones for the same identifier.
    pub fn from_records(records: impl IntoIterator<Item = NameRecord>) -> Self {
        let mut directory = Self::new();
        for record in records {
            directory.upsert(record.app_id, record.display_name);
        }
        directory
    }

    /// Records `display_name` as the current name of `app_id`.
    pub fn upsert(&mut self, app_id: AppId, display_name: impl Into<String>) {
        self.names.insert(app_id, display_name.into());
    }

    pub fn lookup(&self, app_id: &AppId) -> Option<&str> {
        self.names.get(app_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
