//! Record store contract and an in-memory implementation.

use std::convert::Infallible;

use crate::types::{AppId, NameRecord, UsageInterval};

/// Durable append-and-scan storage for usage records.
///
/// This trait lets the service work with different backends (e.g. the
/// `SQLite` database in `ft-db`, or [`MemoryStore`] in tests). Implementations
/// never mutate or delete stored intervals.
pub trait RecordStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Appends a closed interval and upserts its application's name in a
    /// single transaction. Either both writes land or neither does.
    fn append_interval_with_name(
        &mut self,
        interval: &UsageInterval,
        display_name: &str,
    ) -> Result<(), Self::Error>;

    /// Records `display_name` as the current name of `app_id`.
    fn upsert_name(&mut self, app_id: &AppId, display_name: &str) -> Result<(), Self::Error>;

    /// Returns every stored interval, oldest first.
    fn scan_intervals(&self) -> Result<Vec<UsageInterval>, Self::Error>;

    /// Returns every stored name record.
    fn scan_names(&self) -> Result<Vec<NameRecord>, Self::Error>;
}

/// A [`RecordStore`] that keeps everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    intervals: Vec<UsageInterval>,
    names: Vec<NameRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intervals(&self) -> &[UsageInterval] {
        &self.intervals
    }

    pub fn names(&self) -> &[NameRecord] {
        &self.names
    }

    fn put_name(&mut self, app_id: &AppId, display_name: &str) {
        match self.names.iter_mut().find(|record| &record.app_id == app_id) {
            Some(record) => display_name.clone_into(&mut record.display_name),
            None => self.names.push(NameRecord {
                app_id: app_id.clone(),
                display_name: display_name.to_string(),
            }),
        }
    }
}

impl RecordStore for MemoryStore {
    type Error = Infallible;

    fn append_interval_with_name(
        &mut self,
        interval: &UsageInterval,
        display_name: &str,
    ) -> Result<(), Self::Error> {
        self.intervals.push(interval.clone());
        self.put_name(interval.app_id(), display_name);
        Ok(())
    }

    fn upsert_name(&mut self, app_id: &AppId, display_name: &str) -> Result<(), Self::Error> {
        self.put_name(app_id, display_name);
        Ok(())
    }

    fn scan_intervals(&self) -> Result<Vec<UsageInterval>, Self::Error> {
        Ok(self.intervals.clone())
    }

    fn scan_names(&self) -> Result<Vec<NameRecord>, Self::Error> {
        Ok(self.names.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn append_upserts_name_alongside_interval() {
        let mut store = MemoryStore::new();
        let app_id = AppId::new("com.a").unwrap();
        let interval = UsageInterval::new(
            app_id.clone(),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            Duration::seconds(3),
        );

        store.append_interval_with_name(&interval, "A").unwrap();
        store.append_interval_with_name(&interval, "A renamed").unwrap();

        assert_eq!(store.scan_intervals().unwrap().len(), 2);
        let names = store.scan_names().unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].display_name, "A renamed");
    }

    #[test]
    fn upsert_name_adds_then_replaces() {
        let mut store = MemoryStore::new();
        let app_id = AppId::new("com.b").unwrap();

        store.upsert_name(&app_id, "B").unwrap();
        store.upsert_name(&app_id, "Bee").unwrap();

        assert_eq!(store.names().len(), 1);
        assert_eq!(store.names()[0].display_name, "Bee");
        assert!(store.intervals().is_empty());
    }
}
