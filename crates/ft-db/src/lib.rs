//! Storage layer for focus-time.
//!
//! Provides a `rusqlite`-backed [`RecordStore`] for usage intervals and
//! application names.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` can be moved into a [`UsageService`](ft_core::UsageService), which
//! serializes access behind its own mutex.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`). This ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware (always UTC)
//!
//! ## Immutability
//!
//! Rows in `usage_intervals` are only ever inserted. Names in `app_names` are
//! upserted, last write wins.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use ft_core::{AppId, NameRecord, RecordStore, UsageInterval, ValidationError};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp in row {row_id}: {timestamp}")]
    TimestampParse {
        row_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row violates a domain rule (empty identifier, reversed bounds).
    #[error("invalid record in row {row_id}")]
    InvalidRecord {
        row_id: String,
        #[source]
        source: ValidationError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Closed focus spans, never updated or deleted
            -- start_at/end_at: RFC 3339 UTC (e.g., '2024-01-15T10:30:00.000Z')
            CREATE TABLE IF NOT EXISTS usage_intervals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                app_id TEXT NOT NULL,
                start_at TEXT NOT NULL,
                end_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_usage_intervals_start ON usage_intervals(start_at);
            CREATE INDEX IF NOT EXISTS idx_usage_intervals_app ON usage_intervals(app_id);

            -- Last known display name per application
            CREATE TABLE IF NOT EXISTS app_names (
                app_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Number of stored intervals.
    pub fn interval_count(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM usage_intervals", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Number of applications with a stored name.
    pub fn name_count(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM app_names", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// The stored display name for `app_id`, if any.
    pub fn display_name(&self, app_id: &AppId) -> Result<Option<String>, DbError> {
        let name = self
            .conn
            .query_row(
                "SELECT display_name FROM app_names WHERE app_id = ?",
                [app_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    /// The most recently ending interval, if any.
    pub fn last_interval(&self) -> Result<Option<UsageInterval>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, app_id, start_at, end_at
                FROM usage_intervals
                ORDER BY end_at DESC, id DESC
                LIMIT 1
                ",
                [],
                IntervalRow::from_row,
            )
            .optional()?;
        row.map(IntervalRow::into_interval).transpose()
    }
}

impl RecordStore for Database {
    type Error = DbError;

    fn append_interval_with_name(
        &mut self,
        interval: &UsageInterval,
        display_name: &str,
    ) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO usage_intervals (app_id, start_at, end_at) VALUES (?, ?, ?)",
            params![
                interval.app_id().as_str(),
                format_timestamp(interval.start()),
                format_timestamp(interval.end()),
            ],
        )?;
        upsert_name_in(&tx, interval.app_id(), display_name, interval.end())?;
        tx.commit()?;
        Ok(())
    }

    fn upsert_name(&mut self, app_id: &AppId, display_name: &str) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        upsert_name_in(&tx, app_id, display_name, Utc::now())?;
        tx.commit()?;
        Ok(())
    }

    fn scan_intervals(&self) -> Result<Vec<UsageInterval>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, app_id, start_at, end_at
            FROM usage_intervals
            ORDER BY start_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], IntervalRow::from_row)?;
        let mut intervals = Vec::new();
        for row in rows {
            intervals.push(row?.into_interval()?);
        }
        Ok(intervals)
    }

    fn scan_names(&self) -> Result<Vec<NameRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT app_id, display_name
            FROM app_names
            ORDER BY app_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            let app_id: String = row.get(0)?;
            let display_name: String = row.get(1)?;
            Ok((app_id, display_name))
        })?;
        let mut names = Vec::new();
        for row in rows {
            let (app_id, display_name) = row?;
            let app_id = AppId::new(app_id.clone()).map_err(|source| DbError::InvalidRecord {
                row_id: format!("app_names:{app_id}"),
                source,
            })?;
            names.push(NameRecord {
                app_id,
                display_name,
            });
        }
        Ok(names)
    }
}

fn upsert_name_in(
    tx: &Transaction<'_>,
    app_id: &AppId,
    display_name: &str,
    updated_at: DateTime<Utc>,
) -> Result<(), DbError> {
    tx.execute(
        "
        INSERT INTO app_names (app_id, display_name, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(app_id) DO UPDATE SET
            display_name = excluded.display_name,
            updated_at = excluded.updated_at
        ",
        params![app_id.as_str(), display_name, format_timestamp(updated_at)],
    )?;
    Ok(())
}

#[derive(Debug)]
struct IntervalRow {
    id: i64,
    app_id: String,
    start_at: String,
    end_at: String,
}

impl IntervalRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            app_id: row.get(1)?,
            start_at: row.get(2)?,
            end_at: row.get(3)?,
        })
    }

    fn into_interval(self) -> Result<UsageInterval, DbError> {
        let row_id = format!("usage_intervals:{}", self.id);
        let start = parse_timestamp(&self.start_at, &row_id)?;
        let end = parse_timestamp(&self.end_at, &row_id)?;
        AppId::new(self.app_id)
            .and_then(|app_id| UsageInterval::from_bounds(app_id, start, end))
            .map_err(|source| DbError::InvalidRecord { row_id, source })
    }
}

fn parse_timestamp(timestamp: &str, row_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            row_id: row_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};
    use ft_core::{Application, UsageService};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_735_689_600 + secs, 0).unwrap()
    }

    fn interval(app: &str, start: i64, secs: i64) -> UsageInterval {
        UsageInterval::new(AppId::new(app).unwrap(), at(start), Duration::seconds(secs))
    }

    #[test]
    fn init_is_idempotent() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.init().expect("second init");
        assert_eq!(db.interval_count().unwrap(), 0);
        assert_eq!(db.name_count().unwrap(), 0);
    }

    #[test]
    fn append_stores_interval_and_name_together() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.append_interval_with_name(&interval("com.a", 0, 90), "A")
            .unwrap();

        let (app_id, start_at, end_at): (String, String, String) = db
            .conn
            .query_row(
                "SELECT app_id, start_at, end_at FROM usage_intervals",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(app_id, "com.a");
        assert_eq!(start_at, "2025-01-01T00:00:00.000Z");
        assert_eq!(end_at, "2025-01-01T00:01:30.000Z");

        let names = db.scan_names().unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].display_name, "A");
    }

    #[test]
    fn scan_intervals_returns_chronological_order() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.append_interval_with_name(&interval("com.b", 30, 5), "B")
            .unwrap();
        db.append_interval_with_name(&interval("com.a", 0, 30), "A")
            .unwrap();

        let intervals = db.scan_intervals().unwrap();
        assert_eq!(
            intervals,
            vec![interval("com.a", 0, 30), interval("com.b", 30, 5)]
        );
    }

    #[test]
    fn zero_length_interval_is_stored() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.append_interval_with_name(&interval("com.a", 10, 0), "A")
            .unwrap();

        let intervals = db.scan_intervals().unwrap();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].duration(), Duration::zero());
    }

    #[test]
    fn millisecond_precision_survives_round_trip() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let precise = UsageInterval::new(
            AppId::new("com.a").unwrap(),
            at(0) + Duration::milliseconds(250),
            Duration::milliseconds(1_500),
        );
        db.append_interval_with_name(&precise, "A").unwrap();

        assert_eq!(db.scan_intervals().unwrap(), vec![precise]);
    }

    #[test]
    fn upsert_name_is_last_write_wins() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let app_id = AppId::new("com.a").unwrap();
        db.upsert_name(&app_id, "Old").unwrap();
        db.upsert_name(&app_id, "New").unwrap();
        db.append_interval_with_name(&interval("com.b", 0, 1), "B")
            .unwrap();

        let names = db.scan_names().unwrap();
        assert_eq!(
            names,
            vec![
                NameRecord {
                    app_id,
                    display_name: "New".to_string(),
                },
                NameRecord {
                    app_id: AppId::new("com.b").unwrap(),
                    display_name: "B".to_string(),
                },
            ]
        );
    }

    #[test]
    fn last_interval_picks_latest_end() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        assert!(db.last_interval().unwrap().is_none());

        db.append_interval_with_name(&interval("com.a", 0, 100), "A")
            .unwrap();
        db.append_interval_with_name(&interval("com.b", 20, 10), "B")
            .unwrap();

        let last = db.last_interval().unwrap().unwrap();
        assert_eq!(last.app_id().as_str(), "com.a");
        assert_eq!(db.interval_count().unwrap(), 2);
        assert_eq!(db.display_name(last.app_id()).unwrap().as_deref(), Some("A"));
        assert!(
            db.display_name(&AppId::new("com.unknown").unwrap())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn corrupt_timestamp_is_reported() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.conn
            .execute(
                "INSERT INTO usage_intervals (app_id, start_at, end_at) VALUES (?, ?, ?)",
                params!["com.a", "yesterday", "2025-01-01T00:00:00.000Z"],
            )
            .unwrap();

        let err = db.scan_intervals().unwrap_err();
        assert!(matches!(err, DbError::TimestampParse { .. }), "{err}");
    }

    #[test]
    fn reversed_bounds_are_reported() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.conn
            .execute(
                "INSERT INTO usage_intervals (app_id, start_at, end_at) VALUES (?, ?, ?)",
                params!["com.a", "2025-01-01T00:10:00.000Z", "2025-01-01T00:00:00.000Z"],
            )
            .unwrap();

        let err = db.scan_intervals().unwrap_err();
        assert!(matches!(err, DbError::InvalidRecord { .. }), "{err}");
    }

    #[test]
    fn service_state_survives_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("ft.db");

        let db = Database::open(&db_path).unwrap();
        let service = UsageService::start(db, []).unwrap();
        service
            .application_changed(Application::resolve(Some("com.a"), Some("A")), at(0))
            .unwrap();
        service
            .application_changed(Application::resolve(Some("com.b"), Some("B")), at(40))
            .unwrap();
        drop(service.shutdown(at(60)).unwrap());

        let reopened = Database::open(&db_path).unwrap();
        assert_eq!(reopened.interval_count().unwrap(), 2);
        let service = UsageService::start(reopened, []).unwrap();
        let usage = service.query_at(at(0), at(3600), at(3600));
        let summary: Vec<(&str, i64)> = usage
            .iter()
            .map(|u| (u.display_name.as_str(), u.duration.num_seconds()))
            .collect();
        assert_eq!(summary, vec![("A", 40), ("B", 20)]);
    }

    #[test]
    fn live_totals_match_reloaded_totals() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("ft.db");
        let opened = at(0) + Duration::microseconds(900);

        let service = UsageService::start(Database::open(&db_path).unwrap(), []).unwrap();
        service
            .application_changed(Application::resolve(Some("com.a"), Some("A")), opened)
            .unwrap();
        service
            .application_changed(None, opened + Duration::microseconds(200))
            .unwrap();
        let live = service.query_at(at(0), at(10), at(10));
        drop(service.shutdown(at(10)).unwrap());

        let reloaded = UsageService::start(Database::open(&db_path).unwrap(), []).unwrap();
        let reloaded = reloaded.query_at(at(0), at(10), at(10));

        assert_eq!(live, reloaded);
        assert_eq!(live[0].duration, Duration::milliseconds(1));
    }

    #[test]
    fn name_is_stored_when_focus_opens() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("ft.db");

        let service = UsageService::start(Database::open(&db_path).unwrap(), []).unwrap();
        service
            .application_changed(Application::resolve(Some("com.a"), Some("Editor")), at(0))
            .unwrap();

        let observer = Database::open(&db_path).unwrap();
        assert_eq!(observer.interval_count().unwrap(), 0);
        assert_eq!(
            observer
                .display_name(&AppId::new("com.a").unwrap())
                .unwrap()
                .as_deref(),
            Some("Editor")
        );
    }
}
