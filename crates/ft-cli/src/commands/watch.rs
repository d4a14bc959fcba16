//! Watch command: feeds focus signals from stdin into the usage service.
//!
//! Each input line is one JSON [`Signal`], for example:
//!
//! ```text
//! {"type":"focus_gained","identifier":"com.apple.Safari","display_name":"Safari"}
//! {"type":"system_suspending"}
//! {"type":"system_resumed","focused_application":{"identifier":"com.apple.Terminal","display_name":"Terminal"}}
//! {"type":"process_terminating"}
//! ```
//!
//! Signals without `at` are stamped with the time they were read.

use std::fs::{self, File};
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::Utc;
use fs2::FileExt;
use ft_core::{RecordStore, Signal, UsageService};
use ft_db::Database;

use crate::Config;

/// Counters for one watch session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    pub signals: usize,
    pub skipped: usize,
    pub intervals: usize,
}

/// Applies signals from `reader` until end of input or `process_terminating`.
pub fn process_signals<S, R>(service: &UsageService<S>, reader: R) -> Result<WatchStats>
where
    S: RecordStore,
    R: BufRead,
{
    let mut stats = WatchStats::default();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line_no = index + 1;
        let line = match String::from_utf8(line.context("failed to read signal")?) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(line = line_no, %err, "skipping signal that is not valid UTF-8");
                stats.skipped += 1;
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let signal: Signal = match serde_json::from_str(line) {
            Ok(signal) => signal,
            Err(err) => {
                tracing::warn!(line = line_no, %err, "skipping malformed signal");
                stats.skipped += 1;
                continue;
            }
        };

        stats.signals += 1;
        let closed = service
            .handle(&signal, Utc::now())
            .with_context(|| format!("failed to apply {} signal on line {line_no}", signal.kind()))?;
        if let Some(interval) = closed {
            tracing::info!(
                app_id = %interval.app_id(),
                start = %interval.start(),
                duration_ms = interval.duration().num_milliseconds(),
                "recorded usage interval"
            );
            stats.intervals += 1;
        }

        if matches!(signal, Signal::ProcessTerminating { .. }) {
            tracing::info!("received process_terminating, stopping");
            break;
        }
    }

    Ok(stats)
}

/// Applies signals from `reader`, then shuts the service down.
///
/// The open focus is flushed on every exit path, including when processing
/// stops on a read or persistence error. That error is returned after the
/// flush and wins over a failing flush, which is only logged.
pub fn watch_session<S, R>(service: UsageService<S>, reader: R) -> Result<WatchStats>
where
    S: RecordStore,
    R: BufRead,
{
    let processed = process_signals(&service, reader);
    let open_at_exit = service.current_focus().is_some();
    let flushed = service.shutdown(Utc::now());

    match (processed, flushed) {
        (Ok(mut stats), Ok(_)) => {
            if open_at_exit {
                stats.intervals += 1;
            }
            Ok(stats)
        }
        (Ok(_), Err(err)) => {
            Err(anyhow::Error::new(err).context("failed to record final focus interval"))
        }
        (Err(err), flushed) => {
            if let Err(flush_err) = flushed {
                tracing::error!(error = %flush_err, "failed to record final focus interval");
            }
            Err(err)
        }
    }
}

/// Runs the watch command.
///
/// Holds an exclusive lock next to the database for the whole session so
/// only one watcher writes to it at a time.
pub fn run<R: BufRead, W: Write>(reader: R, writer: &mut W, config: &Config) -> Result<()> {
    if let Some(parent) = config.database_path.parent() {
        fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let lock_file = File::create(config.lock_path()).context("failed to create lock file")?;
    lock_file.try_lock_exclusive().with_context(|| {
        format!(
            "another watcher holds {}",
            config.lock_path().display()
        )
    })?;

    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let service = UsageService::start(db, config.ignored_app_ids())
        .context("failed to load usage records")?;

    let stats = watch_session(service, reader)?;

    writeln!(
        writer,
        "Processed {} signals ({} skipped), recorded {} intervals",
        stats.signals, stats.skipped, stats.intervals
    )?;

    Ok(())
}
