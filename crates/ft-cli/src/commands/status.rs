//! Status command for showing what has been recorded.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use ft_db::Database;

use super::util::format_duration;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    writeln!(writer, "Focus tracker status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;

    let Some(last) = db.last_interval()? else {
        writeln!(writer, "No usage recorded.")?;
        return Ok(());
    };

    writeln!(writer, "Intervals:    {}", db.interval_count()?)?;
    writeln!(writer, "Applications: {}", db.name_count()?)?;

    let name = db
        .display_name(last.app_id())?
        .unwrap_or_else(|| last.app_id().to_string());
    writeln!(
        writer,
        "Last focus:   {name} ({}) for {}, ended {}",
        last.app_id(),
        format_duration(last.duration()),
        last.end().to_rfc3339_opts(SecondsFormat::Secs, true)
    )?;

    Ok(())
}
