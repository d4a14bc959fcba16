//! Report command for showing time spent per application.
//!
//! This module implements `ft report` with period options
//! (--day, --last-day, --week, --days N, --since/--to) and output formats
//! (human-readable, JSON).

use std::fmt::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use ft_core::{AppUsage, RecordStore, UsageService};
use ft_db::Database;
use serde::Serialize;

use super::util::{format_duration, parse_datetime_at};
use crate::{Config, ReportArgs};

/// Report period type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    LastDay,
    Week,
}

/// Computed report data for one time range.
#[derive(Debug)]
pub struct ReportData {
    pub label: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub apps: Vec<AppUsage>,
}

impl ReportData {
    pub fn total(&self) -> Duration {
        self.apps
            .iter()
            .fold(Duration::zero(), |total, app| total + app.duration)
    }
}

// ========== Period Date Calculation ==========

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
fn local_midnight_to_utc(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        // Single or ambiguous (DST fall-back): use the earlier time
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // DST spring-forward gap at midnight: midnight does not exist, so
            // the day starts one hour later in wall-clock terms
            let shifted = midnight + Duration::hours(1);
            Local
                .from_local_datetime(&shifted)
                .earliest()
                .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
        }
    }
}

/// Calculates day boundaries (day 00:00 to next day 00:00 local time) as half-open interval.
fn day_boundaries(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = day + Duration::days(1);
    (local_midnight_to_utc(day), local_midnight_to_utc(next))
}

/// Calculates week boundaries (Mon 00:00 to next Mon 00:00 local time).
fn week_boundaries(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_since_monday = today.weekday().num_days_from_monday();
    let monday = today - Duration::days(i64::from(days_since_monday));
    let next_monday = monday + Duration::days(7);
    (local_midnight_to_utc(monday), local_midnight_to_utc(next_monday))
}

/// Get boundaries for a given period, using the provided date as reference.
pub fn get_period_boundaries(period: Period, today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    match period {
        Period::Day => day_boundaries(today),
        Period::LastDay => day_boundaries(today - Duration::days(1)),
        Period::Week => week_boundaries(today),
    }
}

fn period_label(period: Period, start: DateTime<Utc>) -> String {
    let start_date = start.with_timezone(&Local).date_naive();
    match period {
        Period::Day | Period::LastDay => start_date.format("%A, %b %-d, %Y").to_string(),
        Period::Week => format!("Week of {}", start_date.format("%b %-d, %Y")),
    }
}

fn range_label(since: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let format = "%Y-%m-%d %H:%M";
    format!(
        "{} to {}",
        since.with_timezone(&Local).format(format),
        to.with_timezone(&Local).format(format)
    )
}

// ========== Progress Bar ==========

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: Duration, max: Duration) -> String {
    let value = value.num_milliseconds();
    let max = max.num_milliseconds();
    if max <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().clamp(0.0, 10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Report Generation ==========

/// Queries usage for a named period around `today`.
pub fn generate_period<S: RecordStore>(
    service: &UsageService<S>,
    period: Period,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> ReportData {
    let (period_start, period_end) = get_period_boundaries(period, today);
    ReportData {
        label: period_label(period, period_start),
        period_start,
        period_end,
        apps: service.query_at(period_start, period_end, now),
    }
}

/// Queries usage for an explicit range.
pub fn generate_range<S: RecordStore>(
    service: &UsageService<S>,
    since: DateTime<Utc>,
    to: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ReportData {
    ReportData {
        label: range_label(since, to),
        period_start: since,
        period_end: to,
        apps: service.query_at(since, to, now),
    }
}

/// Queries usage for each of the last `days` local days, oldest first.
pub fn generate_daily<S: RecordStore>(
    service: &UsageService<S>,
    days: u32,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Vec<ReportData> {
    (0..days)
        .rev()
        .map(|offset| {
            let day = today - Duration::days(i64::from(offset));
            let (period_start, period_end) = day_boundaries(day);
            ReportData {
                label: period_label(Period::Day, period_start),
                period_start,
                period_end,
                apps: service.query_at(period_start, period_end, now),
            }
        })
        .collect()
}

/// Runs the report command.
pub fn run<W: std::io::Write>(writer: &mut W, config: &Config, args: &ReportArgs) -> Result<()> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let service = UsageService::start(db, config.ignored_app_ids())
        .context("failed to load usage records")?;

    let now = Utc::now();
    let today = Local::now().date_naive();

    let reports = if let Some(since) = args.since.as_deref() {
        let since = parse_datetime_at(since, now)?;
        let to = args
            .to
            .as_deref()
            .map(|to| parse_datetime_at(to, now))
            .transpose()?
            .unwrap_or(now);
        if to < since {
            anyhow::bail!("--to ({to}) is before --since ({since})");
        }
        vec![generate_range(&service, since, to, now)]
    } else if let Some(days) = args.days {
        generate_daily(&service, days, today, now)
    } else {
        let period = if args.last_day {
            Period::LastDay
        } else if args.week {
            Period::Week
        } else {
            Period::Day
        };
        vec![generate_period(&service, period, today, now)]
    };

    writer.write_all(render(&reports, args.json)?.as_bytes())?;
    Ok(())
}

// ========== Output Formatting ==========

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData) -> String {
    let mut output = String::new();

    writeln!(output, "FOCUS REPORT: {}", data.label).unwrap();
    writeln!(output).unwrap();

    if data.apps.is_empty() {
        writeln!(output, "No application usage recorded in this period.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'ft status' to check tracking health.").unwrap();
        return output;
    }

    // Apps are sorted descending, so the first one scales the bars
    let max = data.apps[0].duration;
    for app in &data.apps {
        let duration = format_duration(app.duration);
        let bar = progress_bar(app.duration, max);
        writeln!(output, "{:<30} {duration:>8}  {bar}", app.display_name).unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "Total focused:  {}", format_duration(data.total())).unwrap();

    output
}

/// JSON representation of one application row.
#[derive(Debug, Serialize)]
pub struct JsonApp {
    pub app_id: String,
    pub name: String,
    pub duration_secs: i64,
}

/// JSON representation of one report.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub label: String,
    pub period_start: String,
    pub period_end: String,
    pub timezone: String,
    pub total_secs: i64,
    pub apps: Vec<JsonApp>,
}

impl JsonReport {
    pub fn new(data: &ReportData, timezone: &str) -> Self {
        Self {
            label: data.label.clone(),
            period_start: data.period_start.to_rfc3339(),
            period_end: data.period_end.to_rfc3339(),
            timezone: timezone.to_string(),
            total_secs: data.total().num_seconds(),
            apps: data
                .apps
                .iter()
                .map(|app| JsonApp {
                    app_id: app.app_id.to_string(),
                    name: app.display_name.clone(),
                    duration_secs: app.duration.num_seconds(),
                })
                .collect(),
        }
    }
}

/// Renders reports to text or JSON.
pub fn render(reports: &[ReportData], json: bool) -> Result<String> {
    if json {
        let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
        let payload: Vec<JsonReport> = reports
            .iter()
            .map(|report| JsonReport::new(report, &timezone))
            .collect();
        let rendered = if let [single] = payload.as_slice() {
            serde_json::to_string_pretty(single)?
        } else {
            serde_json::to_string_pretty(&payload)?
        };
        return Ok(rendered + "\n");
    }

    Ok(reports
        .iter()
        .map(format_report)
        .collect::<Vec<_>>()
        .join("\n"))
}
