//! Usage aggregation over closed and open focus spans.
//!
//! # Algorithm Summary
//!
//! 1. Take every closed interval plus the open focus, synthesized as an
//!    interval ending at `now`
//! 2. Clip each interval to the queried window `[since, to)`
//! 3. Sum the clipped durations per application, skipping ignored ones
//! 4. Sort by total descending, ties by identifier ascending

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::names::NameDirectory;
use crate::types::{AppId, AppUsage, OpenFocus, UsageInterval};

/// Identifiers excluded from reports unless configured otherwise.
pub const DEFAULT_IGNORED_APPS: &[&str] = &["com.apple.loginwindow"];

/// In-memory list of closed intervals for this process.
///
/// Loaded once from the record store at startup and append-only afterwards.
#[derive(Debug, Clone)]
pub struct UsageAggregator {
    intervals: Vec<UsageInterval>,
    ignored: HashSet<AppId>,
}

impl Default for UsageAggregator {
    fn default() -> Self {
        let ignored = DEFAULT_IGNORED_APPS
            .iter()
            .filter_map(|id| AppId::new(*id).ok())
            .collect();
        Self::new(Vec::new(), ignored)
    }
}

impl UsageAggregator {
    pub const fn new(intervals: Vec<UsageInterval>, ignored: HashSet<AppId>) -> Self {
        Self { intervals, ignored }
    }

    /// Appends an interval that has already been persisted.
    pub fn push(&mut self, interval: UsageInterval) {
        self.intervals.push(interval);
    }

    pub fn intervals(&self) -> &[UsageInterval] {
        &self.intervals
    }

    pub fn is_ignored(&self, app_id: &AppId) -> bool {
        self.ignored.contains(app_id)
    }

    /// Total focused time per application within `[since, to)`.
    ///
    /// `open` is the focus still accumulating at `now`; it counts as an
    /// interval from its start up to `now`.
    pub fn usage_between(
        &self,
        since: DateTime<Utc>,
        to: DateTime<Utc>,
        open: Option<&OpenFocus>,
        now: DateTime<Utc>,
        names: &NameDirectory,
    ) -> Vec<AppUsage> {
        if to <= since {
            return Vec::new();
        }

        let open_interval = open.map(|focus| focus.as_interval(now));
        let totals = sum_overlaps(
            self.intervals.iter().chain(open_interval.as_ref()),
            since,
            to,
            &self.ignored,
        );

        let mut usage: Vec<AppUsage> = totals
            .into_iter()
            .map(|(app_id, duration)| {
                let display_name = names.lookup(&app_id).map_or_else(
                    || {
                        tracing::error!(
                            %app_id,
                            "no display name recorded for application, using identifier"
                        );
                        app_id.to_string()
                    },
                    str::to_string,
                );
                AppUsage {
                    app_id,
                    display_name,
                    duration,
                }
            })
            .collect();

        usage.sort_by(|a, b| {
            b.duration
                .cmp(&a.duration)
                .then_with(|| a.app_id.cmp(&b.app_id))
        });
        usage
    }
}

/// Sums the positive overlaps of `intervals` with `[since, to)` per application.
fn sum_overlaps<'a>(
    intervals: impl Iterator<Item = &'a UsageInterval>,
    since: DateTime<Utc>,
    to: DateTime<Utc>,
    ignored: &HashSet<AppId>,
) -> HashMap<AppId, Duration> {
    let mut totals: HashMap<AppId, Duration> = HashMap::new();
    for interval in intervals {
        let overlap = interval.overlap(since, to);
        if overlap <= Duration::zero() || ignored.contains(interval.app_id()) {
            continue;
        }
        let total = totals
            .entry(interval.app_id().clone())
            .or_insert_with(Duration::zero);
        *total = *total + overlap;
    }
    totals
}
