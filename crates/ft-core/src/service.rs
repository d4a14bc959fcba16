//! The usage service: single entry point for focus signals and queries.
//!
//! # Thread Safety
//!
//! Signals arrive one at a time from the event source, but queries may run
//! concurrently with them (e.g. a UI thread reading while a focus change is
//! being persisted). Tracker, aggregator, name directory and store therefore
//! sit behind one [`Mutex`]: a query sees either the state before a focus
//! change or the state after it, never a half-closed interval.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SubsecRound, Utc};

use crate::aggregator::UsageAggregator;
use crate::error::TrackerError;
use crate::names::NameDirectory;
use crate::signal::Signal;
use crate::store::RecordStore;
use crate::tracker::{ClosedSpan, FocusTracker};
use crate::types::{AppId, AppUsage, Application, OpenFocus, UsageInterval};

/// Tracks application focus and answers usage queries.
///
/// Construct with [`UsageService::start`], feed signals through
/// [`UsageService::handle`] or [`UsageService::application_changed`], and
/// finish with [`UsageService::shutdown`] so the open focus is persisted.
pub struct UsageService<S> {
    inner: Mutex<Inner<S>>,
}

struct Inner<S> {
    store: S,
    tracker: FocusTracker,
    aggregator: UsageAggregator,
    names: NameDirectory,
}

impl<S: RecordStore> UsageService<S> {
    /// Loads all stored intervals and names and starts in the idle state.
    ///
    /// Intervals for identifiers in `ignored` are still recorded but never
    /// reported.
    pub fn start(store: S, ignored: impl IntoIterator<Item = AppId>) -> Result<Self, TrackerError> {
        let intervals = store.scan_intervals().map_err(TrackerError::load)?;
        let names = store.scan_names().map_err(TrackerError::load)?;
        let ignored: HashSet<AppId> = ignored.into_iter().collect();

        tracing::info!(
            intervals = intervals.len(),
            names = names.len(),
            ignored = ignored.len(),
            "loaded usage records"
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                store,
                tracker: FocusTracker::new(),
                aggregator: UsageAggregator::new(intervals, ignored),
                names: NameDirectory::from_records(names),
            }),
        })
    }

    /// Applies one signal from the event source.
    ///
    /// Signals without a timestamp are stamped with `received_at`. Returns the
    /// interval that was closed and persisted, if any.
    pub fn handle(
        &self,
        signal: &Signal,
        received_at: DateTime<Utc>,
    ) -> Result<Option<UsageInterval>, TrackerError> {
        let now = signal.at().unwrap_or(received_at);
        let next = signal.focused_application();
        if next.is_none() && matches!(signal, Signal::FocusGained { .. }) {
            tracing::debug!(?signal, "focus gained by unattributable application");
        }
        tracing::debug!(kind = signal.kind(), %now, "applying signal");
        self.application_changed(next, now)
    }

    /// Ends the current focus span (if any) and starts tracking `next`.
    ///
    /// The close and the open happen under one lock, so the new span starts
    /// exactly where the old one ended. If persisting the closed interval
    /// fails, `next` is still tracked from `now` and the error carries the
    /// lost interval.
    ///
    /// `now` is truncated to whole milliseconds, the precision the store
    /// keeps, so in-memory totals match what a restart reloads.
    pub fn application_changed(
        &self,
        next: Option<Application>,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageInterval>, TrackerError> {
        let now = now.trunc_subsecs(3);
        let mut guard = self.lock();
        let inner = &mut *guard;

        let closed = inner
            .tracker
            .application_changed(next, now)
            .map(|span| inner.close(&span))
            .transpose();
        if let Some(open) = inner.tracker.current().cloned() {
            inner.open(open);
        }
        closed
    }

    /// Total focused time per application within `[since, to)`, counting the
    /// open focus up to the current time.
    pub fn query(&self, since: DateTime<Utc>, to: DateTime<Utc>) -> Vec<AppUsage> {
        self.query_at(since, to, Utc::now())
    }

    /// Like [`query`](Self::query), with the open focus counted up to `now`.
    pub fn query_at(
        &self,
        since: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<AppUsage> {
        let inner = self.lock();
        inner
            .aggregator
            .usage_between(since, to, inner.tracker.current(), now, &inner.names)
    }

    /// The focus span currently accumulating, if any.
    pub fn current_focus(&self) -> Option<OpenFocus> {
        self.lock().tracker.current().cloned()
    }

    /// Number of closed intervals held in memory.
    pub fn interval_count(&self) -> usize {
        self.lock().aggregator.intervals().len()
    }

    /// Closes any open focus at `now` and hands back the store.
    pub fn shutdown(self, now: DateTime<Utc>) -> Result<S, TrackerError> {
        let mut inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Some(span) = inner.tracker.application_changed(None, now.trunc_subsecs(3)) {
            inner.close(&span)?;
        }
        tracing::info!(
            intervals = inner.aggregator.intervals().len(),
            "usage service stopped"
        );
        Ok(inner.store)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        // Every mutation completes before the guard drops, so a poisoned
        // lock still holds consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: RecordStore> Inner<S> {
    /// Records the name of a newly focused application.
    ///
    /// A failed store write is only logged: the close transaction writes the
    /// name again.
    fn open(&mut self, focus: OpenFocus) {
        tracing::debug!(app_id = %focus.app_id, name = %focus.display_name, "focus opened");
        if let Err(err) = self.store.upsert_name(&focus.app_id, &focus.display_name) {
            tracing::warn!(
                app_id = %focus.app_id,
                error = %err,
                "failed to store application name, will retry on close"
            );
        }
        self.names.upsert(focus.app_id, focus.display_name);
    }

    /// Persists a closed span, then makes it visible to queries.
    fn close(&mut self, span: &ClosedSpan) -> Result<UsageInterval, TrackerError> {
        let interval = span.to_interval();
        if let Err(source) = self
            .store
            .append_interval_with_name(&interval, &span.focus.display_name)
        {
            tracing::error!(
                app_id = %interval.app_id(),
                start = %interval.start(),
                error = %source,
                "failed to persist usage interval"
            );
            return Err(TrackerError::Persistence {
                interval,
                source: Box::new(source),
            });
        }

        self.names
            .upsert(span.focus.app_id.clone(), span.focus.display_name.clone());
        self.aggregator.push(interval.clone());
        tracing::debug!(
            app_id = %interval.app_id(),
            duration_ms = interval.duration().num_milliseconds(),
            "focus closed"
        );
        Ok(interval)
    }
}
