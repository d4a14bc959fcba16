//! Focus tracking state machine.
//!
//! The tracker only knows which application is frontmost and since when.
//! Every call to [`FocusTracker::application_changed`] ends the current span
//! (if any) and starts the next one (if any) in a single step, so spans never
//! overlap and no time between two signals goes unattributed.

use chrono::{DateTime, Duration, Utc};

use crate::types::{Application, OpenFocus, UsageInterval};

/// Current focus state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FocusState {
    /// Nothing is tracked (asleep, shut down, or unattributable focus).
    #[default]
    Idle,
    /// An application is frontmost.
    Focused(OpenFocus),
}

/// A focus span that just ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSpan {
    pub focus: OpenFocus,
    /// Always non-negative.
    pub duration: Duration,
}

impl ClosedSpan {
    pub fn to_interval(&self) -> UsageInterval {
        UsageInterval::new(self.focus.app_id.clone(), self.focus.since, self.duration)
    }
}

/// Owns the single [`OpenFocus`].
#[derive(Debug, Default)]
pub struct FocusTracker {
    state: FocusState,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn state(&self) -> &FocusState {
        &self.state
    }

    /// The focus span currently accumulating, if any.
    pub const fn current(&self) -> Option<&OpenFocus> {
        match &self.state {
            FocusState::Idle => None,
            FocusState::Focused(focus) => Some(focus),
        }
    }

    /// Applies a focus change observed at `now`.
    ///
    /// `next` is the application that is frontmost from `now` on, or `None`
    /// when nothing should be tracked. Returns the span that ended, if one
    /// was open. At most one span is closed per call.
    pub fn application_changed(
        &mut self,
        next: Option<Application>,
        now: DateTime<Utc>,
    ) -> Option<ClosedSpan> {
        let next_state = match next {
            Some(app) => FocusState::Focused(OpenFocus::start(app, now)),
            None => FocusState::Idle,
        };

        match std::mem::replace(&mut self.state, next_state) {
            FocusState::Idle => None,
            FocusState::Focused(focus) => {
                let elapsed = now - focus.since;
                if elapsed < Duration::zero() {
                    tracing::warn!(
                        app_id = %focus.app_id,
                        since = %focus.since,
                        %now,
                        "clock moved backwards, clamping focus duration to zero"
                    );
                }
                Some(ClosedSpan {
                    focus,
                    duration: elapsed.max(Duration::zero()),
                })
            }
        }
    }
}
