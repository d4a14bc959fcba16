//! Error types for the usage service.

use thiserror::Error;

use crate::types::UsageInterval;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`UsageService`](crate::UsageService).
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The startup scan of the record store failed.
    #[error("failed to load usage records")]
    Load(#[source] BoxError),

    /// Writing a closed interval failed. The interval was not added to the
    /// in-memory totals either.
    #[error(
        "failed to persist {duration_ms}ms of usage for {app_id} starting at {start}",
        app_id = .interval.app_id(),
        start = .interval.start(),
        duration_ms = .interval.duration().num_milliseconds()
    )]
    Persistence {
        interval: UsageInterval,
        #[source]
        source: BoxError,
    },
}

impl TrackerError {
    pub(crate) fn load(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Load(Box::new(source))
    }

    /// The interval that could not be persisted, if this is a persistence failure.
    pub const fn lost_interval(&self) -> Option<&UsageInterval> {
        match self {
            Self::Persistence { interval, .. } => Some(interval),
            Self::Load(_) => None,
        }
    }
}
