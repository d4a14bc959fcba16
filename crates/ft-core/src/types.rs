//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// An interval ended before it started.
    #[error("interval for {app_id} ends before it starts ({start} > {end})")]
    NegativeInterval {
        app_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated application identifier.
    ///
    /// Application IDs are opaque, stable, non-empty keys such as a bundle or
    /// package identifier (e.g., "com.apple.Safari"). They join interval
    /// records to name records.
    AppId, "application ID"
);

/// An application that can hold focus, with its human-readable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: AppId,
    pub display_name: String,
}

impl Application {
    /// Builds an application from raw parts.
    ///
    /// Returns `None` when either the identifier or the display name is
    /// missing or empty, i.e. the focus cannot be attributed.
    pub fn resolve(identifier: Option<&str>, display_name: Option<&str>) -> Option<Self> {
        let id = AppId::new(identifier?).ok()?;
        let display_name = display_name.filter(|name| !name.is_empty())?;
        Some(Self {
            id,
            display_name: display_name.to_string(),
        })
    }
}

/// A closed, immutable span during which one application held focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageInterval {
    app_id: AppId,
    start: DateTime<Utc>,
    duration: Duration,
}

impl UsageInterval {
    /// Creates an interval, clamping a negative duration to zero.
    pub fn new(app_id: AppId, start: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            app_id,
            start,
            duration: duration.max(Duration::zero()),
        }
    }

    /// Creates an interval from stored start/end bounds.
    pub fn from_bounds(
        app_id: AppId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::NegativeInterval {
                app_id: app_id.into(),
                start,
                end,
            });
        }
        Ok(Self {
            app_id,
            start,
            duration: end - start,
        })
    }

    pub const fn app_id(&self) -> &AppId {
        &self.app_id
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Exclusive end of the span.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }

    /// Length of the part of this interval that falls inside `[since, to)`.
    ///
    /// Returns zero when the two do not overlap.
    pub fn overlap(&self, since: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
        let overlap = self.end().min(to) - self.start.max(since);
        overlap.max(Duration::zero())
    }
}

/// The focus span that is still accumulating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFocus {
    pub app_id: AppId,
    pub display_name: String,
    pub since: DateTime<Utc>,
}

impl OpenFocus {
    /// Starts a new focus span for `app` at `since`.
    pub fn start(app: Application, since: DateTime<Utc>) -> Self {
        Self {
            app_id: app.id,
            display_name: app.display_name,
            since,
        }
    }

    /// Synthesizes the interval this focus would close to at `now`.
    pub fn as_interval(&self, now: DateTime<Utc>) -> UsageInterval {
        UsageInterval::new(self.app_id.clone(), self.since, now - self.since)
    }
}

/// A display name stored for an application identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub app_id: AppId,
    pub display_name: String,
}

/// Total focused time of one application within a queried window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppUsage {
    pub app_id: AppId,
    pub display_name: String,
    pub duration: Duration,
}
