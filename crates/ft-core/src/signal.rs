//! Focus-change signals delivered by the event source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Application;

/// Raw application payload as reported by the operating system.
///
/// Either part may be missing; such a payload cannot be attributed and is
/// treated as "nothing focused".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawApplication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl RawApplication {
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            display_name: Some(display_name.into()),
        }
    }

    /// Resolves to an [`Application`] if both parts are present and non-empty.
    pub fn resolve(&self) -> Option<Application> {
        Application::resolve(self.identifier.as_deref(), self.display_name.as_deref())
    }
}

/// A signal from the event source.
///
/// `at` may be omitted on the wire; the receiver then stamps the signal with
/// its own clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    /// An application became frontmost.
    FocusGained {
        #[serde(flatten)]
        application: RawApplication,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<DateTime<Utc>>,
    },
    /// The machine is about to sleep.
    SystemSuspending {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<DateTime<Utc>>,
    },
    /// The machine woke up, possibly with some application frontmost.
    SystemResumed {
        #[serde(default)]
        focused_application: Option<RawApplication>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<DateTime<Utc>>,
    },
    /// The process is shutting down.
    ProcessTerminating {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<DateTime<Utc>>,
    },
}

impl Signal {
    pub fn focus_gained(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::FocusGained {
            application: RawApplication::new(identifier, display_name),
            at: Some(at),
        }
    }

    pub const fn system_suspending(at: DateTime<Utc>) -> Self {
        Self::SystemSuspending { at: Some(at) }
    }

    pub const fn system_resumed(
        focused_application: Option<RawApplication>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::SystemResumed {
            focused_application,
            at: Some(at),
        }
    }

    pub const fn process_terminating(at: DateTime<Utc>) -> Self {
        Self::ProcessTerminating { at: Some(at) }
    }

    /// When the signal happened, if the source stamped it.
    pub const fn at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::FocusGained { at, .. }
            | Self::SystemSuspending { at }
            | Self::SystemResumed { at, .. }
            | Self::ProcessTerminating { at } => *at,
        }
    }

    /// The application that holds focus after this signal, if any.
    pub fn focused_application(&self) -> Option<Application> {
        match self {
            Self::FocusGained { application, .. } => application.resolve(),
            Self::SystemResumed {
                focused_application,
                ..
            } => focused_application.as_ref().and_then(RawApplication::resolve),
            Self::SystemSuspending { .. } | Self::ProcessTerminating { .. } => None,
        }
    }

    /// Short name for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FocusGained { .. } => "focus_gained",
            Self::SystemSuspending { .. } => "system_suspending",
            Self::SystemResumed { .. } => "system_resumed",
            Self::ProcessTerminating { .. } => "process_terminating",
        }
    }
}
