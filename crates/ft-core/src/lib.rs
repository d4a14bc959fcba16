//! Core domain logic for focus-time.
//!
//! This crate contains the fundamental types and logic for:
//! - Focus tracking: turning focus-change signals into closed intervals
//! - Aggregation: summing focused time per application over a time range
//! - Persistence contract: the [`RecordStore`] trait storage backends implement

mod aggregator;
mod error;
pub mod names;
pub mod signal;
mod service;
pub mod store;
pub mod tracker;
pub mod types;

pub use aggregator::{DEFAULT_IGNORED_APPS, UsageAggregator};
pub use error::TrackerError;
pub use names::NameDirectory;
pub use service::UsageService;
pub use signal::{RawApplication, Signal};
pub use store::{MemoryStore, RecordStore};
pub use tracker::{ClosedSpan, FocusState, FocusTracker};
pub use types::{AppId, AppUsage, Application, NameRecord, OpenFocus, UsageInterval, ValidationError};
