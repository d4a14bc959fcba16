//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Application focus time tracker.
///
/// Records which application holds focus and reports how long each one was
/// used.
#[derive(Debug, Parser)]
#[command(name = "ft", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track focus from JSON signals read on stdin, one per line.
    ///
    /// Stops at end of input or on a `process_terminating` signal, closing
    /// the open focus either way.
    Watch,

    /// Show time spent per application.
    Report(ReportArgs),

    /// Show what has been recorded so far.
    Status,
}

/// Arguments for `ft report`.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Start of the range (RFC 3339 or e.g. "2 hours ago").
    #[arg(long, conflicts_with_all = ["day", "last_day", "week", "days"])]
    pub since: Option<String>,

    /// End of the range (RFC 3339, "now", or e.g. "30 minutes ago"). Defaults to now.
    #[arg(long, requires = "since")]
    pub to: Option<String>,

    /// Report today (default).
    #[arg(long, conflicts_with_all = ["last_day", "week", "days"])]
    pub day: bool,

    /// Report yesterday.
    #[arg(long, conflicts_with_all = ["week", "days"])]
    pub last_day: bool,

    /// Report the current week (Monday to Sunday).
    #[arg(long, conflicts_with = "days")]
    pub week: bool,

    /// Report each of the last N days separately, today included.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=366))]
    pub days: Option<u32>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}
