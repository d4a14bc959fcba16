//! CLI subcommand implementations.

pub mod report;
pub mod status;
pub mod util;
pub mod watch;
