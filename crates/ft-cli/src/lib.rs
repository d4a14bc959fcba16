//! Focus tracker CLI library.
//!
//! This crate provides the CLI interface for focus-time.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, ReportArgs};
pub use config::Config;
