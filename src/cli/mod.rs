//! CLI layer for research-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! running research, browsing stored results, and rendering reports.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
