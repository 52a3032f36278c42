//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// research-rs: resilient research pipeline.
///
/// Gathers web evidence for a topic, synthesizes a structured analysis
/// with an LLM, stores it, and renders reports from stored research.
#[derive(Parser, Debug)]
#[command(name = "research-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the research database file.
    ///
    /// Defaults to `data/research.db` in the current directory.
    #[arg(short, long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Directory that receives rendered reports.
    ///
    /// Defaults to `reports` in the current directory.
    #[arg(short, long, global = true)]
    pub reports_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a topic: search, analyze, and store the result.
    ///
    /// Requires `OPENAI_API_KEY` and `TAVILY_API_KEY`.
    #[command(after_help = r#"Examples:
  research-rs research "solid-state batteries"
  research-rs research "CRISPR delivery" --depth 5 --max-results 15
  research-rs --format json research "edge inference" | jq .research_id
"#)]
    Research {
        /// Topic to research.
        topic: String,

        /// Research depth (1-5). Out-of-range values use 3.
        #[arg(short = 'D', long, default_value = "3")]
        depth: u8,

        /// Search results to gather (clamped to the configured ceiling).
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
    },

    /// Show a stored research document.
    Show {
        /// Research ID (`res_...`).
        id: String,
    },

    /// Render a report for stored research.
    #[command(after_help = r#"Examples:
  research-rs report res_0123456789ab
  research-rs report res_0123456789ab --no-sources
  research-rs --reports-dir ./out report res_0123456789ab
"#)]
    Report {
        /// Research ID (`res_...`).
        id: String,

        /// Omit the sources section.
        #[arg(long)]
        no_sources: bool,
    },

    /// Find stored research similar to a query.
    Similar {
        /// Query text.
        query: String,

        /// Maximum number of results.
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },

    /// List stored research, newest first.
    #[command(alias = "ls")]
    History {
        /// Maximum number of entries (0 lists all).
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show store and pipeline status.
    Status,

    /// Write default prompt templates for customization.
    #[command(after_help = r#"Examples:
  research-rs init-prompts                 # ~/.config/research-rs/prompts
  research-rs init-prompts --dir ./prompts
"#)]
    InitPrompts {
        /// Target directory (defaults to the user config directory).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}
