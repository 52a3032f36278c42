//! CLI command implementations.
//!
//! Each command builds the collaborators it needs and bridges into the
//! async core with a dedicated tokio runtime. Read-only commands only open
//! the store, so they run without API keys.

#![allow(clippy::uninlined_format_args)]

use std::future::Future;
use std::path::Path;

use tracing::debug;

use crate::agent::prompt::PromptSet;
use crate::agent::{ResearchLibrary, ResearchOrchestrator};
use crate::cli::output::{
    OutputFormat, StatusReport, format_history, format_record, format_report, format_similar,
    format_status, format_stored,
};
use crate::cli::parser::{Cli, Commands};
use crate::config::ResearchConfig;
use crate::error::{Error, Result};

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the command fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Research {
            topic,
            depth,
            max_results,
        } => cmd_research(&resolve_config(cli)?, topic, *depth, *max_results, format),
        Commands::Show { id } => cmd_show(&resolve_config(cli)?, id, format),
        Commands::Report { id, no_sources } => {
            cmd_report(&resolve_config(cli)?, id, !*no_sources, format)
        }
        Commands::Similar { query, top_k } => {
            cmd_similar(&resolve_config(cli)?, query, *top_k, format)
        }
        Commands::History { limit } => cmd_history(&resolve_config(cli)?, *limit, format),
        Commands::Status => cmd_status(&resolve_config(cli)?, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Resolves configuration: CLI flags, then environment, then defaults.
fn resolve_config(cli: &Cli) -> Result<ResearchConfig> {
    let mut builder = ResearchConfig::builder();
    if let Some(path) = &cli.db_path {
        builder = builder.db_path(path);
    }
    if let Some(dir) = &cli.reports_dir {
        builder = builder.reports_dir(dir);
    }
    let config = builder.from_env().build()?;
    debug!(db_path = %config.db_path.display(), "configuration resolved");
    Ok(config)
}

/// Runs `fut` to completion on a fresh multi-thread runtime.
fn block_on<T>(fut: impl Future<Output = Result<T>>) -> Result<T> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| Error::Command {
        message: format!("Failed to create async runtime: {e}"),
    })?;
    rt.block_on(fut)
}

fn not_found(id: &str) -> Error {
    Error::Command {
        message: format!("research not found: {id}"),
    }
}

fn cmd_research(
    config: &ResearchConfig,
    topic: &str,
    depth: u8,
    max_results: Option<usize>,
    format: OutputFormat,
) -> Result<String> {
    let orchestrator = ResearchOrchestrator::from_config(config)?;
    let record = block_on(orchestrator.run_research(topic, depth, max_results))?;
    Ok(format_record(&record, format))
}

fn cmd_show(config: &ResearchConfig, id: &str, format: OutputFormat) -> Result<String> {
    let library = ResearchLibrary::from_config(config)?;
    let doc = block_on(library.get_research(id))?.ok_or_else(|| not_found(id))?;
    Ok(format_stored(&doc, format))
}

fn cmd_report(
    config: &ResearchConfig,
    id: &str,
    include_sources: bool,
    format: OutputFormat,
) -> Result<String> {
    let library = ResearchLibrary::from_config(config)?;
    let artifact =
        block_on(library.assemble_report(id, include_sources))?.ok_or_else(|| not_found(id))?;
    Ok(format_report(&artifact, format))
}

fn cmd_similar(
    config: &ResearchConfig,
    query: &str,
    top_k: usize,
    format: OutputFormat,
) -> Result<String> {
    let library = ResearchLibrary::from_config(config)?;
    let results = block_on(library.find_similar(query, top_k))?;
    Ok(format_similar(query, &results, format))
}

fn cmd_history(config: &ResearchConfig, limit: usize, format: OutputFormat) -> Result<String> {
    let library = ResearchLibrary::from_config(config)?;
    let entries = block_on(library.list_recent(Some(limit)))?;
    Ok(format_history(&entries, format))
}

fn cmd_status(config: &ResearchConfig, format: OutputFormat) -> Result<String> {
    let library = ResearchLibrary::from_config(config)?;
    let research_count = block_on(library.count())?;
    let status = StatusReport {
        db_path: &config.db_path,
        reports_dir: &config.reports_dir,
        research_count,
        cache_ttl_secs: config.cache_ttl.as_secs(),
        model: &config.model,
    };
    Ok(format_status(&status, format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| Error::Command {
            message: "Could not determine home directory for default prompt path".to_string(),
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| Error::Command {
        message: format!("Failed to write prompt templates: {e}"),
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str("  ");
                output.push_str(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown"),
                );
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize the analysis prompt.\n");
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}
