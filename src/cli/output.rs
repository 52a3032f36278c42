//! Output formatting for CLI commands.

#![allow(clippy::format_push_string)]

use std::path::Path;

use serde::Serialize;
use serde_json::json;

use crate::core::ResearchRecord;
use crate::report::ReportArtifact;
use crate::storage::research::keys;
use crate::storage::{DocumentSummary, ScoredDocument, StoredDocument};

/// Longest summary shown in list views before eliding.
const PREVIEW_CHARS: usize = 120;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// One compact JSON document per line.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes `value` in this format, newline-terminated.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let body = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        let mut out = body.unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
        out.push('\n');
        out
    }
}

fn preview(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut.trim_end())
}

fn meta<'a>(metadata: &'a crate::storage::Metadata, key: &str) -> &'a str {
    metadata.get(key).map_or("", String::as_str)
}

/// Formats a freshly completed research record.
#[must_use]
pub fn format_record(record: &ResearchRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = format!("Research ID: {}\n", record.research_id);
            out.push_str(&format!("Topic:       {}\n", record.topic));
            out.push_str(&format!("Status:      {}\n", record.status));
            if let Some(model) = &record.model_used {
                out.push_str(&format!("Model:       {model}\n"));
            }
            out.push_str(&format!("Sources:     {}\n\n", record.sources.len()));
            out.push_str(&format!("Summary:\n  {}\n", record.summary.trim()));
            if !record.key_findings.is_empty() {
                out.push_str("\nKey findings:\n");
                for (i, finding) in record.key_findings.iter().enumerate() {
                    out.push_str(&format!("  {}. {finding}\n", i + 1));
                }
            }
            out
        }
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(record),
    }
}

/// Formats a stored research document.
#[must_use]
pub fn format_stored(doc: &StoredDocument, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = format!("Research ID: {}\n", doc.id);
            for key in [keys::TOPIC, keys::STATUS, keys::CREATED_AT, keys::MODEL_USED] {
                if let Some(value) = doc.metadata.get(key) {
                    out.push_str(&format!("{key}: {value}\n"));
                }
            }
            out.push('\n');
            out.push_str(&doc.document);
            out.push('\n');
            out
        }
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(doc),
    }
}

/// Formats a generated report artifact.
#[must_use]
pub fn format_report(artifact: &ReportArtifact, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "Report {} written for {}\n  {}\n",
            artifact.report_id,
            artifact.research_id,
            artifact.path.display()
        ),
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(artifact),
    }
}

/// Formats similarity search results.
#[must_use]
pub fn format_similar(query: &str, results: &[ScoredDocument], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if results.is_empty() {
                return format!("No stored research matches \"{query}\".\n");
            }
            let mut out = format!("Results for \"{query}\":\n\n");
            for (i, hit) in results.iter().enumerate() {
                out.push_str(&format!(
                    "{}. {} (distance {:.3})\n   {}\n",
                    i + 1,
                    hit.document.id,
                    hit.distance,
                    meta(&hit.document.metadata, keys::TOPIC)
                ));
            }
            out
        }
        OutputFormat::Json => format.to_json(&json!({
            "query": query,
            "count": results.len(),
            "results": results,
        })),
        OutputFormat::Ndjson => results.iter().map(|r| format.to_json(r)).collect(),
    }
}

/// Formats the research history listing.
#[must_use]
pub fn format_history(entries: &[DocumentSummary], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if entries.is_empty() {
                return "No research stored yet.\n".to_string();
            }
            let mut out = String::new();
            for entry in entries {
                out.push_str(&format!(
                    "{}  {}  {}\n",
                    entry.id,
                    meta(&entry.metadata, keys::CREATED_AT),
                    preview(meta(&entry.metadata, keys::TOPIC))
                ));
            }
            out
        }
        OutputFormat::Json => format.to_json(&json!({
            "count": entries.len(),
            "research": entries,
        })),
        OutputFormat::Ndjson => entries.iter().map(|e| format.to_json(e)).collect(),
    }
}

/// Store and pipeline status.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport<'a> {
    /// Database path.
    pub db_path: &'a Path,
    /// Reports directory.
    pub reports_dir: &'a Path,
    /// Stored research count.
    pub research_count: usize,
    /// Search cache time-to-live in seconds.
    pub cache_ttl_secs: u64,
    /// Generation model.
    pub model: &'a str,
}

/// Formats the status report.
#[must_use]
pub fn format_status(status: &StatusReport<'_>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "Database:    {}\nReports:     {}\nResearch:    {}\nCache TTL:   {}s\nModel:       {}\n",
            status.db_path.display(),
            status.reports_dir.display(),
            status.research_count,
            status.cache_ttl_secs,
            status.model
        ),
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(status),
    }
}
