//! Report rendering.
//!
//! A [`ReportRenderer`] turns a fully reconstituted [`ResearchRecord`]
//! into a file artifact.

pub mod markdown;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::ResearchRecord;
use crate::error::ReportError;

pub use markdown::{MarkdownReportRenderer, render_markdown};

/// A rendered report file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    /// Full path of the written file.
    pub path: PathBuf,
    /// File name only.
    pub filename: String,
}

/// A generated report, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportArtifact {
    /// Report id (`rpt_` + 12 hex digits).
    pub report_id: String,
    /// Research the report was generated from.
    pub research_id: String,
    /// Full path of the written file.
    pub path: PathBuf,
    /// File name only.
    pub filename: String,
    /// Generation time.
    pub created_at: DateTime<Utc>,
}

/// Trait for report output formats.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Renderer name (e.g., `"markdown"`).
    fn name(&self) -> &'static str;

    /// Renders `record` into a file named after `report_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the artifact cannot be produced.
    async fn render(
        &self,
        record: &ResearchRecord,
        include_sources: bool,
        report_id: &str,
    ) -> Result<RenderedReport, ReportError>;
}
