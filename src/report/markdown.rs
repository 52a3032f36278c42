//! Markdown report renderer.

use std::fmt::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use super::{RenderedReport, ReportRenderer};
use crate::core::{DetailedAnalysis, ResearchRecord};
use crate::error::ReportError;

/// Writes reports as Markdown files into a directory.
#[derive(Debug, Clone)]
pub struct MarkdownReportRenderer {
    reports_dir: PathBuf,
}

impl MarkdownReportRenderer {
    /// Creates a renderer writing into `reports_dir` (created on demand).
    #[must_use]
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    /// Output directory.
    #[must_use]
    pub fn reports_dir(&self) -> &std::path::Path {
        &self.reports_dir
    }
}

/// Report file name: `report_{id}_{YYYYmmdd_HHMMSS}.md`.
#[must_use]
pub fn report_filename(report_id: &str, at: &DateTime<Utc>) -> String {
    format!("report_{report_id}_{}.md", at.format("%Y%m%d_%H%M%S"))
}

/// Renders a record as a Markdown document.
#[must_use]
pub fn render_markdown(
    record: &ResearchRecord,
    include_sources: bool,
    generated_at: &DateTime<Utc>,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}\n", record.topic);
    let _ = writeln!(
        out,
        "**Generated:** {}  ",
        generated_at.format("%B %d, %Y at %I:%M %p UTC")
    );
    let _ = writeln!(out, "**Research ID:** {}\n", record.research_id);

    out.push_str("## Executive Summary\n\n");
    if record.summary.trim().is_empty() {
        out.push_str("No summary available.\n\n");
    } else {
        let _ = writeln!(out, "{}\n", record.summary.trim());
    }

    if !record.key_findings.is_empty() {
        out.push_str("## Key Findings\n\n");
        for (i, finding) in record.key_findings.iter().enumerate() {
            let _ = writeln!(out, "{}. {finding}", i + 1);
        }
        out.push('\n');
    }

    if !record.detailed_analysis.is_empty() {
        out.push_str("## Detailed Analysis\n\n");
        match &record.detailed_analysis {
            DetailedAnalysis::Sectioned(sections) => {
                for section in sections {
                    let _ = writeln!(out, "### {}\n\n{}\n", section.title, section.body.trim());
                }
            }
            DetailedAnalysis::Freeform(text) => {
                let _ = writeln!(out, "{}\n", text.trim());
            }
        }
    }

    if include_sources && !record.sources.is_empty() {
        out.push_str("---\n\n## Sources & References\n\n");
        for (i, source) in record.sources.iter().enumerate() {
            let _ = writeln!(out, "{}. {source}", i + 1);
        }
    }

    out
}

#[async_trait]
impl ReportRenderer for MarkdownReportRenderer {
    fn name(&self) -> &'static str {
        "markdown"
    }

    async fn render(
        &self,
        record: &ResearchRecord,
        include_sources: bool,
        report_id: &str,
    ) -> Result<RenderedReport, ReportError> {
        let now = Utc::now();
        let filename = report_filename(report_id, &now);
        let path = self.reports_dir.join(&filename);
        let body = render_markdown(record, include_sources, &now);

        tokio::fs::create_dir_all(&self.reports_dir).await?;
        tokio::fs::write(&path, body).await?;

        info!(
            report_id,
            research_id = %record.research_id,
            path = %path.display(),
            "report written"
        );
        Ok(RenderedReport { path, filename })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::core::{AnalysisSection, ResearchStatus};

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .unwrap_or_else(|| unreachable!())
    }

    fn record() -> ResearchRecord {
        ResearchRecord {
            research_id: "res_0123456789ab".to_string(),
            topic: "Fusion energy".to_string(),
            status: ResearchStatus::Completed,
            summary: "Net gain achieved.".to_string(),
            key_findings: vec!["Ignition in 2022".to_string(), "Costs remain high".to_string()],
            detailed_analysis: DetailedAnalysis::Sectioned(vec![
                AnalysisSection {
                    title: "Background".to_string(),
                    body: "Decades of work.".to_string(),
                },
                AnalysisSection {
                    title: "Outlook".to_string(),
                    body: "Commercial plants by 2040.".to_string(),
                },
            ]),
            sources: vec!["https://a.example".to_string(), "https://b.example".to_string()],
            raw_content: String::new(),
            model_used: None,
            created_at: generated_at(),
            updated_at: generated_at(),
        }
    }

    #[test]
    fn test_filename_format() {
        assert_eq!(
            report_filename("rpt_abc", &generated_at()),
            "report_rpt_abc_20240309_140507.md"
        );
    }

    #[test]
    fn test_render_sections_in_order() {
        let md = render_markdown(&record(), true, &generated_at());
        let order = [
            "# Fusion energy",
            "**Research ID:** res_0123456789ab",
            "## Executive Summary",
            "## Key Findings",
            "1. Ignition in 2022",
            "2. Costs remain high",
            "## Detailed Analysis",
            "### Background",
            "### Outlook",
            "## Sources & References",
            "2. https://b.example",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|needle| md.find(needle).unwrap_or(usize::MAX))
            .collect();
        assert!(positions.iter().all(|&p| p != usize::MAX), "{md}");
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{md}");
    }

    #[test]
    fn test_render_without_sources() {
        let md = render_markdown(&record(), false, &generated_at());
        assert!(!md.contains("Sources & References"));
    }

    #[test]
    fn test_render_freeform_analysis() {
        let mut rec = record();
        rec.detailed_analysis = DetailedAnalysis::Freeform("One long essay.".to_string());
        let md = render_markdown(&rec, false, &generated_at());
        assert!(md.contains("## Detailed Analysis\n\nOne long essay."));
        assert!(!md.contains("###"));
    }

    #[tokio::test]
    async fn test_render_writes_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let renderer = MarkdownReportRenderer::new(dir.path().join("reports"));
        let rendered = renderer
            .render(&record(), true, "rpt_0123456789ab")
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(rendered.filename.starts_with("report_rpt_0123456789ab_"));
        assert!(rendered.filename.ends_with(".md"));
        let body = tokio::fs::read_to_string(&rendered.path)
            .await
            .unwrap_or_default();
        assert!(body.contains("Net gain achieved."));
    }
}
