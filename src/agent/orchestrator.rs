//! Orchestrator for the research pipeline.
//!
//! Coordinates the full flow for one topic: search → context → analysis →
//! record assembly → persistence. Read-side operations (lookup, similarity,
//! history, reports) live on [`ResearchLibrary`] so they work without any
//! remote credentials.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::create_provider;
use super::prompt::PromptSet;
use super::synthesizer::AnalysisSynthesizer;
use crate::config::ResearchConfig;
use crate::core::{ResearchRecord, generate_report_id, generate_research_id};
use crate::error::{Error, Result};
use crate::report::{MarkdownReportRenderer, ReportArtifact, ReportRenderer};
use crate::search::{EvidenceGatherer, create_search_provider};
use crate::storage::{
    DocumentSummary, ResearchStore, ScoredDocument, SqliteDocumentStore, StoredDocument,
    reconstitute,
};

/// Longest accepted topic, in characters.
pub const MAX_TOPIC_CHARS: usize = 500;

/// Validates and normalizes a research topic.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for a blank or over-long topic.
pub fn validate_topic(topic: &str) -> Result<&str> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(Error::InvalidInput {
            message: "topic cannot be empty".to_string(),
        });
    }
    let chars = topic.chars().count();
    if chars > MAX_TOPIC_CHARS {
        return Err(Error::InvalidInput {
            message: format!("topic is {chars} characters, max {MAX_TOPIC_CHARS}"),
        });
    }
    Ok(topic)
}

/// Stored research: lookup, similarity search, history, and reports.
#[derive(Clone)]
pub struct ResearchLibrary {
    store: ResearchStore,
    renderer: Arc<dyn ReportRenderer>,
}

impl ResearchLibrary {
    /// Creates a library over the given store and report renderer.
    #[must_use]
    pub fn new(store: ResearchStore, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { store, renderer }
    }

    /// Opens the configured `SQLite` store and Markdown renderer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the database cannot be opened.
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let backend = SqliteDocumentStore::open(&config.db_path)?;
        Ok(Self::new(
            ResearchStore::new(Arc::new(backend)),
            Arc::new(MarkdownReportRenderer::new(&config.reports_dir)),
        ))
    }

    /// Underlying research store.
    #[must_use]
    pub const fn store(&self) -> &ResearchStore {
        &self.store
    }

    /// Looks up stored research. `None` means the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on backend failure.
    pub async fn get_research(&self, research_id: &str) -> Result<Option<StoredDocument>> {
        Ok(self.store.get_research(research_id).await?)
    }

    /// Looks up and fully reconstitutes a research record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on backend failure or corrupt stored data.
    pub async fn get_record(&self, research_id: &str) -> Result<Option<ResearchRecord>> {
        match self.store.get_research(research_id).await? {
            Some(stored) => Ok(Some(reconstitute(&stored)?)),
            None => Ok(None),
        }
    }

    /// Renders a report for stored research. `None` means the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the record cannot be loaded, or
    /// [`Error::Report`] if rendering fails.
    pub async fn assemble_report(
        &self,
        research_id: &str,
        include_sources: bool,
    ) -> Result<Option<ReportArtifact>> {
        let Some(record) = self.get_record(research_id).await? else {
            debug!(research_id, "report requested for unknown research");
            return Ok(None);
        };

        let report_id = generate_report_id();
        let rendered = self
            .renderer
            .render(&record, include_sources, &report_id)
            .await?;

        info!(
            research_id,
            report_id = %report_id,
            renderer = self.renderer.name(),
            "report assembled"
        );
        Ok(Some(ReportArtifact {
            report_id,
            research_id: record.research_id,
            path: rendered.path,
            filename: rendered.filename,
            created_at: Utc::now(),
        }))
    }

    /// Returns up to `limit` stored documents most similar to `query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank query, or [`Error::Store`]
    /// on backend failure.
    pub async fn find_similar(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput {
                message: "query cannot be empty".to_string(),
            });
        }
        Ok(self.store.search_similar(query.trim(), limit).await?)
    }

    /// Lists stored research newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on backend failure.
    pub async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<DocumentSummary>> {
        Ok(self.store.get_all_research(limit).await?)
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on backend failure.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.count().await?)
    }
}

impl std::fmt::Debug for ResearchLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchLibrary")
            .field("store", &self.store)
            .field("renderer", &self.renderer.name())
            .finish()
    }
}

/// Runs research requests end to end.
///
/// Collaborators are injected so tests can substitute fakes; use
/// [`ResearchOrchestrator::from_config`] for the production wiring.
#[derive(Debug, Clone)]
pub struct ResearchOrchestrator {
    gatherer: Arc<EvidenceGatherer>,
    synthesizer: Arc<AnalysisSynthesizer>,
    library: ResearchLibrary,
}

impl ResearchOrchestrator {
    /// Creates an orchestrator from explicit collaborators.
    #[must_use]
    pub fn new(
        gatherer: Arc<EvidenceGatherer>,
        synthesizer: Arc<AnalysisSynthesizer>,
        library: ResearchLibrary,
    ) -> Self {
        Self {
            gatherer,
            synthesizer,
            library,
        }
    }

    /// Wires the configured search provider, LLM provider, store and renderer.
    ///
    /// # Errors
    ///
    /// Returns an error if an API key is missing, the provider is unknown,
    /// or the store cannot be opened.
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let search_provider = create_search_provider(config)?;
        let llm = create_provider(config)?;
        let prompts = PromptSet::load(config.prompt_dir.as_deref());

        Ok(Self::new(
            Arc::new(EvidenceGatherer::new(search_provider, config)),
            Arc::new(AnalysisSynthesizer::new(llm, config, &prompts)),
            ResearchLibrary::from_config(config)?,
        ))
    }

    /// Read-side operations over the same store.
    #[must_use]
    pub const fn library(&self) -> &ResearchLibrary {
        &self.library
    }

    /// Evidence gatherer (exposes cache controls).
    #[must_use]
    pub fn gatherer(&self) -> &EvidenceGatherer {
        &self.gatherer
    }

    /// Researches `topic` and persists the completed record.
    ///
    /// `depth` outside 1-5 falls back to 3; `max_results` is clamped to the
    /// configured ceiling. A failed stage stores nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a bad topic, [`Error::Search`] if
    /// evidence gathering fails, [`Error::Agent`] if analysis fails, or
    /// [`Error::Store`] if persistence fails.
    pub async fn run_research(
        &self,
        topic: &str,
        depth: u8,
        max_results: Option<usize>,
    ) -> Result<ResearchRecord> {
        let topic = validate_topic(topic)?;
        let research_id = generate_research_id();
        let start = Instant::now();
        info!(research_id = %research_id, topic, depth, "research started");

        let results = self.gatherer.search(topic, max_results, true).await?;
        let context = self.gatherer.get_context(topic, max_results).await?;
        if results.is_empty() {
            warn!(research_id = %research_id, "no search results, analyzing without evidence");
        }

        let analysis = self
            .synthesizer
            .analyze_topic(topic, Some(&context), depth)
            .await?;

        let record = ResearchRecord::completed(research_id, topic, analysis, &results, context);
        self.library.store.store_research(&record).await?;

        info!(
            research_id = %record.research_id,
            sources = record.sources.len(),
            findings = record.key_findings.len(),
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "research completed"
        );
        Ok(record)
    }

    /// Runs [`ResearchOrchestrator::run_research`] on its own task.
    #[must_use]
    pub fn spawn_research(
        self: &Arc<Self>,
        topic: String,
        depth: u8,
        max_results: Option<usize>,
    ) -> JoinHandle<Result<ResearchRecord>> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_research(&topic, depth, max_results).await })
    }

    /// See [`ResearchLibrary::assemble_report`].
    ///
    /// # Errors
    ///
    /// Propagates library errors.
    pub async fn assemble_report(
        &self,
        research_id: &str,
        include_sources: bool,
    ) -> Result<Option<ReportArtifact>> {
        self.library
            .assemble_report(research_id, include_sources)
            .await
    }

    /// See [`ResearchLibrary::find_similar`].
    ///
    /// # Errors
    ///
    /// Propagates library errors.
    pub async fn find_similar(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>> {
        self.library.find_similar(query, limit).await
    }

    /// See [`ResearchLibrary::list_recent`].
    ///
    /// # Errors
    ///
    /// Propagates library errors.
    pub async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<DocumentSummary>> {
        self.library.list_recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_topic_trims() {
        assert_eq!(validate_topic("  Rust  ").unwrap_or_default(), "Rust");
    }

    #[test]
    fn test_validate_topic_rejects_blank() {
        assert!(matches!(
            validate_topic("   "),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_validate_topic_length_in_chars() {
        let ok = "é".repeat(MAX_TOPIC_CHARS);
        assert!(validate_topic(&ok).is_ok());
        let too_long = "a".repeat(MAX_TOPIC_CHARS + 1);
        assert!(matches!(
            validate_topic(&too_long),
            Err(Error::InvalidInput { .. })
        ));
    }
}
