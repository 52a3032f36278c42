//! Research store: maps research records onto a [`DocumentStore`].
//!
//! Each record becomes one document whose text concatenates topic, summary,
//! findings and raw content (in that order, blank-line separated) plus a
//! flat metadata map carrying everything needed to rebuild the record.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use tracing::{debug, info};

use super::traits::{DocumentStore, DocumentSummary, Metadata, ScoredDocument, StoredDocument};
use crate::core::{DetailedAnalysis, ResearchRecord, ResearchStatus};
use crate::error::StoreError;

const TOPIC_LABEL: &str = "Topic: ";
const SUMMARY_LABEL: &str = "\n\nSummary: ";
const FINDINGS_LABEL: &str = "\n\nKey Findings: ";
const CONTENT_LABEL: &str = "\n\nContent: ";

/// Metadata keys written for every record.
pub mod keys {
    /// Research id.
    pub const RESEARCH_ID: &str = "research_id";
    /// Research topic.
    pub const TOPIC: &str = "topic";
    /// Executive summary, verbatim.
    pub const SUMMARY: &str = "summary";
    /// Lifecycle status.
    pub const STATUS: &str = "status";
    /// Creation timestamp (RFC 3339, UTC).
    pub const CREATED_AT: &str = "created_at";
    /// Last update timestamp (RFC 3339, UTC).
    pub const UPDATED_AT: &str = "updated_at";
    /// Model identifier.
    pub const MODEL_USED: &str = "model_used";
    /// JSON array of key findings.
    pub const KEY_FINDINGS: &str = "key_findings";
    /// JSON-encoded detailed analysis.
    pub const DETAILED_ANALYSIS: &str = "detailed_analysis";
    /// JSON array of source URLs.
    pub const SOURCES: &str = "sources";
}

/// Persists, looks up and lists research records.
#[derive(Clone)]
pub struct ResearchStore {
    backend: Arc<dyn DocumentStore>,
}

impl ResearchStore {
    /// Wraps a document store backend.
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self { backend }
    }

    /// Persists `record` under its research id with a single add.
    ///
    /// Existence is not pre-checked; an id collision is reported by the backend.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persist`] wrapping the backend failure.
    pub async fn store_research(&self, record: &ResearchRecord) -> Result<(), StoreError> {
        let id = record.research_id.as_str();
        let persist = |source: StoreError| StoreError::Persist {
            id: id.to_string(),
            source: Box::new(source),
        };

        let document = build_document(record);
        let metadata = build_metadata(record).map_err(persist)?;
        self.backend
            .add(id, &document, &metadata)
            .await
            .map_err(persist)?;

        info!(research_id = %id, backend = self.backend.name(), "research stored");
        Ok(())
    }

    /// Looks up a stored research document. A missing id yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Retrieval`] on backend failure.
    pub async fn get_research(&self, research_id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let found = self.backend.get(research_id).await.map_err(retrieval)?;
        debug!(research_id, found = found.is_some(), "research lookup");
        Ok(found)
    }

    /// Returns up to `n` stored documents most similar to `query`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Retrieval`] on backend failure.
    pub async fn search_similar(&self, query: &str, n: usize) -> Result<Vec<ScoredDocument>, StoreError> {
        let results = self.backend.query(query, n).await.map_err(retrieval)?;
        debug!(query, n, returned = results.len(), "similarity query");
        Ok(results)
    }

    /// Lists stored research newest first, truncated to `limit` if given.
    /// A limit of zero lists everything.
    ///
    /// Ordering is by the `created_at` metadata string; a missing value
    /// sorts as the empty string, i.e. last.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Retrieval`] on backend failure.
    pub async fn get_all_research(&self, limit: Option<usize>) -> Result<Vec<DocumentSummary>, StoreError> {
        let mut all = self.backend.list_all().await.map_err(retrieval)?;
        all.sort_by(|a, b| created_at_key(b).cmp(created_at_key(a)));
        if let Some(limit) = limit.filter(|&n| n > 0) {
            all.truncate(limit);
        }
        Ok(all)
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Retrieval`] on backend failure.
    pub async fn count(&self) -> Result<usize, StoreError> {
        self.backend.count().await.map_err(retrieval)
    }
}

impl std::fmt::Debug for ResearchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchStore")
            .field("backend", &self.backend.name())
            .finish()
    }
}

fn retrieval(source: StoreError) -> StoreError {
    StoreError::Retrieval {
        source: Box::new(source),
    }
}

fn created_at_key(summary: &DocumentSummary) -> &str {
    summary
        .metadata
        .get(keys::CREATED_AT)
        .map_or("", String::as_str)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses an RFC 3339 timestamp, or a naive ISO-8601 one taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Builds the indexed document text for a record.
///
/// Deterministic: identical records always produce identical text.
#[must_use]
pub fn build_document(record: &ResearchRecord) -> String {
    let mut document = document_prefix(&record.topic, &record.summary, &record.key_findings);
    document.push_str(&record.raw_content);
    document
}

/// Everything in the document text up to the raw content.
fn document_prefix(topic: &str, summary: &str, key_findings: &[String]) -> String {
    format!(
        "{TOPIC_LABEL}{topic}{SUMMARY_LABEL}{summary}{FINDINGS_LABEL}{}{CONTENT_LABEL}",
        key_findings.join(", ")
    )
}

/// Builds the flat metadata map stored alongside the document.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if a structured field cannot be encoded.
pub fn build_metadata(record: &ResearchRecord) -> Result<Metadata, StoreError> {
    let mut metadata = Metadata::new();
    metadata.insert(keys::RESEARCH_ID.to_string(), record.research_id.clone());
    metadata.insert(keys::TOPIC.to_string(), record.topic.clone());
    metadata.insert(keys::SUMMARY.to_string(), record.summary.clone());
    metadata.insert(keys::STATUS.to_string(), record.status.as_str().to_string());
    metadata.insert(keys::CREATED_AT.to_string(), format_timestamp(&record.created_at));
    metadata.insert(keys::UPDATED_AT.to_string(), format_timestamp(&record.updated_at));
    if let Some(model) = &record.model_used {
        metadata.insert(keys::MODEL_USED.to_string(), model.clone());
    }
    metadata.insert(
        keys::KEY_FINDINGS.to_string(),
        serde_json::to_string(&record.key_findings)?,
    );
    metadata.insert(
        keys::DETAILED_ANALYSIS.to_string(),
        serde_json::to_string(&record.detailed_analysis)?,
    );
    metadata.insert(
        keys::SOURCES.to_string(),
        serde_json::to_string(&record.sources)?,
    );
    Ok(metadata)
}

/// Document text split back into its labelled sections.
struct DocumentSections<'a> {
    topic: &'a str,
    summary: &'a str,
    findings: &'a str,
    content: &'a str,
}

fn split_document(document: &str) -> Option<DocumentSections<'_>> {
    let rest = document.strip_prefix(TOPIC_LABEL)?;
    let (topic, rest) = rest.split_once(SUMMARY_LABEL)?;
    let (summary, rest) = rest.split_once(FINDINGS_LABEL)?;
    let (findings, content) = rest.split_once(CONTENT_LABEL)?;
    Some(DocumentSections {
        topic,
        summary,
        findings,
        content,
    })
}

/// Extracts the summary embedded in a stored document's text.
///
/// Falls back to the first paragraph after the summary label for
/// documents that do not follow the full section layout.
#[must_use]
pub fn extract_summary(document: &str) -> Option<String> {
    if let Some(sections) = split_document(document) {
        return Some(sections.summary.to_string());
    }
    let (_, after) = document.split_once("Summary: ")?;
    Some(after.split("\n\n").next().unwrap_or_default().to_string())
}

/// Rebuilds a full [`ResearchRecord`] from a stored document.
///
/// Fields come from metadata where present. Documents written without a
/// `summary` key fall back to the summary embedded in the text, and raw
/// content is whatever follows the rebuilt section prefix.
///
/// # Errors
///
/// Returns [`StoreError::Corrupt`] if the topic or creation time cannot be
/// recovered, or [`StoreError::Serialization`] if a JSON field is malformed.
pub fn reconstitute(stored: &StoredDocument) -> Result<ResearchRecord, StoreError> {
    let sections = split_document(&stored.document);
    let meta = |key: &str| stored.metadata.get(key).map(String::as_str);

    let topic = meta(keys::TOPIC)
        .or_else(|| sections.as_ref().map(|s| s.topic))
        .ok_or_else(|| StoreError::Corrupt {
            message: format!("research {} has no topic", stored.id),
        })?
        .to_string();

    let summary = match meta(keys::SUMMARY) {
        Some(summary) => summary.to_string(),
        None => extract_summary(&stored.document).unwrap_or_default(),
    };

    let key_findings: Vec<String> = match meta(keys::KEY_FINDINGS) {
        Some(raw) => serde_json::from_str(raw)?,
        None => sections
            .as_ref()
            .map(|s| s.findings)
            .filter(|f| !f.is_empty())
            .map(|f| f.split(", ").map(str::to_string).collect())
            .unwrap_or_default(),
    };

    let detailed_analysis = match meta(keys::DETAILED_ANALYSIS) {
        Some(raw) => serde_json::from_str(raw)?,
        None => DetailedAnalysis::from_summary(&summary),
    };

    let sources: Vec<String> = match meta(keys::SOURCES) {
        Some(raw) => serde_json::from_str(raw)?,
        None => Vec::new(),
    };

    let raw_content = stored
        .document
        .strip_prefix(document_prefix(&topic, &summary, &key_findings).as_str())
        .or_else(|| sections.as_ref().map(|s| s.content))
        .unwrap_or_default()
        .to_string();

    let status = meta(keys::STATUS)
        .and_then(ResearchStatus::parse)
        .unwrap_or(ResearchStatus::Completed);

    let created_at = meta(keys::CREATED_AT)
        .and_then(parse_timestamp)
        .ok_or_else(|| StoreError::Corrupt {
            message: format!("research {} has no valid created_at", stored.id),
        })?;
    let updated_at = meta(keys::UPDATED_AT)
        .and_then(parse_timestamp)
        .unwrap_or(created_at);

    Ok(ResearchRecord {
        research_id: meta(keys::RESEARCH_ID).unwrap_or(stored.id.as_str()).to_string(),
        topic,
        status,
        summary,
        key_findings,
        detailed_analysis,
        sources,
        raw_content,
        model_used: meta(keys::MODEL_USED).map(str::to_string),
        created_at,
        updated_at,
    })
}
