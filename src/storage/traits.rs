//! Document store abstraction.
//!
//! A document store keeps text documents keyed by id, each with a flat
//! string metadata map, and answers similarity queries over the text.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Flat string metadata attached to a document.
pub type Metadata = BTreeMap<String, String>;

/// A document as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Document id (the research id).
    pub id: String,
    /// Indexed document text.
    pub document: String,
    /// Attached metadata.
    pub metadata: Metadata,
}

/// A document paired with its distance from a query (smaller is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// The matching document.
    #[serde(flatten)]
    pub document: StoredDocument,
    /// Distance from the query in `[0.0, 1.0]`.
    pub distance: f64,
}

/// Id and metadata of a stored document, without its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document id.
    pub id: String,
    /// Attached metadata.
    pub metadata: Metadata,
}

/// Trait for document store backends.
///
/// Ranking in [`DocumentStore::query`] is entirely the backend's concern.
/// Whether adding an existing id overwrites or fails is also backend-defined.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name (e.g., `"sqlite"`).
    fn name(&self) -> &'static str;

    /// Adds a document.
    async fn add(&self, id: &str, document: &str, metadata: &Metadata) -> Result<(), StoreError>;

    /// Fetches a document by id, or `None` if absent.
    async fn get(&self, id: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// Returns up to `n` documents closest to `text`, nearest first.
    async fn query(&self, text: &str, n: usize) -> Result<Vec<ScoredDocument>, StoreError>;

    /// Lists the id and metadata of every document, in unspecified order.
    async fn list_all(&self) -> Result<Vec<DocumentSummary>, StoreError>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize, StoreError>;
}
