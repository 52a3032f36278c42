//! Research persistence: document store backends and the research store.

pub mod research;
pub mod similarity;
pub mod sqlite;
pub mod traits;

pub use research::{ResearchStore, build_document, build_metadata, extract_summary, reconstitute};
pub use sqlite::SqliteDocumentStore;
pub use traits::{DocumentStore, DocumentSummary, Metadata, ScoredDocument, StoredDocument};
