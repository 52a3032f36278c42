//! `SQLite` document store.
//!
//! Documents live in one table with their metadata as a JSON object.
//! Every statement runs on the blocking pool so callers on the async
//! runtime are never stalled by disk I/O.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::similarity::{cosine_distance, term_vector};
use super::traits::{DocumentStore, DocumentSummary, Metadata, ScoredDocument, StoredDocument};
use crate::error::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    document TEXT NOT NULL,
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at);
";

/// Document store backed by a single `SQLite` database.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteDocumentStore {
    /// Opens (or creates) the database at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory or database cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        debug!(path = ?path, "document store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Database file path, or `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Task {
                message: "connection lock poisoned".to_string(),
            })?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task {
            message: e.to_string(),
        })?
    }
}

impl std::fmt::Debug for SqliteDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDocumentStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn decode_metadata(raw: &str) -> Result<Metadata, StoreError> {
    Ok(serde_json::from_str(raw)?)
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn add(&self, id: &str, document: &str, metadata: &Metadata) -> Result<(), StoreError> {
        let id = id.to_string();
        let document = document.to_string();
        let metadata = serde_json::to_string(metadata)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO documents (id, document, metadata, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, document, metadata, Utc::now().to_rfc3339()],
            )?;
            debug!(id = %id, "document added");
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT document, metadata FROM documents WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;

            match row {
                Some((document, metadata)) => Ok(Some(StoredDocument {
                    metadata: decode_metadata(&metadata)?,
                    id,
                    document,
                })),
                None => Ok(None),
            }
        })
        .await
    }

    async fn query(&self, text: &str, n: usize) -> Result<Vec<ScoredDocument>, StoreError> {
        let query = term_vector(text);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT id, document, metadata FROM documents")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut scored = Vec::new();
            for row in rows {
                let (id, document, metadata) = row?;
                let distance = cosine_distance(&query, &term_vector(&document));
                scored.push(ScoredDocument {
                    document: StoredDocument {
                        id,
                        document,
                        metadata: decode_metadata(&metadata)?,
                    },
                    distance,
                });
            }

            scored.sort_by(|a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then_with(|| a.document.id.cmp(&b.document.id))
            });
            scored.truncate(n);
            Ok(scored)
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<DocumentSummary>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, metadata FROM documents")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut summaries = Vec::new();
            for row in rows {
                let (id, metadata) = row?;
                summaries.push(DocumentSummary {
                    id,
                    metadata: decode_metadata(&metadata)?,
                });
            }
            Ok(summaries)
        })
        .await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }
}
