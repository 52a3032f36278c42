//! Error types for research-rs.
//!
//! Each pipeline component owns a `thiserror` enum. The crate-level
//! [`Error`] composes them so the CLI boundary can map any failure to a
//! user-visible message. A missing record is never an error: lookups
//! return `Option`.

use thiserror::Error;

use crate::core::retry::Retryable;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Evidence gathering failed.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Analysis synthesis failed.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Research store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Report rendering failed.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Invalid or incomplete configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Invalid input at the core boundary.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },

    /// A CLI command could not be executed.
    #[error("{message}")]
    Command {
        /// Description of the failure.
        message: String,
    },

    /// I/O failure outside a specific component.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure outside a specific component.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the evidence gatherer and search providers.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The search query was empty or whitespace.
    #[error("search query cannot be empty")]
    EmptyQuery,

    /// No search API key was configured.
    #[error("search API key missing: set TAVILY_API_KEY")]
    ApiKeyMissing,

    /// The provider rejected or failed the request.
    #[error("search provider request failed: {message}")]
    Provider {
        /// Provider error description.
        message: String,
        /// HTTP status, when one was received.
        status: Option<u16>,
    },

    /// The provider did not answer in time.
    #[error("search provider timed out after {secs}s")]
    Timeout {
        /// Timeout that elapsed, in seconds.
        secs: u64,
    },

    /// Search failed after exhausting all retry attempts.
    #[error("web search failed after {attempts} attempt(s): {source}")]
    Failed {
        /// Attempts made.
        attempts: u32,
        /// Last error observed.
        #[source]
        source: Box<Self>,
    },

    /// Building the evidence context failed.
    #[error("context retrieval failed: {source}")]
    ContextRetrieval {
        /// Underlying search failure.
        #[source]
        source: Box<Self>,
    },
}

/// Errors from the analysis synthesizer and LLM providers.
#[derive(Error, Debug)]
pub enum AgentError {
    /// No LLM API key was configured.
    #[error("LLM API key missing: set OPENAI_API_KEY or RESEARCH_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is unknown.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name from configuration.
        name: String,
    },

    /// The provider API call failed.
    #[error("LLM API request failed: {message}")]
    ApiRequest {
        /// Provider error description.
        message: String,
        /// HTTP status, when one was received.
        status: Option<u16>,
    },

    /// The generation call exceeded its request timeout.
    #[error("LLM request timed out after {secs}s")]
    Timeout {
        /// Timeout that elapsed, in seconds.
        secs: u64,
    },

    /// The response could not be parsed as an analysis, even after repair.
    #[error("invalid analysis format: {message}")]
    InvalidFormat {
        /// Parse diagnostic.
        message: String,
        /// Raw response content.
        content: String,
    },

    /// Analysis failed with an unrecovered error.
    #[error("AI analysis failed after {attempts} attempt(s): {source}")]
    Analysis {
        /// Attempts made.
        attempts: u32,
        /// Original cause.
        #[source]
        source: Box<Self>,
    },
}

/// Errors from the research store and its document backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite backend error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Metadata (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while opening the store.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking store task could not complete.
    #[error("store task failed: {message}")]
    Task {
        /// Task failure description.
        message: String,
    },

    /// A stored document could not be reconstituted.
    #[error("corrupt stored research: {message}")]
    Corrupt {
        /// What was wrong with the stored data.
        message: String,
    },

    /// Persisting a research record failed.
    #[error("failed to store research {id}: {source}")]
    Persist {
        /// Research id being stored.
        id: String,
        /// Backend cause.
        #[source]
        source: Box<Self>,
    },

    /// Reading from the store failed.
    #[error("failed to retrieve research: {source}")]
    Retrieval {
        /// Backend cause.
        #[source]
        source: Box<Self>,
    },
}

/// Errors from report rendering.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The renderer could not produce the artifact.
    #[error("report generation failed: {message}")]
    Render {
        /// Renderer diagnostic.
        message: String,
    },

    /// Writing the artifact failed.
    #[error("report I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Retryable for SearchError {
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::EmptyQuery | Self::ApiKeyMissing)
    }
}

impl Retryable for AgentError {
    fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::ApiKeyMissing | Self::UnsupportedProvider { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_failure_message_includes_cause() {
        let err = SearchError::Failed {
            attempts: 3,
            source: Box::new(SearchError::Timeout { secs: 30 }),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempt"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn test_transient_errors_are_retryable() {
        let provider = SearchError::Provider {
            message: "502".to_string(),
            status: Some(502),
        };
        assert!(provider.is_retryable());
        assert!(!SearchError::EmptyQuery.is_retryable());
        assert!(AgentError::Timeout { secs: 60 }.is_retryable());
        assert!(!AgentError::ApiKeyMissing.is_retryable());
    }

    #[test]
    fn test_component_errors_convert() {
        let err: Error = StoreError::Corrupt {
            message: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Store(_)));
    }
}
