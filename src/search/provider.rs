//! Pluggable web search provider trait.
//!
//! Implementations translate a provider-agnostic [`SearchRequest`] into a
//! specific search API call. Results come back as raw JSON values so that
//! the gatherer can parse them one at a time and skip malformed entries
//! instead of failing the whole search.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SearchError;

/// How thoroughly the provider should search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDepth {
    /// Fast, shallow search.
    Basic,
    /// Slower search that extracts more content per hit.
    #[default]
    Advanced,
}

impl SearchDepth {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

/// A search request (provider-agnostic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Query text.
    pub query: String,
    /// Maximum hits to return.
    pub limit: usize,
    /// Depth hint for the provider.
    pub depth: SearchDepth,
}

/// Raw provider response: ranked hits as untyped JSON objects.
///
/// Each hit is expected to carry `title`, `url`, `content` and optionally
/// `score`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Ranked hits, best first.
    #[serde(default)]
    pub results: Vec<Value>,
}

/// Trait for web search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name (e.g., `"tavily"`).
    fn name(&self) -> &'static str;

    /// Executes a search request.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport, status, or decoding failures.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;
}
