//! Evidence gathering: web search providers, result cache, and context building.

pub mod cache;
pub mod gatherer;
pub mod provider;
pub mod tavily;

use std::sync::Arc;

pub use cache::{CacheEntry, SearchCache, cache_key};
pub use gatherer::{CONTEXT_SEPARATOR, EvidenceGatherer, format_context};
pub use provider::{SearchDepth, SearchProvider, SearchRequest, SearchResponse};
pub use tavily::TavilySearchProvider;

use crate::config::ResearchConfig;
use crate::error::SearchError;

/// Creates the configured web search provider.
///
/// # Errors
///
/// Returns [`SearchError::ApiKeyMissing`] if no search key is configured.
pub fn create_search_provider(
    config: &ResearchConfig,
) -> Result<Arc<dyn SearchProvider>, SearchError> {
    Ok(Arc::new(TavilySearchProvider::new(config)?))
}
