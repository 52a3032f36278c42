//! Evidence gatherer: cached, retry-protected web search.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::cache::{SearchCache, cache_key};
use super::provider::{SearchDepth, SearchProvider, SearchRequest};
use crate::config::ResearchConfig;
use crate::core::{RetryPolicy, SearchResult};
use crate::error::SearchError;

/// Separator between formatted source blocks in a context string.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Wire shape of one provider hit. Hits missing a required field are skipped.
#[derive(Debug, Deserialize)]
struct RawHit {
    title: String,
    url: String,
    content: String,
    #[serde(default)]
    score: Option<f64>,
}

/// Queries a [`SearchProvider`], caching results by query and limit.
pub struct EvidenceGatherer {
    provider: Arc<dyn SearchProvider>,
    cache: SearchCache,
    retry: RetryPolicy,
    default_max_results: usize,
    max_results_ceiling: usize,
}

impl EvidenceGatherer {
    /// Creates a gatherer using the cache, retry and limit settings from `config`.
    #[must_use]
    pub fn new(provider: Arc<dyn SearchProvider>, config: &ResearchConfig) -> Self {
        Self {
            provider,
            cache: SearchCache::new(config.cache_ttl),
            retry: config.retry,
            default_max_results: config.default_max_results,
            max_results_ceiling: config.max_results_ceiling,
        }
    }

    /// Resolves the effective result count: default when unspecified,
    /// otherwise clamped to `1..=ceiling`.
    fn effective_limit(&self, max_results: Option<usize>) -> usize {
        max_results
            .unwrap_or(self.default_max_results)
            .clamp(1, self.max_results_ceiling.max(1))
    }

    /// Searches for `query`, returning results in provider order.
    ///
    /// With `use_cache`, a fresh cached response for the same query and limit
    /// is returned verbatim and a remote response is cached afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::EmptyQuery`] for a blank query, or
    /// [`SearchError::Failed`] once the retry budget is spent.
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
        use_cache: bool,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let limit = self.effective_limit(max_results);
        let key = cache_key(query, limit);

        if use_cache && let Some(results) = self.cache.get(&key) {
            return Ok(results);
        }

        let request = SearchRequest {
            query: query.to_string(),
            limit,
            depth: SearchDepth::Advanced,
        };
        let provider = &self.provider;
        let request_ref = &request;
        let response = self
            .retry
            .run("web_search", move || provider.search(request_ref))
            .await
            .map_err(|failure| SearchError::Failed {
                attempts: failure.attempts,
                source: Box::new(failure.error),
            })?;

        let results = parse_results(response.results);
        info!(
            query,
            provider = self.provider.name(),
            count = results.len(),
            "web search completed"
        );

        if use_cache {
            self.cache.insert(key, results.clone());
        }
        Ok(results)
    }

    /// Searches and formats the results into a single evidence context.
    ///
    /// # Errors
    ///
    /// Wraps any search failure in [`SearchError::ContextRetrieval`].
    pub async fn get_context(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<String, SearchError> {
        let results = self
            .search(query, max_results, true)
            .await
            .map_err(|e| SearchError::ContextRetrieval {
                source: Box::new(e),
            })?;
        Ok(format_context(&results))
    }

    /// Drops every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("search cache cleared");
    }

    /// Number of cached responses.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Cache time-to-live.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }
}

impl std::fmt::Debug for EvidenceGatherer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceGatherer")
            .field("provider", &self.provider.name())
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Parses raw provider hits, skipping any that are malformed.
fn parse_results(raw: Vec<Value>) -> Vec<SearchResult> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<RawHit>(value) {
            Ok(hit) => Some(SearchResult {
                title: hit.title,
                url: hit.url,
                snippet: hit.content,
                relevance_score: hit.score,
            }),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed search result");
                None
            }
        })
        .collect()
}

/// Formats results as numbered source blocks joined by [`CONTEXT_SEPARATOR`].
#[must_use]
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[Source {}] {}\nURL: {}\nContent: {}\n",
                i + 1,
                r.title,
                r.url,
                r.snippet
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::search::provider::SearchResponse;

    /// Returns canned hits and counts calls. Fails the first `fail_first` calls.
    struct FakeProvider {
        calls: AtomicU32,
        fail_first: u32,
        hits: Vec<Value>,
    }

    impl FakeProvider {
        fn new(hits: Vec<Value>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first: 0,
                hits,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.fail_first {
                return Err(SearchError::Provider {
                    message: "upstream unavailable".to_string(),
                    status: Some(503),
                });
            }
            Ok(SearchResponse {
                results: self.hits.iter().take(request.limit).cloned().collect(),
            })
        }
    }

    fn hit(n: usize) -> Value {
        json!({
            "title": format!("Title {n}"),
            "url": format!("https://example.com/{n}"),
            "content": format!("Content {n}"),
            "score": 0.9,
        })
    }

    fn config() -> ResearchConfig {
        ResearchConfig::builder()
            .cache_ttl(Duration::from_secs(3600))
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_within_ttl_then_refresh() {
        let provider = Arc::new(FakeProvider::new(vec![hit(1), hit(2)]));
        let gatherer = EvidenceGatherer::new(provider.clone(), &config());

        let first = gatherer
            .search("rust", Some(2), true)
            .await
            .unwrap_or_default();
        let second = gatherer
            .search("rust", Some(2), true)
            .await
            .unwrap_or_default();
        assert_eq!(provider.calls(), 1);
        assert_eq!(first, second);

        tokio::time::advance(Duration::from_secs(3601)).await;
        let _ = gatherer.search("rust", Some(2), true).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_bypass_cache() {
        let provider = Arc::new(FakeProvider::new(vec![hit(1)]));
        let gatherer = EvidenceGatherer::new(provider.clone(), &config());

        let _ = gatherer.search("rust", Some(1), false).await;
        let _ = gatherer.search("rust", Some(1), false).await;
        assert_eq!(provider.calls(), 2);
        assert_eq!(gatherer.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_malformed_results_are_skipped() {
        let hits = vec![
            hit(1),
            json!({"title": "no url", "content": "x"}),
            json!("not an object"),
            hit(2),
        ];
        let gatherer = EvidenceGatherer::new(Arc::new(FakeProvider::new(hits)), &config());

        let results = gatherer
            .search("rust", Some(10), true)
            .await
            .unwrap_or_default();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://example.com/1");
        assert_eq!(results[1].url, "https://example.com/2");
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let provider = Arc::new(FakeProvider::new(vec![]));
        let gatherer = EvidenceGatherer::new(provider.clone(), &config());
        let result = gatherer.search("   ", None, true).await;
        assert!(matches!(result, Err(SearchError::EmptyQuery)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_provider_makes_three_attempts() {
        let provider = Arc::new(FakeProvider {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            hits: vec![],
        });
        let gatherer = EvidenceGatherer::new(provider.clone(), &config());

        let result = gatherer.search("rust", None, true).await;
        assert!(matches!(
            result,
            Err(SearchError::Failed { attempts: 3, .. })
        ));
        assert_eq!(provider.calls(), 3);
        assert_eq!(gatherer.cache_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers() {
        let provider = Arc::new(FakeProvider {
            calls: AtomicU32::new(0),
            fail_first: 1,
            hits: vec![hit(1)],
        });
        let gatherer = EvidenceGatherer::new(provider.clone(), &config());
        let results = gatherer
            .search("rust", None, true)
            .await
            .unwrap_or_default();
        assert_eq!(results.len(), 1);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_failure_is_wrapped() {
        let provider = Arc::new(FakeProvider {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            hits: vec![],
        });
        let gatherer = EvidenceGatherer::new(provider, &config());
        let result = gatherer.get_context("rust", None).await;
        let Err(SearchError::ContextRetrieval { source }) = result else {
            unreachable!("expected a context retrieval failure");
        };
        assert!(matches!(*source, SearchError::Failed { .. }));
    }

    #[test]
    fn test_format_context_blocks() {
        let results = vec![
            SearchResult {
                title: "A".to_string(),
                url: "https://a".to_string(),
                snippet: "alpha".to_string(),
                relevance_score: None,
            },
            SearchResult {
                title: "B".to_string(),
                url: "https://b".to_string(),
                snippet: "beta".to_string(),
                relevance_score: Some(0.5),
            },
        ];
        let context = format_context(&results);
        assert_eq!(
            context,
            "[Source 1] A\nURL: https://a\nContent: alpha\n\n---\n[Source 2] B\nURL: https://b\nContent: beta\n"
        );
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_limit_is_clamped() {
        let gatherer = EvidenceGatherer::new(Arc::new(FakeProvider::new(vec![])), &config());
        assert_eq!(gatherer.effective_limit(None), 10);
        assert_eq!(gatherer.effective_limit(Some(0)), 1);
        assert_eq!(gatherer.effective_limit(Some(500)), 20);
    }
}
