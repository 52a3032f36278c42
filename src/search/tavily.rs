//! Tavily search provider implementation using `reqwest`.

use async_trait::async_trait;
use serde::Serialize;

use super::provider::{SearchProvider, SearchRequest, SearchResponse};
use crate::config::ResearchConfig;
use crate::error::SearchError;

/// Longest error body kept in a provider error message.
const MAX_ERROR_BODY: usize = 500;

/// Tavily web search provider.
pub struct TavilySearchProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout_secs: u64,
}

/// JSON body of a Tavily `/search` call.
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
    include_raw_content: bool,
}

impl TavilySearchProvider {
    /// Creates a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::ApiKeyMissing`] if no search key is configured,
    /// or [`SearchError::Provider`] if the HTTP client cannot be built.
    pub fn new(config: &ResearchConfig) -> Result<Self, SearchError> {
        let api_key = config
            .search_api_key
            .clone()
            .ok_or(SearchError::ApiKeyMissing)?;

        let client = reqwest::Client::builder()
            .timeout(config.search_timeout)
            .build()
            .map_err(|e| SearchError::Provider {
                message: format!("failed to create HTTP client: {e}"),
                status: None,
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: config.search_base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.search_timeout.as_secs(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

impl std::fmt::Debug for TavilySearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearchProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchProvider for TavilySearchProvider {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            query: &request.query,
            max_results: request.limit,
            search_depth: request.depth.as_str(),
            include_answer: true,
            include_raw_content: false,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    SearchError::Provider {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            if text.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text.truncate(end);
            }
            return Err(SearchError::Provider {
                message: format!("HTTP {status}: {text}"),
                status: Some(status.as_u16()),
            });
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| SearchError::Provider {
                message: format!("invalid search response: {e}"),
                status: Some(status.as_u16()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let config = ResearchConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        let result = TavilySearchProvider::new(&config);
        assert!(matches!(result, Err(SearchError::ApiKeyMissing)));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = ResearchConfig::builder()
            .search_api_key("tvly-test")
            .search_base_url("https://search.example.com/")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider =
            TavilySearchProvider::new(&config).unwrap_or_else(|_| unreachable!());
        assert_eq!(provider.endpoint(), "https://search.example.com/search");
        assert_eq!(provider.name(), "tavily");
    }

    #[test]
    fn test_request_body_shape() {
        let body = TavilyRequest {
            api_key: "k",
            query: "rust",
            max_results: 3,
            search_depth: "advanced",
            include_answer: true,
            include_raw_content: false,
        };
        let json = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(json["max_results"], 3);
        assert_eq!(json["search_depth"], "advanced");
        assert_eq!(json["include_raw_content"], false);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ResearchConfig::builder()
            .search_api_key("secret-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider =
            TavilySearchProvider::new(&config).unwrap_or_else(|_| unreachable!());
        assert!(!format!("{provider:?}").contains("secret-key"));
    }
}
