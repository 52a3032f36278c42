//! Pipeline configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! API keys are optional here; the provider factories reject a missing key
//! so that read-only commands (history, report) work without credentials.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::retry::RetryPolicy;
use crate::error::Error;

/// Default LLM provider.
const DEFAULT_PROVIDER: &str = "openai";
/// Default generation model.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default search API base URL.
const DEFAULT_SEARCH_BASE_URL: &str = "https://api.tavily.com";
/// Default database location, relative to the working directory.
const DEFAULT_DB_PATH: &str = "data/research.db";
/// Default report output directory.
const DEFAULT_REPORTS_DIR: &str = "reports";
/// Default number of search results per query.
const DEFAULT_MAX_RESULTS: usize = 10;
/// Hard ceiling on search results per query.
const DEFAULT_MAX_RESULTS_CEILING: usize = 20;
/// Search cache time-to-live in seconds.
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
/// Evidence context beyond this many characters is truncated before prompting.
const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;
/// Generation request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Search request timeout in seconds.
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;

/// Configuration for the research pipeline.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the LLM provider.
    pub api_key: Option<String>,
    /// Optional LLM base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Generation model identifier.
    pub model: String,
    /// API key for the search provider.
    pub search_api_key: Option<String>,
    /// Search API base URL.
    pub search_base_url: String,
    /// SQLite database path for the research store.
    pub db_path: PathBuf,
    /// Directory that receives rendered reports.
    pub reports_dir: PathBuf,
    /// Search results used when the caller does not specify a count.
    pub default_max_results: usize,
    /// Upper bound on search results per query.
    pub max_results_ceiling: usize,
    /// Search cache time-to-live.
    pub cache_ttl: Duration,
    /// Evidence context character ceiling.
    pub max_context_chars: usize,
    /// Generation request timeout.
    pub timeout: Duration,
    /// Search request timeout.
    pub search_timeout: Duration,
    /// Retry policy applied at each remote-call site.
    pub retry: RetryPolicy,
    /// Directory containing prompt template files.
    ///
    /// When set, the synthesizer loads its system prompt from this directory,
    /// falling back to the compiled-in default when the file is missing.
    pub prompt_dir: Option<PathBuf>,
}

impl ResearchConfig {
    /// Creates a new builder for `ResearchConfig`.
    #[must_use]
    pub fn builder() -> ResearchConfigBuilder {
        ResearchConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a resolved value is out of range.
    pub fn from_env() -> Result<Self, Error> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`ResearchConfig`].
#[derive(Debug, Clone, Default)]
pub struct ResearchConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    search_api_key: Option<String>,
    search_base_url: Option<String>,
    db_path: Option<PathBuf>,
    reports_dir: Option<PathBuf>,
    default_max_results: Option<usize>,
    max_results_ceiling: Option<usize>,
    cache_ttl: Option<Duration>,
    max_context_chars: Option<usize>,
    timeout: Option<Duration>,
    search_timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    prompt_dir: Option<PathBuf>,
}

impl ResearchConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("RESEARCH_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("RESEARCH_API_KEY"))
                .ok()
                .filter(|k| !k.is_empty());
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("RESEARCH_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("RESEARCH_MODEL").ok();
        }
        if self.search_api_key.is_none() {
            self.search_api_key = std::env::var("TAVILY_API_KEY")
                .ok()
                .filter(|k| !k.is_empty());
        }
        if self.search_base_url.is_none() {
            self.search_base_url = std::env::var("RESEARCH_SEARCH_URL").ok();
        }
        if self.db_path.is_none() {
            self.db_path = std::env::var("RESEARCH_DB_PATH").ok().map(PathBuf::from);
        }
        if self.reports_dir.is_none() {
            self.reports_dir = std::env::var("RESEARCH_REPORTS_DIR")
                .ok()
                .map(PathBuf::from);
        }
        if self.default_max_results.is_none() {
            self.default_max_results = std::env::var("RESEARCH_MAX_SEARCH_RESULTS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_context_chars.is_none() {
            self.max_context_chars = std::env::var("RESEARCH_MAX_CONTEXT_CHARS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("RESEARCH_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the LLM API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the LLM base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the generation model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the search API key.
    #[must_use]
    pub fn search_api_key(mut self, key: impl Into<String>) -> Self {
        self.search_api_key = Some(key.into());
        self
    }

    /// Sets the search API base URL.
    #[must_use]
    pub fn search_base_url(mut self, url: impl Into<String>) -> Self {
        self.search_base_url = Some(url.into());
        self
    }

    /// Sets the research database path.
    #[must_use]
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Sets the reports directory.
    #[must_use]
    pub fn reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = Some(dir.into());
        self
    }

    /// Sets the default search result count.
    #[must_use]
    pub const fn default_max_results(mut self, n: usize) -> Self {
        self.default_max_results = Some(n);
        self
    }

    /// Sets the search result ceiling.
    #[must_use]
    pub const fn max_results_ceiling(mut self, n: usize) -> Self {
        self.max_results_ceiling = Some(n);
        self
    }

    /// Sets the search cache time-to-live.
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Sets the evidence context character ceiling.
    #[must_use]
    pub const fn max_context_chars(mut self, n: usize) -> Self {
        self.max_context_chars = Some(n);
        self
    }

    /// Sets the generation request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the search request timeout.
    #[must_use]
    pub const fn search_timeout(mut self, duration: Duration) -> Self {
        self.search_timeout = Some(duration);
        self
    }

    /// Sets the retry policy for remote calls.
    #[must_use]
    pub const fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`ResearchConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the result ceiling or context ceiling is zero.
    pub fn build(self) -> Result<ResearchConfig, Error> {
        let max_results_ceiling = self
            .max_results_ceiling
            .unwrap_or(DEFAULT_MAX_RESULTS_CEILING);
        if max_results_ceiling == 0 {
            return Err(Error::Config {
                message: "max_results_ceiling must be at least 1".to_string(),
            });
        }

        let max_context_chars = self.max_context_chars.unwrap_or(DEFAULT_MAX_CONTEXT_CHARS);
        if max_context_chars == 0 {
            return Err(Error::Config {
                message: "max_context_chars must be at least 1".to_string(),
            });
        }

        Ok(ResearchConfig {
            provider: self
                .provider
                .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            api_key: self.api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            search_api_key: self.search_api_key,
            search_base_url: self
                .search_base_url
                .unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string()),
            db_path: self
                .db_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            reports_dir: self
                .reports_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR)),
            default_max_results: self
                .default_max_results
                .unwrap_or(DEFAULT_MAX_RESULTS)
                .clamp(1, max_results_ceiling),
            max_results_ceiling,
            cache_ttl: self
                .cache_ttl
                .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            max_context_chars,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            search_timeout: self
                .search_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS)),
            retry: self.retry.unwrap_or_default(),
            prompt_dir: self.prompt_dir,
        })
    }
}
