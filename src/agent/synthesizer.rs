//! Analysis synthesizer: turns a topic and evidence context into a
//! validated [`AnalysisResult`].
//!
//! The remote call runs under the configured retry policy with a request
//! timeout per attempt. Parsing and validation happen once, after the call
//! succeeds, and are never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::parse::parse_json_object;
use super::prompt::{DepthProfile, PromptSet, build_analysis_prompt};
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::config::ResearchConfig;
use crate::core::record::value_to_text;
use crate::core::{AnalysisMetadata, AnalysisResult, DetailedAnalysis, RetryPolicy};
use crate::error::AgentError;

/// Schema version stamped on every analysis.
pub const ANALYSIS_VERSION: &str = "1.0";

/// Agent that produces one JSON analysis for a depth profile.
pub struct AnalysisAgent {
    model: String,
    system_prompt: String,
    profile: DepthProfile,
}

impl AnalysisAgent {
    /// Creates an analysis agent for the given model, prompt and depth profile.
    #[must_use]
    pub fn new(model: &str, system_prompt: &str, profile: DepthProfile) -> Self {
        Self {
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            profile,
        }
    }
}

#[async_trait]
impl Agent for AnalysisAgent {
    fn name(&self) -> &'static str {
        "analysis"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn temperature(&self) -> f32 {
        self.profile.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.profile.max_tokens
    }
}

/// Invokes the generation provider and repairs its output into an analysis.
pub struct AnalysisSynthesizer {
    provider: Arc<dyn LlmProvider>,
    model: String,
    system_prompt: String,
    timeout: Duration,
    retry: RetryPolicy,
    max_context_chars: usize,
}

impl AnalysisSynthesizer {
    /// Creates a synthesizer from configuration and a loaded prompt set.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &ResearchConfig, prompts: &PromptSet) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            system_prompt: prompts.analysis.clone(),
            timeout: config.timeout,
            retry: config.retry,
            max_context_chars: config.max_context_chars,
        }
    }

    /// Model identifier used for generation.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Analyzes `topic` using the optional evidence `context`.
    ///
    /// `depth` outside 1-5 falls back to 3.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Analysis`] when the remote call fails after
    /// retries, or [`AgentError::InvalidFormat`] when the response cannot be
    /// parsed as a JSON object.
    pub async fn analyze_topic(
        &self,
        topic: &str,
        context: Option<&str>,
        depth: u8,
    ) -> Result<AnalysisResult, AgentError> {
        let profile = DepthProfile::for_depth(depth);
        let agent = AnalysisAgent::new(&self.model, &self.system_prompt, profile);
        let user_msg = build_analysis_prompt(topic, context, &profile, self.max_context_chars);

        debug!(
            topic,
            depth = profile.depth,
            prompt_chars = user_msg.len(),
            "requesting analysis"
        );

        let agent = &agent;
        let provider = self.provider.as_ref();
        let user_msg = user_msg.as_str();
        let timeout = self.timeout;

        let response = self
            .retry
            .run("analysis", move || async move {
                tokio::time::timeout(timeout, agent.execute(provider, user_msg))
                    .await
                    .map_err(|_| AgentError::Timeout {
                        secs: timeout.as_secs(),
                    })?
            })
            .await
            .map_err(|failure| AgentError::Analysis {
                attempts: failure.attempts,
                source: Box::new(failure.error),
            })?;

        let (raw, stage) = parse_json_object(&response.content)?;
        let result = validate_and_enrich(raw, topic, &self.model);

        info!(
            topic,
            ?stage,
            findings = result.key_findings.len(),
            total_tokens = response.usage.total_tokens,
            "analysis completed"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for AnalysisSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSynthesizer")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Summary used when the model returns none.
#[must_use]
pub fn placeholder_summary(topic: &str) -> String {
    format!("Research analysis of \"{topic}\" (no summary was returned).")
}

/// Fills missing fields with defaults and attaches provenance metadata.
///
/// Every field of the result is populated regardless of what the model
/// returned:
/// - `summary` falls back to [`placeholder_summary`];
/// - a single-string `key_findings` becomes a one-element list, anything
///   else non-list becomes empty;
/// - a missing or empty `detailed_analysis` becomes one section holding the summary.
#[must_use]
pub fn validate_and_enrich(raw: Map<String, Value>, topic: &str, model: &str) -> AnalysisResult {
    let summary = raw
        .get("summary")
        .map(value_to_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| placeholder_summary(topic));

    let key_findings = match raw.get("key_findings") {
        Some(Value::Array(items)) => items
            .iter()
            .map(value_to_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    };

    let detailed_analysis = raw
        .get("detailed_analysis")
        .filter(|v| !v.is_null())
        .map(|v| DetailedAnalysis::from(v.clone()))
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| DetailedAnalysis::from_summary(&summary));

    let confidence_score = raw
        .get("confidence_score")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 1.0));

    let sources_used = raw
        .get("sources_used")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());

    AnalysisResult {
        summary,
        key_findings,
        detailed_analysis,
        confidence_score,
        sources_used,
        metadata: AnalysisMetadata {
            topic: topic.to_string(),
            model_used: model.to_string(),
            analysis_version: ANALYSIS_VERSION.to_string(),
        },
    }
}
