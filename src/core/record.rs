//! Research data model.
//!
//! These types flow through every stage of the pipeline: the gatherer
//! produces [`SearchResult`]s, the synthesizer produces an
//! [`AnalysisResult`], and the orchestrator assembles both into a
//! [`ResearchRecord`] that the store persists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Prefix of generated research ids.
pub const RESEARCH_ID_PREFIX: &str = "res_";
/// Prefix of generated report ids.
pub const REPORT_ID_PREFIX: &str = "rpt_";
/// Hex digits in a generated id suffix.
const ID_HEX_LEN: usize = 12;

/// A single ranked web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Extracted content snippet.
    pub snippet: String,
    /// Provider relevance score, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// Lifecycle state of a research request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    /// Accepted, not started.
    Pending,
    /// Pipeline running.
    InProgress,
    /// Analysis persisted.
    Completed,
    /// Pipeline failed.
    Failed,
}

impl ResearchStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status string, returning `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One titled section of a detailed analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSection {
    /// Section heading.
    pub title: String,
    /// Section body text.
    pub body: String,
}

/// Detailed analysis, either split into named sections or a single text.
///
/// Resolved once when the model output is validated; serializes as a JSON
/// object (sectioned) or a JSON string (free-form). Section order follows
/// the model's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum DetailedAnalysis {
    /// Named sections in output order.
    Sectioned(Vec<AnalysisSection>),
    /// Unstructured analysis text.
    Freeform(String),
}

impl DetailedAnalysis {
    /// Heading used when the analysis is synthesized from the summary.
    pub const OVERVIEW_TITLE: &'static str = "Overview";

    /// Builds a single "Overview" section wrapping the given summary.
    #[must_use]
    pub fn from_summary(summary: &str) -> Self {
        Self::Sectioned(vec![AnalysisSection {
            title: Self::OVERVIEW_TITLE.to_string(),
            body: summary.to_string(),
        }])
    }

    /// Returns `true` when there is no analysis text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Sectioned(sections) => sections.iter().all(|s| s.body.trim().is_empty()),
            Self::Freeform(text) => text.trim().is_empty(),
        }
    }
}

impl From<Value> for DetailedAnalysis {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Sectioned(
                map.into_iter()
                    .map(|(title, body)| AnalysisSection {
                        title,
                        body: value_to_text(&body),
                    })
                    .collect(),
            ),
            other => Self::Freeform(value_to_text(&other)),
        }
    }
}

impl From<DetailedAnalysis> for Value {
    fn from(analysis: DetailedAnalysis) -> Self {
        match analysis {
            DetailedAnalysis::Sectioned(sections) => Self::Object(
                sections
                    .into_iter()
                    .map(|s| (s.title, Self::String(s.body)))
                    .collect(),
            ),
            DetailedAnalysis::Freeform(text) => Self::String(text),
        }
    }
}

/// Flattens an arbitrary JSON value into readable text.
///
/// Strings pass through, arrays become one line per item, objects become
/// `key: value` lines, `null` becomes empty.
#[must_use]
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", value_to_text(v)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Provenance attached to every validated analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Topic that was analyzed.
    pub topic: String,
    /// Model identifier that produced the analysis.
    pub model_used: String,
    /// Analysis schema version.
    pub analysis_version: String,
}

/// Validated output of the analysis synthesizer.
///
/// `summary`, `key_findings` and `detailed_analysis` are always populated
/// after validation, even when the model omitted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Executive summary.
    pub summary: String,
    /// Key findings in model order.
    pub key_findings: Vec<String>,
    /// Sectioned or free-form analysis.
    pub detailed_analysis: DetailedAnalysis,
    /// Model-reported confidence (0.0-1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    /// Number of sources the model claims to have used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_used: Option<u32>,
    /// Provenance.
    pub metadata: AnalysisMetadata,
}

/// A complete research result, as persisted and reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRecord {
    /// Unique id (`res_` + 12 hex digits).
    pub research_id: String,
    /// Research topic.
    pub topic: String,
    /// Lifecycle state.
    pub status: ResearchStatus,
    /// Executive summary.
    pub summary: String,
    /// Key findings.
    pub key_findings: Vec<String>,
    /// Sectioned or free-form analysis.
    pub detailed_analysis: DetailedAnalysis,
    /// Source URLs in search rank order.
    pub sources: Vec<String>,
    /// Concatenated evidence context given to the model.
    pub raw_content: String,
    /// Model that produced the analysis, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last bookkeeping update.
    pub updated_at: DateTime<Utc>,
}

impl ResearchRecord {
    /// Assembles a completed record from a validated analysis.
    #[must_use]
    pub fn completed(
        research_id: String,
        topic: &str,
        analysis: AnalysisResult,
        search_results: &[SearchResult],
        raw_content: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            research_id,
            topic: topic.to_string(),
            status: ResearchStatus::Completed,
            summary: analysis.summary,
            key_findings: analysis.key_findings,
            detailed_analysis: analysis.detailed_analysis,
            sources: search_results.iter().map(|r| r.url.clone()).collect(),
            raw_content,
            model_used: Some(analysis.metadata.model_used),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Generates a fresh research id: `res_` followed by 12 lowercase hex digits.
#[must_use]
pub fn generate_research_id() -> String {
    generate_id(RESEARCH_ID_PREFIX)
}

/// Generates a fresh report id: `rpt_` followed by 12 lowercase hex digits.
#[must_use]
pub fn generate_report_id() -> String {
    generate_id(REPORT_ID_PREFIX)
}

fn generate_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &hex[..ID_HEX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_hex_id(id: &str, prefix: &str) -> bool {
        id.strip_prefix(prefix).is_some_and(|rest| {
            rest.len() == 12 && rest.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
        })
    }

    #[test]
    fn test_generated_ids_match_pattern() {
        for _ in 0..32 {
            assert!(is_hex_id(&generate_research_id(), "res_"));
            assert!(is_hex_id(&generate_report_id(), "rpt_"));
        }
        assert_ne!(generate_research_id(), generate_research_id());
    }

    #[test]
    fn test_detailed_analysis_from_object_keeps_order() {
        let value = serde_json::json!({
            "Background": "history",
            "Current State": "now",
            "Outlook": ["a", "b"]
        });
        let analysis = DetailedAnalysis::from(value);
        let DetailedAnalysis::Sectioned(sections) = analysis else {
            unreachable!()
        };
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Background", "Current State", "Outlook"]);
        assert_eq!(sections[2].body, "a\nb");
    }

    #[test]
    fn test_detailed_analysis_from_string_is_freeform() {
        let analysis = DetailedAnalysis::from(Value::String("plain".to_string()));
        assert_eq!(analysis, DetailedAnalysis::Freeform("plain".to_string()));
    }

    #[test]
    fn test_detailed_analysis_serde_shape() {
        let sectioned = DetailedAnalysis::from_summary("sum");
        let json = serde_json::to_string(&sectioned).unwrap_or_default();
        assert_eq!(json, r#"{"Overview":"sum"}"#);

        let back: DetailedAnalysis =
            serde_json::from_str(&json).unwrap_or_else(|_| unreachable!());
        assert_eq!(back, sectioned);

        let freeform: DetailedAnalysis =
            serde_json::from_str(r#""text""#).unwrap_or_else(|_| unreachable!());
        assert_eq!(freeform, DetailedAnalysis::Freeform("text".to_string()));
    }

    #[test]
    fn test_detailed_analysis_is_empty() {
        assert!(DetailedAnalysis::Freeform("  ".to_string()).is_empty());
        assert!(DetailedAnalysis::Sectioned(Vec::new()).is_empty());
        assert!(!DetailedAnalysis::from_summary("x").is_empty());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ResearchStatus::Pending,
            ResearchStatus::InProgress,
            ResearchStatus::Completed,
            ResearchStatus::Failed,
        ] {
            assert_eq!(ResearchStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ResearchStatus::parse("bogus"), None);
        let json = serde_json::to_string(&ResearchStatus::InProgress).unwrap_or_default();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&Value::Null), "");
        assert_eq!(value_to_text(&serde_json::json!(3)), "3");
        assert_eq!(
            value_to_text(&serde_json::json!({"a": "x", "b": [1, 2]})),
            "a: x\nb: 1\n2"
        );
    }

    #[test]
    fn test_completed_record_collects_sources_in_rank_order() {
        let analysis = AnalysisResult {
            summary: "s".to_string(),
            key_findings: vec!["f".to_string()],
            detailed_analysis: DetailedAnalysis::from_summary("s"),
            confidence_score: None,
            sources_used: None,
            metadata: AnalysisMetadata {
                topic: "t".to_string(),
                model_used: "m".to_string(),
                analysis_version: "1.0".to_string(),
            },
        };
        let results = vec![
            SearchResult {
                title: "b".to_string(),
                url: "https://b".to_string(),
                snippet: String::new(),
                relevance_score: Some(0.9),
            },
            SearchResult {
                title: "a".to_string(),
                url: "https://a".to_string(),
                snippet: String::new(),
                relevance_score: Some(0.1),
            },
        ];
        let record =
            ResearchRecord::completed("res_x".to_string(), "t", analysis, &results, "ctx".into());
        assert_eq!(record.sources, ["https://b", "https://a"]);
        assert_eq!(record.status, ResearchStatus::Completed);
        assert_eq!(record.model_used.as_deref(), Some("m"));
        assert_eq!(record.created_at, record.updated_at);
    }
}
