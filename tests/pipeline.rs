//! End-to-end pipeline tests with in-process fake collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use research_rs::agent::message::{ChatRequest, ChatResponse, TokenUsage};
use research_rs::agent::{AnalysisSynthesizer, LlmProvider, PromptSet, ResearchLibrary};
use research_rs::core::RetryPolicy;
use research_rs::error::{AgentError, SearchError};
use research_rs::report::MarkdownReportRenderer;
use research_rs::search::{EvidenceGatherer, SearchProvider, SearchRequest, SearchResponse};
use research_rs::storage::{ResearchStore, SqliteDocumentStore};
use research_rs::{Error, ResearchConfig, ResearchOrchestrator, ResearchStatus};
use serde_json::json;

struct FakeSearch {
    calls: AtomicU32,
}

#[async_trait]
impl SearchProvider for FakeSearch {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let results = (1..=request.limit)
            .map(|i| {
                json!({
                    "title": format!("{} paper {i}", request.query),
                    "url": format!("https://example.org/{i}"),
                    "content": format!("Evidence {i} about {}", request.query),
                    "score": 0.9,
                })
            })
            .collect();
        Ok(SearchResponse { results })
    }
}

struct FakeLlm {
    reply: Option<String>,
    calls: AtomicU32,
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(content) => Ok(ChatResponse {
                content: content.clone(),
                usage: TokenUsage::default(),
                finish_reason: Some("stop".to_string()),
            }),
            None => Err(AgentError::ApiRequest {
                message: "quota exceeded".to_string(),
                status: Some(429),
            }),
        }
    }
}

const ANALYSIS: &str = r#"Here is the analysis:
```json
{
  "summary": "Error-corrected logical qubits crossed the break-even point.",
  "key_findings": ["Logical qubits outlive physical ones", "Surface codes scale"],
  "detailed_analysis": {
    "Background": "Decoherence limits circuit depth.",
    "Outlook": "Fault tolerance within a decade."
  },
  "confidence_score": 0.8
}
```"#;

struct Harness {
    orchestrator: ResearchOrchestrator,
    search: Arc<FakeSearch>,
    llm: Arc<FakeLlm>,
    _reports: tempfile::TempDir,
}

fn harness(reply: Option<&str>) -> Harness {
    let reports = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let config = ResearchConfig::builder()
        .model("test-model")
        .retry(RetryPolicy::new(3, Duration::ZERO, Duration::ZERO))
        .reports_dir(reports.path())
        .build()
        .unwrap_or_else(|_| unreachable!());

    let search = Arc::new(FakeSearch {
        calls: AtomicU32::new(0),
    });
    let llm = Arc::new(FakeLlm {
        reply: reply.map(str::to_string),
        calls: AtomicU32::new(0),
    });

    let backend = SqliteDocumentStore::open_in_memory().unwrap_or_else(|_| unreachable!());
    let library = ResearchLibrary::new(
        ResearchStore::new(Arc::new(backend)),
        Arc::new(MarkdownReportRenderer::new(reports.path())),
    );
    let orchestrator = ResearchOrchestrator::new(
        Arc::new(EvidenceGatherer::new(search.clone(), &config)),
        Arc::new(AnalysisSynthesizer::new(
            llm.clone(),
            &config,
            &PromptSet::defaults(),
        )),
        library,
    );

    Harness {
        orchestrator,
        search,
        llm,
        _reports: reports,
    }
}

fn is_research_id(id: &str) -> bool {
    id.strip_prefix("res_").is_some_and(|hex| {
        hex.len() == 12
            && hex
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    })
}

#[tokio::test]
async fn test_research_persists_record() {
    let h = harness(Some(ANALYSIS));
    let record = h
        .orchestrator
        .run_research("Quantum computing advances", 3, Some(3))
        .await
        .unwrap_or_else(|e| unreachable!("research failed: {e}"));

    assert!(is_research_id(&record.research_id), "{}", record.research_id);
    assert_eq!(record.status, ResearchStatus::Completed);
    assert!(!record.summary.is_empty());
    assert!(!record.key_findings.is_empty());
    assert_eq!(record.sources.len(), 3);
    assert_eq!(record.model_used.as_deref(), Some("test-model"));

    // Context is served from the cache populated by the search.
    assert_eq!(h.search.calls.load(Ordering::SeqCst), 1);

    let stored = h
        .orchestrator
        .library()
        .get_record(&record.research_id)
        .await
        .unwrap_or_default()
        .unwrap_or_else(|| unreachable!("record was not stored"));
    assert_eq!(stored.topic, "Quantum computing advances");
    assert_eq!(stored.summary, record.summary);
    assert_eq!(stored.key_findings, record.key_findings);
    assert_eq!(stored.sources, record.sources);
}

#[tokio::test]
async fn test_unknown_research_is_absent() {
    let h = harness(Some(ANALYSIS));
    let found = h
        .orchestrator
        .library()
        .get_research("nonexistent_id")
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(found.is_none());

    let report = h
        .orchestrator
        .assemble_report("nonexistent_id", true)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(report.is_none());
}

#[tokio::test]
async fn test_similar_ranks_matching_record_first() {
    let h = harness(Some(ANALYSIS));
    let quantum = h
        .orchestrator
        .run_research("quantum error correction", 3, Some(2))
        .await
        .unwrap_or_else(|_| unreachable!());
    let _bread = h
        .orchestrator
        .run_research("sourdough fermentation", 3, Some(2))
        .await
        .unwrap_or_else(|_| unreachable!());

    let hits = h
        .orchestrator
        .find_similar("quantum", 5)
        .await
        .unwrap_or_default();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document.id, quantum.research_id);
    assert!(hits[0].distance < hits[1].distance);
}

#[tokio::test]
async fn test_failed_analysis_stores_nothing() {
    let h = harness(None);
    let result = h.orchestrator.run_research("Fusion energy", 3, None).await;

    assert!(matches!(
        result,
        Err(Error::Agent(AgentError::Analysis { attempts: 3, .. }))
    ));
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 3);
    assert_eq!(h.orchestrator.library().count().await.unwrap_or(usize::MAX), 0);
}

#[tokio::test]
async fn test_blank_topic_rejected_before_search() {
    let h = harness(Some(ANALYSIS));
    let result = h.orchestrator.run_research("   ", 3, None).await;
    assert!(matches!(result, Err(Error::InvalidInput { .. })));
    assert_eq!(h.search.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_history_newest_first() {
    let h = harness(Some(ANALYSIS));
    let first = h
        .orchestrator
        .run_research("first topic", 3, Some(1))
        .await
        .unwrap_or_else(|_| unreachable!());
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = h
        .orchestrator
        .run_research("second topic", 3, Some(1))
        .await
        .unwrap_or_else(|_| unreachable!());

    let recent = h.orchestrator.list_recent(None).await.unwrap_or_default();
    let ids: Vec<&str> = recent.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![second.research_id.as_str(), first.research_id.as_str()]
    );

    let limited = h.orchestrator.list_recent(Some(1)).await.unwrap_or_default();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_report_from_stored_research() {
    let h = harness(Some(ANALYSIS));
    let record = h
        .orchestrator
        .run_research("Quantum computing advances", 3, Some(2))
        .await
        .unwrap_or_else(|_| unreachable!());

    let artifact = h
        .orchestrator
        .assemble_report(&record.research_id, true)
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!("report missing"));

    assert!(artifact.report_id.starts_with("rpt_"));
    assert_eq!(artifact.research_id, record.research_id);
    let body = tokio::fs::read_to_string(&artifact.path)
        .await
        .unwrap_or_default();
    assert!(body.contains("# Quantum computing advances"));
    assert!(body.contains("### Background"));
    assert!(body.contains("https://example.org/1"));
}

#[tokio::test]
async fn test_spawned_research_runs_concurrently() {
    let h = harness(Some(ANALYSIS));
    let orchestrator = Arc::new(h.orchestrator.clone());

    let handles: Vec<_> = ["alpha topic", "beta topic", "gamma topic"]
        .into_iter()
        .map(|topic| orchestrator.spawn_research(topic.to_string(), 2, Some(1)))
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let record = handle
            .await
            .unwrap_or_else(|_| unreachable!("task panicked"))
            .unwrap_or_else(|_| unreachable!("research failed"));
        ids.push(record.research_id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert_eq!(orchestrator.library().count().await.unwrap_or_default(), 3);
}
