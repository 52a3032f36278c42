//! Analysis synthesis and pipeline orchestration.
//!
//! Turns gathered evidence into a structured analysis through a pluggable
//! LLM provider backed by OpenAI-compatible APIs, repairing malformed
//! model output before it reaches the store.
//!
//! # Architecture
//!
//! ```text
//! Topic → ResearchOrchestrator
//!   ├── EvidenceGatherer (search + cache + context)
//!   ├── AnalysisSynthesizer
//!   │   ├── AnalysisAgent (depth-profiled request, retried, timed out)
//!   │   └── parse_json_object → validate_and_enrich
//!   └── ResearchLibrary
//!       ├── ResearchStore (persist, lookup, similarity, history)
//!       └── ReportRenderer (Markdown report files)
//! ```

pub mod client;
pub mod message;
pub mod orchestrator;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod synthesizer;
pub mod traits;

pub use client::create_provider;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::{MAX_TOPIC_CHARS, ResearchLibrary, ResearchOrchestrator, validate_topic};
pub use parse::{ParseStage, parse_json_object};
pub use prompt::{DepthProfile, PromptSet};
pub use provider::LlmProvider;
pub use synthesizer::{AnalysisAgent, AnalysisSynthesizer, validate_and_enrich};
pub use traits::{Agent, AgentResponse};
