//! Core domain types shared by every pipeline stage.
//!
//! Lives outside the component modules so that the search, agent, storage
//! and report layers agree on one data model and one retry policy.

pub mod record;
pub mod retry;

pub use record::{
    AnalysisMetadata, AnalysisResult, AnalysisSection, DetailedAnalysis, ResearchRecord,
    ResearchStatus, SearchResult, generate_report_id, generate_research_id,
};
pub use retry::{RetryFailure, RetryPolicy, Retryable};
