//! # research-rs
//!
//! A resilient research pipeline: gather web evidence for a topic,
//! synthesize a structured analysis with an LLM, persist it in a
//! similarity-searchable store, and render reports on demand.
//!
//! ## Overview
//!
//! - [`search`]: evidence gathering with a TTL cache and bounded retries
//! - [`agent`]: analysis synthesis, output repair, and orchestration
//! - [`storage`]: research records over a pluggable document store
//! - [`report`]: report rendering
//! - [`cli`]: the `research-rs` command line
//!
//! ## Example
//!
//! ```no_run
//! use research_rs::{ResearchConfig, ResearchOrchestrator};
//!
//! # async fn run() -> research_rs::Result<()> {
//! let config = ResearchConfig::from_env()?;
//! let orchestrator = ResearchOrchestrator::from_config(&config)?;
//! let record = orchestrator.run_research("solid-state batteries", 3, None).await?;
//! println!("{}: {}", record.research_id, record.summary);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod report;
pub mod search;
pub mod storage;

pub use agent::{ResearchLibrary, ResearchOrchestrator};
pub use config::ResearchConfig;
pub use core::{AnalysisResult, ResearchRecord, ResearchStatus, SearchResult};
pub use error::{Error, Result};
