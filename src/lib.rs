//! # Resume Match Engine
//!
//! A batch engine that matches resumes to open job requisitions: a two-stage
//! candidate recall (coarse metadata filter, then vector similarity), an
//! LLM-as-judge validation pass over the shortlist, and idempotent persistence
//! of the outcome.
//!
//! ## Overview
//!
//! This library provides functionality to:
//! - Recall a shortlist of candidate resumes for a job via coarse filtering
//!   plus vector similarity search ([`recall`])
//! - Validate and rank the shortlist with an LLM judge ([`validator`])
//! - Resolve the validator's output (and recover from a discrepant
//!   `best_match`) into a final decision ([`decider`])
//! - Persist matches and non-matches idempotently, keyed by job and workflow
//!   run ([`persistor`], [`store`])
//! - Orchestrate the whole batch: bounded concurrency, checkpointing, and
//!   memory-pressure cache eviction ([`workflow`])
//!
//! ## Modules
//!
//! - [`config`] - Configuration management with TOML support
//! - [`error`] - The categorized error taxonomy shared across the engine
//! - [`model`] - Core domain types (jobs, resumes, match records, metrics)
//! - [`store`] - The [`store::DocumentStore`] trait and an in-memory implementation
//! - [`cache`] - Resume list caching used by the recall stage
//! - [`recall`] - Two-stage candidate recall (metadata filter + similarity)
//! - [`llm`] - The [`llm::LlmClient`] trait and an Anthropic implementation
//! - [`validator`] - LLM-as-judge validation of recalled candidates
//! - [`decider`] - Turns a validation outcome into a final match decision
//! - [`persistor`] - Writes decisions to the document store idempotently
//! - [`memory`] - Resident memory introspection for cache eviction
//! - [`workflow`] - Batch orchestration: concurrency, checkpoints, retries
//! - [`utils`] - Generic utilities (hashing)
//!
//! ## Example
//!
//! ```rust,no_run
//! use resume_match_engine::{Config, Services, WorkflowEngine};
//! use resume_match_engine::store::InMemoryStore;
//! use resume_match_engine::llm::anthropic::AnthropicClient;
//! use resume_match_engine::memory::SysinfoMemoryMonitor;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.toml")?;
//!
//!     let services = Services {
//!         store: Arc::new(InMemoryStore::new()),
//!         llm: Arc::new(AnthropicClient::from_env()?),
//!         memory: Arc::new(SysinfoMemoryMonitor::new()),
//!     };
//!
//!     let engine = WorkflowEngine::new(services, &config, "run-2026-07-27".to_string());
//!     let summary = engine.run(&config).await?;
//!
//!     println!("matched: {}", summary.matched);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

// Public modules
pub mod cache;
pub mod config;
pub mod decider;
pub mod error;
pub mod llm;
pub mod memory;
pub mod model;
pub mod persistor;
pub mod recall;
pub mod store;
pub mod utils;
pub mod validator;
pub mod workflow;

// Re-exports for convenience
pub use config::Config;
pub use error::{EngineError, Result};
pub use model::{Job, MatchRecord, Resume, ShortlistEntry, UnmatchedRecord, WorkflowSummary};
pub use store::DocumentStore;
pub use workflow::{Services, WorkflowEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient imports for common use cases.
    //!
    //! ```rust
    //! use resume_match_engine::prelude::*;
    //! ```

    pub use crate::config::Config;
    pub use crate::decider::{Decision, MatchDecider};
    pub use crate::error::{EngineError, Result};
    pub use crate::llm::LlmClient;
    pub use crate::model::{Job, MatchRecord, Resume, ShortlistEntry, UnmatchedRecord};
    pub use crate::store::DocumentStore;
    pub use crate::validator::Validator;
    pub use crate::workflow::{Services, WorkflowEngine};
}
