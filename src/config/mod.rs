//! Configuration management module.
//!
//! This module handles loading, validating, and managing the run
//! configuration for a single invocation of the matching engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Collection names recognized by the document store layer.
pub const COLLECTION_KEYS: [&str; 4] = ["job_postings", "resumes", "matches", "unmatched"];

/// Main configuration struct for the matching engine.
///
/// Constructed once per run via [`Config::load`] and frozen; validated
/// with [`Config::validate`] before the engine is allowed to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logical document store namespace.
    #[serde(default = "default_db_name")]
    pub db_name: String,

    /// Collection names, keyed by `job_postings`, `resumes`, `matches`, `unmatched`.
    #[serde(default = "default_collections")]
    pub collections: HashMap<String, String>,

    /// Industry-prefix tags admitted by the coarse recall filter. Empty means all resumes.
    #[serde(default)]
    pub industry_prefixes: Vec<String>,

    /// Search terms restricting which jobs are eligible. Empty means no restriction.
    #[serde(default)]
    pub search_terms: Vec<String>,

    /// Cap on jobs processed in a single run. `None` means all eligible jobs.
    #[serde(default)]
    pub max_jobs: Option<u64>,

    /// Base count for vector-search recall.
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Minimum normalized vector score to keep a recall candidate.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Minimum LLM score for a shortlist entry to be valid.
    #[serde(default = "default_validation_threshold")]
    pub validation_threshold: u32,

    /// Name of the vector search index on the resumes collection.
    #[serde(default = "default_vector_search_index")]
    pub vector_search_index: String,

    /// Opaque model identifier passed to the LLM interface.
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// Maximum retry attempts for a transient external failure.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base retry delay, in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f64,

    /// Ceiling on the exponential retry backoff, in seconds.
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay: f64,

    /// Number of jobs per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Upper bound on concurrent job evaluations within a batch.
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,

    /// Resume cache entry lifetime, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,

    /// Persist a checkpoint every N completed jobs.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,

    /// Resident memory threshold (MB) above which the resume cache is cleared.
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,

    /// When true, exclude jobs already present in the matches/unmatched stores.
    #[serde(default = "default_true")]
    pub skip_processed_jobs: bool,

    /// When true, override `skip_processed_jobs` and process everything.
    #[serde(default)]
    pub force_reprocess: bool,

    /// Opaque tag distinguishing checkpoint namespaces across runs.
    #[serde(default = "default_workflow_type")]
    pub workflow_type: String,
}

fn default_db_name() -> String {
    "resume_study".to_string()
}
fn default_collections() -> HashMap<String, String> {
    let mut map = HashMap::new();
    map.insert("job_postings".to_string(), "job_postings".to_string());
    map.insert("resumes".to_string(), "resumes".to_string());
    map.insert("matches".to_string(), "resume_job_matches".to_string());
    map.insert("unmatched".to_string(), "unmatched_job_postings".to_string());
    map
}
fn default_top_k() -> u32 {
    4
}
fn default_similarity_threshold() -> f64 {
    0.30
}
fn default_validation_threshold() -> u32 {
    70
}
fn default_vector_search_index() -> String {
    "resume_embedding_index".to_string()
}
fn default_llm_model() -> String {
    "claude-3-sonnet-20240229".to_string()
}
fn default_retry_attempts() -> u32 {
    2
}
fn default_retry_delay() -> f64 {
    1.0
}
fn default_max_retry_delay() -> f64 {
    60.0
}
fn default_batch_size() -> u32 {
    20
}
fn default_max_workers() -> u32 {
    4
}
fn default_cache_ttl() -> u64 {
    3600
}
fn default_checkpoint_interval() -> u32 {
    100
}
fn default_memory_limit_mb() -> u64 {
    2048
}
fn default_workflow_type() -> String {
    "default".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_name: default_db_name(),
            collections: default_collections(),
            industry_prefixes: Vec::new(),
            search_terms: Vec::new(),
            max_jobs: None,
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            validation_threshold: default_validation_threshold(),
            vector_search_index: default_vector_search_index(),
            llm_model: default_llm_model(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
            max_retry_delay: default_max_retry_delay(),
            batch_size: default_batch_size(),
            max_workers: default_max_workers(),
            cache_ttl: default_cache_ttl(),
            checkpoint_interval: default_checkpoint_interval(),
            memory_limit_mb: default_memory_limit_mb(),
            skip_processed_jobs: true,
            force_reprocess: false,
            workflow_type: default_workflow_type(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits, then validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigNotFound`] if the file is missing,
    /// [`EngineError::ConfigParse`]/[`EngineError::TomlParse`] if it is
    /// malformed, or [`EngineError::ConfigValidation`]/
    /// [`EngineError::ConfigInvalidValue`] if it fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(EngineError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Compute the cache key for the configured industry-prefix filter:
    /// the sorted, joined prefix set, or the literal `"all_industries"`
    /// when no filter is configured.
    pub fn resume_cache_key(&self) -> String {
        if self.industry_prefixes.is_empty() {
            return "all_industries".to_string();
        }
        let mut prefixes = self.industry_prefixes.clone();
        prefixes.sort();
        prefixes.join("_")
    }

    /// Validate the configuration, rejecting inconsistent values before
    /// the engine is allowed to start.
    pub fn validate(&self) -> Result<()> {
        for key in COLLECTION_KEYS {
            if !self.collections.contains_key(key) {
                return Err(EngineError::ConfigValidation {
                    message: format!("collections map is missing required key '{key}'"),
                });
            }
        }

        if self.top_k == 0 {
            return Err(EngineError::ConfigInvalidValue {
                field: "top_k".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(EngineError::ConfigInvalidValue {
                field: "similarity_threshold".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.validation_threshold > 100 {
            return Err(EngineError::ConfigInvalidValue {
                field: "validation_threshold".to_string(),
                message: "must be between 0 and 100".to_string(),
            });
        }

        if self.batch_size == 0 {
            return Err(EngineError::ConfigInvalidValue {
                field: "batch_size".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if self.max_workers == 0 {
            return Err(EngineError::ConfigInvalidValue {
                field: "max_workers".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if self.checkpoint_interval == 0 {
            return Err(EngineError::ConfigInvalidValue {
                field: "checkpoint_interval".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if self.memory_limit_mb == 0 {
            return Err(EngineError::ConfigInvalidValue {
                field: "memory_limit_mb".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if self.retry_delay <= 0.0 || self.max_retry_delay < self.retry_delay {
            return Err(EngineError::ConfigInvalidValue {
                field: "retry_delay".to_string(),
                message: "must be positive and no greater than max_retry_delay".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.top_k, 4);
        assert_eq!(config.batch_size, 20);
    }

    #[test]
    fn test_config_validation_rejects_bad_threshold() {
        let mut config = Config::default();
        config.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_missing_collection_key() {
        let mut config = Config::default();
        config.collections.remove("matches");
        assert!(matches!(
            config.validate(),
            Err(EngineError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_config_load_not_found() {
        let result = Config::load("/nonexistent/config.toml");
        assert!(matches!(result, Err(EngineError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.top_k, parsed.top_k);
        assert_eq!(config.similarity_threshold, parsed.similarity_threshold);
    }

    #[test]
    fn test_resume_cache_key_sorted_and_joined() {
        let mut config = Config::default();
        config.industry_prefixes = vec!["ITC".to_string(), "CCC".to_string()];
        assert_eq!(config.resume_cache_key(), "CCC_ITC");
    }

    #[test]
    fn test_resume_cache_key_defaults_to_all_industries() {
        let config = Config::default();
        assert_eq!(config.resume_cache_key(), "all_industries");
    }
}
