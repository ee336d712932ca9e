//! Document store abstraction.
//!
//! The engine never talks to a concrete database directly; it depends on
//! the [`DocumentStore`] trait. [`InMemoryStore`] is a reference
//! implementation used by tests and as a runnable example; a production
//! binding to a document database with native vector search would
//! implement the same trait.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::model::{Checkpoint, Job, MatchRecord, Resume, UnmatchedRecord};

/// A resume together with its raw (unnormalized) vector-search score.
#[derive(Debug, Clone)]
pub struct ScoredResume {
    /// The candidate resume.
    pub resume: Resume,
    /// The opaque, non-negative raw score returned by the index.
    pub raw_score: f64,
}

/// Abstract accessor for jobs, resumes, matches, unmatched records, and
/// checkpoints. Implementations must be thread-safe: the workflow engine
/// calls these methods concurrently from multiple workers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return jobs eligible for matching, honouring `search_terms`,
    /// `skip_processed_jobs`/`force_reprocess`, and `max_jobs`.
    async fn list_eligible_jobs(&self, config: &Config) -> Result<Vec<Job>>;

    /// Return resumes whose `industry_prefix` is in `prefixes`. An empty
    /// `prefixes` returns every resume.
    async fn list_resumes_by_industry(&self, prefixes: &[String]) -> Result<Vec<Resume>>;

    /// Run approximate nearest-neighbour search against the configured
    /// resume embedding field, restricted to `candidate_ids` if given.
    async fn vector_search(
        &self,
        query_vector: &[f32],
        num_candidates: usize,
        limit: usize,
        index_name: &str,
        candidate_ids: &HashSet<String>,
    ) -> Result<Vec<ScoredResume>>;

    /// Idempotently insert a match record, keyed by `(job_id, workflow_run)`.
    async fn insert_match(&self, record: MatchRecord) -> Result<()>;

    /// Idempotently insert an unmatched record, keyed by `(job_id, workflow_run)`.
    async fn insert_unmatched(&self, record: UnmatchedRecord) -> Result<()>;

    /// Atomically write a checkpoint, superseding any prior checkpoint
    /// with the same `workflow_type`.
    async fn write_checkpoint(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Read the most recently written checkpoint for `workflow_type`, if any.
    async fn read_latest_checkpoint(&self, workflow_type: &str) -> Result<Option<Checkpoint>>;

    /// Count of persisted match records.
    async fn count_matches(&self) -> Result<u64>;

    /// Count of persisted unmatched records.
    async fn count_unmatched(&self) -> Result<u64>;

    /// Whether `job_id` already has a match or unmatched record.
    async fn is_job_processed(&self, job_id: &str) -> Result<bool>;
}

/// An in-memory [`DocumentStore`] used for tests and as a runnable
/// reference implementation. Vector search is a brute-force dot product
/// over the in-memory resume set; this is adequate for tests and small
/// corpora, not for production scale.
#[derive(Default)]
pub struct InMemoryStore {
    jobs: Mutex<Vec<Job>>,
    resumes: Mutex<Vec<Resume>>,
    matches: Mutex<HashMap<(String, String), MatchRecord>>,
    unmatched: Mutex<HashMap<(String, String), UnmatchedRecord>>,
    checkpoints: Mutex<HashMap<String, Checkpoint>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with jobs, replacing any existing ones.
    pub fn with_jobs(self, jobs: Vec<Job>) -> Self {
        *self.jobs.lock().expect("jobs mutex poisoned") = jobs;
        self
    }

    /// Seed the store with resumes, replacing any existing ones.
    pub fn with_resumes(self, resumes: Vec<Resume>) -> Self {
        *self.resumes.lock().expect("resumes mutex poisoned") = resumes;
        self
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum()
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_eligible_jobs(&self, config: &Config) -> Result<Vec<Job>> {
        let jobs = self.jobs.lock().expect("jobs mutex poisoned");
        let mut out = Vec::new();

        for job in jobs.iter() {
            if !job.is_eligible() {
                continue;
            }
            if !config.search_terms.is_empty() {
                let matches_term = job
                    .search_term
                    .as_ref()
                    .is_some_and(|t| config.search_terms.contains(t));
                if !matches_term {
                    continue;
                }
            }
            if config.skip_processed_jobs && !config.force_reprocess {
                let processed = self.is_job_processed(&job.id).await?;
                if processed {
                    continue;
                }
            }
            out.push(job.clone());
            if let Some(limit) = config.max_jobs {
                if out.len() as u64 >= limit {
                    break;
                }
            }
        }

        Ok(out)
    }

    async fn list_resumes_by_industry(&self, prefixes: &[String]) -> Result<Vec<Resume>> {
        let resumes = self.resumes.lock().expect("resumes mutex poisoned");
        if prefixes.is_empty() {
            return Ok(resumes.iter().filter(|r| r.is_eligible()).cloned().collect());
        }
        Ok(resumes
            .iter()
            .filter(|r| r.is_eligible() && prefixes.contains(&r.industry_prefix))
            .cloned()
            .collect())
    }

    async fn vector_search(
        &self,
        query_vector: &[f32],
        num_candidates: usize,
        limit: usize,
        _index_name: &str,
        candidate_ids: &HashSet<String>,
    ) -> Result<Vec<ScoredResume>> {
        let resumes = self.resumes.lock().expect("resumes mutex poisoned");

        let mut scored: Vec<ScoredResume> = resumes
            .iter()
            .filter(|r| candidate_ids.is_empty() || candidate_ids.contains(&r.id))
            .filter(|r| r.is_eligible())
            .take(num_candidates.max(limit))
            .map(|r| ScoredResume {
                resume: r.clone(),
                raw_score: dot(query_vector, &r.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.raw_score.partial_cmp(&a.raw_score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn insert_match(&self, record: MatchRecord) -> Result<()> {
        let key = (record.job.job_id.clone(), record.workflow_run.clone());
        let mut matches = self.matches.lock().expect("matches mutex poisoned");
        matches.entry(key).or_insert(record);
        Ok(())
    }

    async fn insert_unmatched(&self, record: UnmatchedRecord) -> Result<()> {
        let key = (record.job.job_id.clone(), record.workflow_run.clone());
        let mut unmatched = self.unmatched.lock().expect("unmatched mutex poisoned");
        unmatched.entry(key).or_insert(record);
        Ok(())
    }

    async fn write_checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut checkpoints = self.checkpoints.lock().expect("checkpoints mutex poisoned");
        checkpoints.insert(checkpoint.workflow_type.clone(), checkpoint);
        Ok(())
    }

    async fn read_latest_checkpoint(&self, workflow_type: &str) -> Result<Option<Checkpoint>> {
        let checkpoints = self.checkpoints.lock().expect("checkpoints mutex poisoned");
        Ok(checkpoints.get(workflow_type).cloned())
    }

    async fn count_matches(&self) -> Result<u64> {
        Ok(self.matches.lock().expect("matches mutex poisoned").len() as u64)
    }

    async fn count_unmatched(&self) -> Result<u64> {
        Ok(self.unmatched.lock().expect("unmatched mutex poisoned").len() as u64)
    }

    async fn is_job_processed(&self, job_id: &str) -> Result<bool> {
        let matched = self
            .matches
            .lock()
            .expect("matches mutex poisoned")
            .keys()
            .any(|(id, _)| id == job_id);
        if matched {
            return Ok(true);
        }
        Ok(self
            .unmatched
            .lock()
            .expect("unmatched mutex poisoned")
            .keys()
            .any(|(id, _)| id == job_id))
    }
}

/// Maps a store-level failure onto the engine's retry taxonomy: an
/// unavailable store is transient, a rejected write is permanent, and a
/// conflict is treated as success by the caller (not surfaced as an error).
pub fn classify_store_failure(message: impl Into<String>, permanent: bool) -> EngineError {
    let message = message.into();
    if permanent {
        EngineError::StoreRejected { message }
    } else {
        EngineError::StoreUnavailable { message }
    }
}
