//! Domain types shared across the matching pipeline.
//!
//! These are the records that flow `DocumentStore` → `CandidateRecall` →
//! `Validator` → `MatchDecider` → `Persistor`. Jobs and Resumes are
//! borrowed read-only by the engine; `MatchRecord`/`UnmatchedRecord` are
//! produced by the `Persistor` and transferred back to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A posting to match against the resume corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Stable identifier.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Hiring company.
    pub company: String,
    /// Location, if known.
    #[serde(default)]
    pub location: Option<String>,
    /// Free-text description.
    pub description: String,
    /// Direct application link.
    #[serde(default)]
    pub job_link: Option<String>,
    /// Recall embedding vector; same dimensionality as Resume embeddings.
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Whether upstream extraction succeeded.
    pub extraction_success: bool,
    /// The search term this job was collected under, if any.
    #[serde(default)]
    pub search_term: Option<String>,
    /// Externally assigned batch tag; opaque to the engine.
    #[serde(default)]
    pub cycle: Option<String>,
    /// Optional structured hints extracted from the description.
    #[serde(default)]
    pub hints: JobHints,
}

impl Job {
    /// A Job is eligible for matching only if it carries a non-empty
    /// embedding and its extraction succeeded.
    pub fn is_eligible(&self) -> bool {
        self.extraction_success && !self.embedding.is_empty()
    }
}

/// Optional structured requirements extracted from a job description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobHints {
    /// Required skills, if extracted.
    #[serde(default)]
    pub required_skills: Vec<String>,
    /// Required experience level or years, if extracted.
    #[serde(default)]
    pub required_experience: Option<String>,
    /// Required education level, if extracted.
    #[serde(default)]
    pub required_education: Option<String>,
}

/// A candidate document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    /// Stable identifier.
    pub id: String,
    /// File identifier of the source document.
    pub file_id: String,
    /// Structured resume payload (typed view over a loosely-shaped source document).
    pub payload: ResumePayload,
    /// Derived key-metrics summary.
    pub key_metrics: KeyMetrics,
    /// Industry-prefix tag used by the coarse recall filter.
    pub industry_prefix: String,
    /// Text embedding vector; same dimensionality as Job embeddings.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Resume {
    /// A Resume is eligible for recall only if its embedding is non-empty.
    pub fn is_eligible(&self) -> bool {
        !self.embedding.is_empty()
    }
}

/// Derived summary metrics computed externally from a resume's content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyMetrics {
    /// Seniority bucket (e.g. "senior", "mid", "junior").
    #[serde(default)]
    pub experience_level: Option<String>,
    /// Primary industry sector inferred from the resume.
    #[serde(default)]
    pub primary_industry: Option<String>,
    /// Total years of professional experience.
    #[serde(default)]
    pub total_experience_years: Option<f64>,
}

/// A typed view over a resume's nested sections. The source document may
/// be loosely shaped (and occasionally double-nested); callers that need
/// the raw shape for LLM-prompt construction can keep `raw` alongside
/// this typed projection rather than threading an untyped map through
/// business logic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Basic identifying information (name, contact, summary).
    #[serde(default)]
    pub basics: Option<serde_json::Value>,
    /// Work experience entries.
    #[serde(default)]
    pub work_experience: Option<serde_json::Value>,
    /// Education entries.
    #[serde(default)]
    pub education: Option<serde_json::Value>,
    /// Skills listing.
    #[serde(default)]
    pub skills: Option<serde_json::Value>,
    /// The raw, possibly loosely-shaped source document, retained only
    /// for prompt construction.
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// A per-candidate record produced during one job's evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShortlistEntry {
    /// Resume identifier.
    pub resume_id: String,
    /// File identifier of the source document.
    pub file_id: String,
    /// Normalized vector similarity score, in `[0, 1]`.
    pub similarity_score: f64,
    /// LLM-assigned score, in `[0, 100]`.
    pub llm_score: u32,
    /// Rank within the shortlist; 1 is best.
    pub rank: u32,
    /// One-sentence summary produced by the LLM.
    pub summary: String,
    /// Whether `llm_score >= validation_threshold`.
    pub is_valid: bool,
}

/// Status tag recorded on a persisted match or unmatched record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// A valid match was found and persisted.
    #[serde(rename = "VALIDATED")]
    Validated,
    /// No shortlist entry met the validation threshold.
    #[serde(rename = "NO_VALID_MATCH")]
    NoValidMatch,
}

/// A job reference snapshot embedded in persisted records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReference {
    /// Job id.
    pub job_id: String,
    /// Job title at match time.
    pub title: String,
    /// Hiring company at match time.
    pub company: String,
    /// Location at match time.
    pub location: Option<String>,
    /// Full description at match time.
    pub description: String,
    /// Direct application link.
    pub job_link: Option<String>,
}

impl From<&Job> for JobReference {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            description: job.description.clone(),
            job_link: job.job_link.clone(),
        }
    }
}

/// Persisted when at least one shortlist entry is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    /// The job this record was produced for.
    pub job: JobReference,
    /// The chosen resume's full payload.
    pub resume: Resume,
    /// The full shortlist considered for this job.
    pub shortlist: Vec<ShortlistEntry>,
    /// The chosen entry's similarity score, copied for convenient access.
    pub chosen_similarity_score: f64,
    /// The chosen entry's LLM score, copied for convenient access.
    pub chosen_llm_score: u32,
    /// The chosen entry's summary, copied for convenient access.
    pub chosen_summary: String,
    /// Always `VALIDATED` for a `MatchRecord`.
    pub status: MatchStatus,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When the match was validated by the LLM.
    pub validated_at: DateTime<Utc>,
    /// Idempotency marker for the run that produced this record.
    pub workflow_run: String,
}

/// Persisted when the shortlist has no valid entries, including the
/// degenerate empty case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmatchedRecord {
    /// The job this record was produced for.
    pub job: JobReference,
    /// The shortlist considered, possibly empty.
    pub shortlist: Vec<ShortlistEntry>,
    /// Always `NO_VALID_MATCH` for an `UnmatchedRecord`.
    pub status: MatchStatus,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// Idempotency marker for the run that produced this record.
    pub workflow_run: String,
}

/// A durable cursor for resumability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Job ids processed as of this checkpoint.
    pub processed_job_ids: Vec<String>,
    /// When this checkpoint was written.
    pub timestamp: DateTime<Utc>,
    /// Engine status tag (e.g. "in_progress", "completed").
    pub status: String,
    /// Snapshot of performance metrics at checkpoint time.
    pub metrics_snapshot: PerformanceSnapshot,
    /// Namespace distinguishing checkpoints across differently-configured runs.
    pub workflow_type: String,
}

/// In-memory counters and histograms tracked during a run.
#[derive(Debug, Default)]
pub struct PerformanceMetrics {
    /// Resume cache hits.
    pub cache_hits: std::sync::atomic::AtomicU64,
    /// Resume cache misses.
    pub cache_misses: std::sync::atomic::AtomicU64,
    /// Jobs for which an outcome was recorded.
    pub jobs_processed: std::sync::atomic::AtomicU64,
    /// Jobs that produced a `MatchRecord`.
    pub matched: std::sync::atomic::AtomicU64,
    /// Jobs that produced an `UnmatchedRecord` with a non-empty shortlist.
    pub no_valid_match: std::sync::atomic::AtomicU64,
    /// Jobs that produced an `UnmatchedRecord` with an empty shortlist.
    pub no_resumes_found: std::sync::atomic::AtomicU64,
    /// Jobs that errored without persistence.
    pub errors: std::sync::atomic::AtomicU64,
    /// Recorded vector-search call durations, in milliseconds.
    pub vector_search_durations_ms: std::sync::Mutex<Vec<u64>>,
    /// Recorded LLM validation call durations, in milliseconds.
    pub llm_validation_durations_ms: std::sync::Mutex<Vec<u64>>,
}

impl PerformanceMetrics {
    /// Build a point-in-time, serializable snapshot of the current counters.
    pub fn snapshot(&self) -> PerformanceSnapshot {
        use std::sync::atomic::Ordering;
        PerformanceSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            jobs_processed: self.jobs_processed.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            no_valid_match: self.no_valid_match.load(Ordering::Relaxed),
            no_resumes_found: self.no_resumes_found.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            avg_vector_search_ms: average(&self.vector_search_durations_ms),
            avg_llm_validation_ms: average(&self.llm_validation_durations_ms),
        }
    }
}

fn average(samples: &std::sync::Mutex<Vec<u64>>) -> Option<f64> {
    let samples = samples.lock().expect("metrics mutex poisoned");
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<u64>() as f64 / samples.len() as f64)
}

/// A serializable, point-in-time snapshot of [`PerformanceMetrics`],
/// embedded in a [`Checkpoint`] and returned as part of [`WorkflowSummary`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    /// Resume cache hits.
    pub cache_hits: u64,
    /// Resume cache misses.
    pub cache_misses: u64,
    /// Jobs for which an outcome was recorded.
    pub jobs_processed: u64,
    /// Jobs that produced a `MatchRecord`.
    pub matched: u64,
    /// Jobs that produced an `UnmatchedRecord` with a non-empty shortlist.
    pub no_valid_match: u64,
    /// Jobs that produced an `UnmatchedRecord` with an empty shortlist.
    pub no_resumes_found: u64,
    /// Jobs that errored without persistence.
    pub errors: u64,
    /// Mean vector-search duration in milliseconds, if any were recorded.
    pub avg_vector_search_ms: Option<f64>,
    /// Mean LLM validation duration in milliseconds, if any were recorded.
    pub avg_llm_validation_ms: Option<f64>,
}

/// Final report returned by `WorkflowEngine::run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    /// Counts of jobs per terminal state, plus totals.
    pub metrics: PerformanceSnapshot,
    /// The effective configuration used for this run, as a TOML-serializable map.
    pub config_snapshot: HashMap<String, serde_json::Value>,
    /// Identifier of the workflow run these counts belong to.
    pub workflow_run: String,
    /// Whether the run completed all batches or stopped early (cancellation/fatal abort).
    pub completed: bool,
}
