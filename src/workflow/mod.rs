//! Orchestrates the end-to-end matching pipeline: batching, bounded
//! concurrency, checkpointing, memory-pressure cache eviction, and metrics.

pub mod retry;

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::ResumeCache;
use crate::config::Config;
use crate::decider::MatchDecider;
use crate::error::{EngineError, Result};
use crate::llm::LlmClient;
use crate::memory::MemoryMonitor;
use crate::model::{Checkpoint, Job, PerformanceMetrics, PerformanceSnapshot, Resume, WorkflowSummary};
use crate::persistor::{PersistOutcome, Persistor};
use crate::recall::CandidateRecall;
use crate::store::DocumentStore;
use crate::validator::Validator;
use crate::workflow::retry::{retry_with_backoff, RetryPolicy};

/// The external dependencies a `WorkflowEngine` run needs, gathered into
/// one struct rather than passed as module-level singletons so lifecycle
/// and substitution (tests, alternate backends) are explicit at the call
/// site.
pub struct Services {
    /// Backing document store.
    pub store: Arc<dyn DocumentStore>,
    /// LLM client used for validation.
    pub llm: Arc<dyn LlmClient>,
    /// Memory monitor used for cache-eviction decisions.
    pub memory: Arc<dyn MemoryMonitor>,
}

/// Orchestrates one end-to-end run of the matching pipeline over the jobs
/// returned by `DocumentStore::list_eligible_jobs`.
pub struct WorkflowEngine {
    services: Services,
    recall: Arc<CandidateRecall>,
    validator: Arc<Validator>,
    cache: Arc<ResumeCache>,
    metrics: Arc<PerformanceMetrics>,
    workflow_run: String,
}

impl WorkflowEngine {
    /// Build an engine for one run, identified by `workflow_run` (used as
    /// half of the idempotency key on every persisted record).
    pub fn new(services: Services, config: &Config, workflow_run: impl Into<String>) -> Self {
        let validator = Validator::new(Arc::clone(&services.llm));
        let cache = ResumeCache::new(std::time::Duration::from_secs(config.cache_ttl));
        Self {
            recall: Arc::new(CandidateRecall::with_default_normalizer()),
            validator: Arc::new(validator),
            cache: Arc::new(cache),
            metrics: Arc::new(PerformanceMetrics::default()),
            services,
            workflow_run: workflow_run.into(),
        }
    }

    /// Run the full pipeline to completion (or until a fatal store error
    /// aborts it), returning a summary of the run.
    pub async fn run(&self, config: &Config) -> Result<WorkflowSummary> {
        let jobs = self.services.store.list_eligible_jobs(config).await?;
        log::info!("workflow run {}: {} eligible job(s)", self.workflow_run, jobs.len());

        let mut completed = true;
        let mut cumulative_processed: u64 = 0;
        let mut processed_job_ids: Vec<String> = Vec::new();

        'batches: for batch in jobs.chunks(config.batch_size.max(1) as usize) {
            match self.run_batch(batch, config).await {
                Ok(ids) => processed_job_ids.extend(ids),
                Err(e) => {
                    log::error!("workflow run {}: aborting on fatal batch error: {e}", self.workflow_run);
                    completed = false;
                    break 'batches;
                }
            }

            cumulative_processed += batch.len() as u64;

            if cumulative_processed % u64::from(config.checkpoint_interval.max(1)) < batch.len() as u64 {
                self.write_checkpoint(config, &processed_job_ids, "in_progress").await?;
            }

            if cumulative_processed % (2 * u64::from(config.checkpoint_interval.max(1))) < batch.len() as u64 {
                self.poll_memory_and_maybe_clear_cache(config);
            }
        }

        self.write_checkpoint(config, &processed_job_ids, if completed { "completed" } else { "aborted" })
            .await?;

        Ok(WorkflowSummary {
            metrics: self.metrics.snapshot(),
            config_snapshot: config_snapshot(config),
            workflow_run: self.workflow_run.clone(),
            completed,
        })
    }

    async fn run_batch(&self, batch: &[Job], config: &Config) -> Result<Vec<String>> {
        let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1) as usize));
        let mut tasks = JoinSet::new();

        for job in batch.iter().cloned() {
            let permit = Arc::clone(&semaphore);
            let recall = Arc::clone(&self.recall);
            let validator = Arc::clone(&self.validator);
            let store = Arc::clone(&self.services.store);
            let cache = Arc::clone(&self.cache);
            let metrics = Arc::clone(&self.metrics);
            let workflow_run = self.workflow_run.clone();
            let config = config.clone();

            tasks.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore closed");
                process_job(job, &config, store, &recall, &validator, &cache, &metrics, &workflow_run).await
            });
        }

        let mut processed_ids = Vec::with_capacity(batch.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(job_id)) => processed_ids.push(job_id),
                Ok(Err(e)) if matches!(e.category(), crate::error::Category::Fatal) => return Err(e),
                Ok(Err(_)) => {
                    // Per-job errors are already recorded in metrics by `process_job`;
                    // the job is left unprocessed so a future run can retry it.
                }
                Err(join_err) => {
                    log::error!("workflow run {}: task panicked: {join_err}", self.workflow_run);
                    self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        Ok(processed_ids)
    }

    async fn write_checkpoint(&self, config: &Config, processed_job_ids: &[String], status: &str) -> Result<()> {
        let checkpoint = Checkpoint {
            processed_job_ids: processed_job_ids.to_vec(),
            timestamp: Utc::now(),
            status: status.to_string(),
            metrics_snapshot: self.metrics.snapshot(),
            workflow_type: config.workflow_type.clone(),
        };
        log::info!(
            "workflow run {}: writing checkpoint ({} jobs, status={status})",
            self.workflow_run,
            processed_job_ids.len()
        );
        self.services.store.write_checkpoint(checkpoint).await
    }

    fn poll_memory_and_maybe_clear_cache(&self, config: &Config) {
        let resident_mb = self.services.memory.resident_mb();
        log::debug!("workflow run {}: resident memory {resident_mb} MB", self.workflow_run);
        if resident_mb > config.memory_limit_mb {
            log::info!(
                "workflow run {}: resident memory {resident_mb} MB exceeds limit {} MB; clearing resume cache",
                self.workflow_run,
                config.memory_limit_mb
            );
            self.cache.clear();
        }
    }

    /// Read the last checkpoint for this run's `workflow_type`, if any.
    pub async fn resume_from_checkpoint(&self, config: &Config) -> Result<Option<Checkpoint>> {
        self.services.store.read_latest_checkpoint(&config.workflow_type).await
    }

    /// A point-in-time snapshot of run counters, for operational dashboards.
    pub fn processing_statistics(&self) -> PerformanceSnapshot {
        self.metrics.snapshot()
    }

    /// Heuristic, human-readable suggestions derived from current metrics.
    /// Purely advisory; never consulted by the pipeline itself.
    pub fn performance_recommendations(&self) -> Vec<String> {
        let snapshot = self.metrics.snapshot();
        let mut recommendations = Vec::new();

        if snapshot.cache_hits + snapshot.cache_misses > 0 {
            let hit_rate = snapshot.cache_hits as f64 / (snapshot.cache_hits + snapshot.cache_misses) as f64;
            if hit_rate < 0.5 {
                recommendations.push(format!(
                    "resume cache hit rate is low ({:.0}%); consider a longer cache_ttl or fewer distinct industry prefixes",
                    hit_rate * 100.0
                ));
            }
        }

        if let Some(avg) = snapshot.avg_llm_validation_ms {
            if avg > 5000.0 {
                recommendations.push(format!(
                    "average LLM validation call took {avg:.0}ms; consider a smaller max_workers or a faster model"
                ));
            }
        }

        if snapshot.jobs_processed > 0 {
            let error_rate = snapshot.errors as f64 / snapshot.jobs_processed as f64;
            if error_rate > 0.1 {
                recommendations.push(format!(
                    "error rate is {:.0}%; check retry_attempts and document store availability",
                    error_rate * 100.0
                ));
            }
        }

        recommendations
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_job(
    job: Job,
    config: &Config,
    store: Arc<dyn DocumentStore>,
    recall: &CandidateRecall,
    validator: &Validator,
    cache: &ResumeCache,
    metrics: &Arc<PerformanceMetrics>,
    workflow_run: &str,
) -> Result<String> {
    let policy = RetryPolicy::from_config(config);

    let candidates = retry_with_backoff(policy, "recall", || {
        recall.recall(&job, config, store.as_ref(), cache, metrics)
    })
    .await;

    let candidates = match candidates {
        Ok(c) => c,
        Err(e) => {
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            metrics.jobs_processed.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }
    };

    if candidates.is_empty() {
        let decision = MatchDecider::no_resumes_found();
        finish_job(&job, decision, &store, workflow_run, metrics, |_| None).await
    } else {
        let resume_by_id: HashMap<String, Resume> =
            candidates.iter().map(|c| (c.resume.id.clone(), c.resume.clone())).collect();

        let validation = retry_with_backoff(policy, "validate", || {
            validator.validate(&job, &candidates, config, metrics)
        })
        .await;

        let decision = match validation {
            Ok(outcome) => MatchDecider::decide(&job.id, &candidates, &outcome),
            Err(e) => MatchDecider::validation_error(e),
        };

        finish_job(&job, decision, &store, workflow_run, metrics, move |id| resume_by_id.get(id).cloned()).await
    }
}

async fn finish_job(
    job: &Job,
    decision: crate::decider::Decision,
    store: &Arc<dyn DocumentStore>,
    workflow_run: &str,
    metrics: &Arc<PerformanceMetrics>,
    resolve_resume: impl Fn(&str) -> Option<Resume>,
) -> Result<String> {
    metrics.jobs_processed.fetch_add(1, Ordering::Relaxed);

    match Persistor::persist(store.as_ref(), job, decision, resolve_resume, workflow_run).await {
        Ok(PersistOutcome::Matched) => {
            metrics.matched.fetch_add(1, Ordering::Relaxed);
            Ok(job.id.clone())
        }
        Ok(PersistOutcome::NoValidMatch) => {
            metrics.no_valid_match.fetch_add(1, Ordering::Relaxed);
            Ok(job.id.clone())
        }
        Ok(PersistOutcome::NoResumesFound) => {
            metrics.no_resumes_found.fetch_add(1, Ordering::Relaxed);
            Ok(job.id.clone())
        }
        Err(e) => {
            log::error!("job {}: terminal error: {e}", job.id);
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            Err(e)
        }
    }
}

fn config_snapshot(config: &Config) -> HashMap<String, serde_json::Value> {
    serde_json::to_value(config)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .map(|obj| obj.into_iter().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmClient;
    use crate::memory::ScriptedMemoryMonitor;
    use crate::model::{JobHints, KeyMetrics, ResumePayload};
    use crate::store::InMemoryStore;
    use async_trait::async_trait;

    struct StubLlm;

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn generate(&self, _prompt: &str, _model: &str) -> Result<String> {
            Ok(r#"{"candidates": [{"candidate_id": "r1", "rank": 1, "score": 90, "summary": "great fit", "is_valid": true}], "best_match": "r1"}"#.to_string())
        }
    }

    fn job(id: &str) -> Job {
        Job {
            id: id.to_string(),
            title: "Engineer".into(),
            company: "Acme".into(),
            location: None,
            description: "desc".into(),
            job_link: None,
            embedding: vec![1.0, 0.0],
            extraction_success: true,
            search_term: None,
            cycle: None,
            hints: JobHints::default(),
        }
    }

    fn resume(id: &str, prefix: &str) -> Resume {
        Resume {
            id: id.to_string(),
            file_id: format!("{id}-file"),
            payload: ResumePayload::default(),
            key_metrics: KeyMetrics::default(),
            industry_prefix: prefix.to_string(),
            embedding: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn test_workflow_run_matches_eligible_job() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_jobs(vec![job("j1")])
                .with_resumes(vec![resume("r1", "tech"), resume("r2", "tech")]),
        );
        let mut config = Config::default();
        config.industry_prefixes = vec!["tech".to_string()];
        config.similarity_threshold = 0.1;
        config.checkpoint_interval = 1;

        let services = Services {
            store: store.clone(),
            llm: Arc::new(StubLlm),
            memory: Arc::new(ScriptedMemoryMonitor::new(vec![100])),
        };

        let engine = WorkflowEngine::new(services, &config, "run-1");
        let summary = engine.run(&config).await.unwrap();

        assert!(summary.completed);
        assert_eq!(summary.metrics.matched, 1);
        assert_eq!(store.count_matches().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_workflow_run_handles_no_resumes_found() {
        let store = Arc::new(InMemoryStore::new().with_jobs(vec![job("j1")]));
        let config = Config::default();

        let services = Services {
            store: store.clone(),
            llm: Arc::new(StubLlm),
            memory: Arc::new(ScriptedMemoryMonitor::new(vec![100])),
        };

        let engine = WorkflowEngine::new(services, &config, "run-2");
        let summary = engine.run(&config).await.unwrap();

        assert_eq!(summary.metrics.no_resumes_found, 1);
        assert_eq!(store.count_unmatched().await.unwrap(), 1);
    }

    #[test]
    fn test_performance_recommendations_flags_high_error_rate() {
        let services = Services {
            store: Arc::new(InMemoryStore::new()),
            llm: Arc::new(StubLlm),
            memory: Arc::new(ScriptedMemoryMonitor::new(vec![100])),
        };
        let config = Config::default();
        let engine = WorkflowEngine::new(services, &config, "run-3");
        engine.metrics.jobs_processed.store(10, Ordering::Relaxed);
        engine.metrics.errors.store(5, Ordering::Relaxed);

        let recs = engine.performance_recommendations();
        assert!(recs.iter().any(|r| r.contains("error rate")));
    }
}
