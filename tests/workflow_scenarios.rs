//! Integration tests exercising the per-job state machine end to end
//! against an in-memory store and a scriptable LLM double.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use resume_match_engine::config::Config;
use resume_match_engine::memory::ScriptedMemoryMonitor;
use resume_match_engine::model::{Job, JobHints, KeyMetrics, Resume, ResumePayload};
use resume_match_engine::store::InMemoryStore;
use resume_match_engine::{EngineError, Result, Services, WorkflowEngine};
use resume_match_engine::llm::LlmClient;

/// Returns one scripted response per call, in order; repeats the last
/// response once exhausted.
struct ScriptedLlm {
    responses: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: responses.into_iter().map(str::to_string).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, _prompt: &str, _model: &str) -> Result<String> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        let idx = idx.min(self.responses.len() - 1);
        Ok(self.responses[idx].clone())
    }
}

struct AlwaysErrorLlm;

#[async_trait]
impl LlmClient for AlwaysErrorLlm {
    async fn generate(&self, _prompt: &str, _model: &str) -> Result<String> {
        Ok("sorry, I can't do that".to_string())
    }
}

fn job(id: &str, search_term: Option<&str>) -> Job {
    Job {
        id: id.to_string(),
        title: "Backend Engineer".into(),
        company: "Acme".into(),
        location: Some("Remote".into()),
        description: "Build and operate backend services.".into(),
        job_link: None,
        embedding: vec![1.0, 0.0],
        extraction_success: true,
        search_term: search_term.map(str::to_string),
        cycle: None,
        hints: JobHints::default(),
    }
}

fn resume(id: &str, prefix: &str, embedding: Vec<f32>) -> Resume {
    Resume {
        id: id.to_string(),
        file_id: format!("{id}-file"),
        payload: ResumePayload::default(),
        key_metrics: KeyMetrics::default(),
        industry_prefix: prefix.to_string(),
        embedding,
    }
}

/// Wires `log` into `RUST_LOG`-filterable output for this test binary; safe
/// to call from every test since `try_init` is a no-op after the first call.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn base_config() -> Config {
    let mut config = Config::default();
    config.industry_prefixes = vec!["tech".to_string()];
    config.similarity_threshold = 0.3;
    config.validation_threshold = 70;
    config.top_k = 3;
    config.checkpoint_interval = 1;
    config
}

#[tokio::test]
async fn s1_happy_path_produces_match_record() {
    init_logging();
    let store = Arc::new(
        InMemoryStore::new()
            .with_jobs(vec![job("j1", None)])
            .with_resumes(vec![
                resume("r1", "tech", vec![0.9, 0.1]),
                resume("r2", "tech", vec![0.6, 0.4]),
            ]),
    );
    let llm = ScriptedLlm::new(vec![
        r#"{"candidates": [
            {"candidate_id": "r1", "rank": 1, "score": 88, "summary": "strong match", "is_valid": true},
            {"candidate_id": "r2", "rank": 2, "score": 64, "summary": "weak match", "is_valid": false}
        ], "best_match": "r1"}"#,
    ]);

    let config = base_config();
    let services = Services {
        store: store.clone(),
        llm: Arc::new(llm),
        memory: Arc::new(ScriptedMemoryMonitor::new(vec![100])),
    };

    let engine = WorkflowEngine::new(services, &config, "s1-run");
    let summary = engine.run(&config).await.expect("run should succeed");

    assert!(summary.completed);
    assert_eq!(summary.metrics.matched, 1);
    assert_eq!(store.count_matches().await.unwrap(), 1);
    assert_eq!(store.count_unmatched().await.unwrap(), 0);
}

#[tokio::test]
async fn s2_no_candidate_meets_threshold_produces_unmatched_with_shortlist() {
    init_logging();
    let store = Arc::new(
        InMemoryStore::new()
            .with_jobs(vec![job("j1", None)])
            .with_resumes(vec![
                resume("r1", "tech", vec![0.9, 0.1]),
                resume("r2", "tech", vec![0.6, 0.4]),
            ]),
    );
    let llm = ScriptedLlm::new(vec![
        r#"{"candidates": [
            {"candidate_id": "r1", "rank": 1, "score": 68, "summary": "borderline", "is_valid": false},
            {"candidate_id": "r2", "rank": 2, "score": 55, "summary": "weak", "is_valid": false}
        ], "best_match": "r1"}"#,
    ]);

    let config = base_config();
    let services = Services {
        store: store.clone(),
        llm: Arc::new(llm),
        memory: Arc::new(ScriptedMemoryMonitor::new(vec![100])),
    };

    let engine = WorkflowEngine::new(services, &config, "s2-run");
    let summary = engine.run(&config).await.expect("run should succeed");

    assert_eq!(summary.metrics.matched, 0);
    assert_eq!(summary.metrics.no_valid_match, 1);
    assert_eq!(store.count_matches().await.unwrap(), 0);
    assert_eq!(store.count_unmatched().await.unwrap(), 1);
}

#[tokio::test]
async fn s3_recall_empty_produces_unmatched_with_empty_shortlist() {
    init_logging();
    let store = Arc::new(
        InMemoryStore::new()
            .with_jobs(vec![job("j1", None)])
            .with_resumes(vec![resume("r1", "finance", vec![0.9, 0.1])]),
    );

    let mut config = base_config();
    config.industry_prefixes = vec!["tech".to_string()];

    let services = Services {
        store: store.clone(),
        llm: Arc::new(ScriptedLlm::new(vec!["{}"])),
        memory: Arc::new(ScriptedMemoryMonitor::new(vec![100])),
    };

    let engine = WorkflowEngine::new(services, &config, "s3-run");
    let summary = engine.run(&config).await.expect("run should succeed");

    assert_eq!(summary.metrics.no_resumes_found, 1);
    assert_eq!(store.count_matches().await.unwrap(), 0);
    assert_eq!(store.count_unmatched().await.unwrap(), 1);
}

#[tokio::test]
async fn s4_malformed_validator_response_writes_nothing() {
    init_logging();
    let store = Arc::new(
        InMemoryStore::new()
            .with_jobs(vec![job("j1", None)])
            .with_resumes(vec![
                resume("r1", "tech", vec![0.9, 0.1]),
                resume("r2", "tech", vec![0.6, 0.4]),
            ]),
    );

    let mut config = base_config();
    config.retry_attempts = 1;

    let services = Services {
        store: store.clone(),
        llm: Arc::new(AlwaysErrorLlm),
        memory: Arc::new(ScriptedMemoryMonitor::new(vec![100])),
    };

    let engine = WorkflowEngine::new(services, &config, "s4-run");
    let summary = engine.run(&config).await.expect("a non-fatal per-job error does not abort the run");

    assert_eq!(summary.metrics.matched, 0);
    assert_eq!(summary.metrics.no_valid_match, 0);
    assert_eq!(summary.metrics.no_resumes_found, 0);
    assert_eq!(summary.metrics.errors, 1);
    assert_eq!(store.count_matches().await.unwrap(), 0);
    assert_eq!(store.count_unmatched().await.unwrap(), 0);
}

#[tokio::test]
async fn s5_rerun_with_skip_processed_jobs_writes_nothing_new() {
    init_logging();
    let store = Arc::new(
        InMemoryStore::new()
            .with_jobs(vec![job("j1", None)])
            .with_resumes(vec![
                resume("r1", "tech", vec![0.9, 0.1]),
                resume("r2", "tech", vec![0.6, 0.4]),
            ]),
    );
    let response = r#"{"candidates": [
        {"candidate_id": "r1", "rank": 1, "score": 88, "summary": "strong match", "is_valid": true},
        {"candidate_id": "r2", "rank": 2, "score": 64, "summary": "weak match", "is_valid": false}
    ], "best_match": "r1"}"#;

    let mut config = base_config();
    config.skip_processed_jobs = true;

    let services = Services {
        store: store.clone(),
        llm: Arc::new(ScriptedLlm::new(vec![response])),
        memory: Arc::new(ScriptedMemoryMonitor::new(vec![100])),
    };
    let engine = WorkflowEngine::new(services, &config, "s5-run");
    engine.run(&config).await.unwrap();
    assert_eq!(store.count_matches().await.unwrap(), 1);

    // Re-running with the same workflow_run: list_eligible_jobs now excludes
    // j1 because it already has a match, so the second run is a no-op.
    let services_again = Services {
        store: store.clone(),
        llm: Arc::new(ScriptedLlm::new(vec![response])),
        memory: Arc::new(ScriptedMemoryMonitor::new(vec![100])),
    };
    let engine_again = WorkflowEngine::new(services_again, &config, "s5-run");
    let summary = engine_again.run(&config).await.unwrap();

    assert_eq!(summary.metrics.jobs_processed, 0);
    assert_eq!(store.count_matches().await.unwrap(), 1);
}

#[tokio::test]
async fn s6_parallel_workers_reach_the_same_outcome_as_a_single_worker() {
    init_logging();
    let jobs: Vec<Job> = (0..20).map(|i| job(&format!("j{i}"), None)).collect();
    let resumes = vec![
        resume("r1", "tech", vec![0.9, 0.1]),
        resume("r2", "tech", vec![0.6, 0.4]),
    ];
    let response = r#"{"candidates": [
        {"candidate_id": "r1", "rank": 1, "score": 88, "summary": "strong match", "is_valid": true},
        {"candidate_id": "r2", "rank": 2, "score": 64, "summary": "weak match", "is_valid": false}
    ], "best_match": "r1"}"#;

    async fn run_with_workers(jobs: Vec<Job>, resumes: Vec<Resume>, max_workers: u32, response: &str) -> Vec<String> {
        let store = Arc::new(InMemoryStore::new().with_jobs(jobs).with_resumes(resumes));
        let mut config = base_config();
        config.max_workers = max_workers;
        let services = Services {
            store: store.clone(),
            llm: Arc::new(ScriptedLlm::new(vec![response])),
            memory: Arc::new(ScriptedMemoryMonitor::new(vec![100])),
        };
        let engine = WorkflowEngine::new(services, &config, "s6-run");
        engine.run(&config).await.unwrap();

        let mut matched_jobs: Vec<String> = Vec::new();
        for job in store.list_eligible_jobs(&Config { skip_processed_jobs: false, ..config }).await.unwrap() {
            if store.is_job_processed(&job.id).await.unwrap() {
                matched_jobs.push(job.id);
            }
        }
        matched_jobs.sort();
        matched_jobs
    }

    let sequential = run_with_workers(jobs.clone(), resumes.clone(), 1, response).await;
    let parallel = run_with_workers(jobs, resumes, 8, response).await;

    assert_eq!(sequential, parallel);
    assert_eq!(sequential.len(), 20);
}

#[test]
fn engine_error_category_and_retryability_are_consistent() {
    let err = EngineError::store_unavailable("db down");
    assert!(err.is_retryable());

    let err = EngineError::StoreRejected { message: "bad write".into() };
    assert!(!err.is_retryable());
}
