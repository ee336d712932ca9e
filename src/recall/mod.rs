//! Two-stage candidate retrieval: coarse industry filter, then vector
//! similarity search against the surviving set.

pub mod normalize;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::ResumeCache;
use crate::config::Config;
use crate::error::Result;
use crate::model::{Job, PerformanceMetrics, Resume};
use crate::recall::normalize::ScoreNormalizer;
use crate::store::DocumentStore;

/// A recall survivor: a candidate resume together with its normalized
/// similarity score. Produced in similarity-descending order.
#[derive(Debug, Clone)]
pub struct RecallCandidate {
    /// The candidate resume.
    pub resume: Resume,
    /// Normalized vector similarity score, in `[0, 1]`.
    pub similarity_score: f64,
}

/// Runs the two-stage recall pipeline for one job at a time.
pub struct CandidateRecall {
    normalizer: Box<dyn ScoreNormalizer>,
}

impl CandidateRecall {
    /// Build a recall stage using the given score normalizer.
    pub fn new(normalizer: Box<dyn ScoreNormalizer>) -> Self {
        Self { normalizer }
    }

    /// Build a recall stage using the default clamp-based normalizer,
    /// appropriate for cosine-similarity indexes.
    pub fn with_default_normalizer() -> Self {
        Self::new(Box::new(normalize::ClampNormalizer))
    }

    /// Retrieve the ranked candidate shortlist for `job`. Only the time
    /// actually spent in stage 2's vector search is recorded into
    /// `vector_search_durations_ms`; the short-circuit paths (no embedding,
    /// fewer than two stage-1 resumes) run no vector search and record
    /// nothing.
    pub async fn recall(
        &self,
        job: &Job,
        config: &Config,
        store: &dyn DocumentStore,
        cache: &ResumeCache,
        metrics: &PerformanceMetrics,
    ) -> Result<Vec<RecallCandidate>> {
        if job.embedding.is_empty() {
            log::warn!(
                "job {} reached recall with no embedding; returning empty shortlist",
                job.id
            );
            return Ok(Vec::new());
        }

        let stage1 = self.stage1_coarse_filter(config, store, cache, metrics).await?;
        if stage1.len() < 2 {
            log::debug!(
                "job {}: only {} industry-matching resume(s); skipping vector search",
                job.id,
                stage1.len()
            );
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let result = self.stage2_vector_search(job, config, store, &stage1).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        metrics
            .vector_search_durations_ms
            .lock()
            .expect("metrics mutex poisoned")
            .push(elapsed_ms);
        result
    }

    async fn stage1_coarse_filter(
        &self,
        config: &Config,
        store: &dyn DocumentStore,
        cache: &ResumeCache,
        metrics: &PerformanceMetrics,
    ) -> Result<Arc<Vec<Resume>>> {
        use std::sync::atomic::Ordering;

        let cache_key = config.resume_cache_key();

        if let Some(cached) = cache.get(&cache_key) {
            metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }
        metrics.cache_misses.fetch_add(1, Ordering::Relaxed);

        let resumes = store.list_resumes_by_industry(&config.industry_prefixes).await?;
        cache.set(cache_key, resumes.clone());
        Ok(Arc::new(resumes))
    }

    async fn stage2_vector_search(
        &self,
        job: &Job,
        config: &Config,
        store: &dyn DocumentStore,
        stage1: &[Resume],
    ) -> Result<Vec<RecallCandidate>> {
        let stage1_ids: HashSet<String> = stage1.iter().map(|r| r.id.clone()).collect();

        let num_candidates = std::cmp::min(2 * stage1.len(), (config.top_k as usize) * 5);
        let limit = (config.top_k as usize) * 2;

        let scored = store
            .vector_search(
                &job.embedding,
                num_candidates,
                limit,
                &config.vector_search_index,
                &stage1_ids,
            )
            .await?;

        let mut candidates: Vec<RecallCandidate> = scored
            .into_iter()
            .filter(|s| stage1_ids.contains(&s.resume.id))
            .map(|s| RecallCandidate {
                similarity_score: self.normalizer.normalize(s.raw_score),
                resume: s.resume,
            })
            .filter(|c| c.similarity_score >= config.similarity_threshold)
            .collect();

        candidates.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(candidates)
    }
}
