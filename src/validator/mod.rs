//! LLM-as-judge validation: scores and ranks a recall shortlist against a
//! job posting, returning a structured, schema-checked outcome.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::llm::{strip_markdown_fences, LlmClient};
use crate::model::{Job, PerformanceMetrics, Resume};
use crate::recall::RecallCandidate;

/// Upper bound on how many recall candidates are ever sent to the LLM,
/// regardless of how many survived recall. Keeps prompts small and bounds
/// per-job LLM cost.
const MAX_CANDIDATES_FOR_VALIDATION: usize = 3;

/// Maximum number of characters of a job description included in the prompt.
const DESCRIPTION_TRUNCATE_CHARS: usize = 1500;

#[derive(Debug, Deserialize)]
struct RawValidationResponse {
    candidates: Vec<RawCandidateEvaluation>,
    best_match: String,
}

#[derive(Debug, Deserialize)]
struct RawCandidateEvaluation {
    candidate_id: String,
    rank: u32,
    score: u32,
    summary: String,
    is_valid: bool,
}

/// One candidate's validated evaluation, keyed to a resume id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateEvaluation {
    /// Resume identifier this evaluation refers to.
    pub candidate_id: String,
    /// Rank within the evaluated set; 1 is best.
    pub rank: u32,
    /// LLM-assigned score, in `[0, 100]`.
    pub score: u32,
    /// One-sentence summary of match quality.
    pub summary: String,
    /// Whether `score >= validation_threshold`.
    pub is_valid: bool,
}

/// The outcome of validating a job's shortlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationOutcome {
    /// Per-candidate evaluations, in the order the LLM returned them.
    pub candidates: Vec<CandidateEvaluation>,
    /// Resume id the LLM judged as the single best match.
    pub best_match: String,
}

/// Validates a recall shortlist by prompting an `LlmClient` and parsing its
/// structured response.
pub struct Validator {
    llm: Arc<dyn LlmClient>,
}

impl Validator {
    /// Build a validator around the given LLM client.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Validate `candidates` against `job`, truncating to at most
    /// [`MAX_CANDIDATES_FOR_VALIDATION`] entries (the recall stage already
    /// sorts by similarity, so truncation keeps the strongest candidates).
    pub async fn validate(
        &self,
        job: &Job,
        candidates: &[RecallCandidate],
        config: &Config,
        metrics: &PerformanceMetrics,
    ) -> Result<ValidationOutcome> {
        let started = Instant::now();
        let truncated = &candidates[..candidates.len().min(MAX_CANDIDATES_FOR_VALIDATION)];
        let result = self.validate_inner(job, truncated, config).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        metrics
            .llm_validation_durations_ms
            .lock()
            .expect("metrics mutex poisoned")
            .push(elapsed_ms);
        result
    }

    async fn validate_inner(
        &self,
        job: &Job,
        candidates: &[RecallCandidate],
        config: &Config,
    ) -> Result<ValidationOutcome> {
        let prompt = build_prompt(job, candidates, config.validation_threshold);
        let raw_response = self.llm.generate(&prompt, &config.llm_model).await?;
        parse_validation_response(&raw_response, candidates)
    }
}

fn build_prompt(job: &Job, candidates: &[RecallCandidate], validation_threshold: u32) -> String {
    let description: String = job.description.chars().take(DESCRIPTION_TRUNCATE_CHARS).collect();

    let required_skills = if job.hints.required_skills.is_empty() {
        "Not specified".to_string()
    } else {
        job.hints.required_skills.join(", ")
    };
    let required_experience = job.hints.required_experience.clone().unwrap_or_else(|| "Not specified".to_string());
    let required_education = job.hints.required_education.clone().unwrap_or_else(|| "Not specified".to_string());

    let mut prompt = format!(
        "You are an expert technical recruiter evaluating multiple candidates for a job posting.\n\n\
         JOB DETAILS:\n\
         Title: {title}\n\
         Company: {company}\n\
         Description: {description}\n\
         Required Skills: {required_skills}\n\
         Required Experience: {required_experience}\n\
         Required Education: {required_education}\n\n\
         CANDIDATE RESUMES:\n",
        title = job.title,
        company = job.company,
    );

    for (idx, candidate) in candidates.iter().enumerate() {
        let resume = &candidate.resume;
        prompt.push_str(&format!(
            "\nCANDIDATE {n}:\nID: {id}\nExperience Level: {level}\nPrimary Industry: {industry}\n\
             Total Experience: {years} years\nSimilarity Score: {sim:.2}\nSkills: {skills}\n\
             Work Experience: {work}\nEducation: {education}\n",
            n = idx + 1,
            id = resume.id,
            level = resume.key_metrics.experience_level.as_deref().unwrap_or("Unknown"),
            industry = resume.key_metrics.primary_industry.as_deref().unwrap_or("Unknown"),
            years = format_years(resume.key_metrics.total_experience_years),
            sim = candidate.similarity_score,
            skills = format_json_field(&resume.payload.skills),
            work = format_json_field(&resume.payload.work_experience),
            education = format_json_field(&resume.payload.education),
        ));
    }

    prompt.push_str(&format!(
        "\nTASK: Evaluate all candidates and:\n\
         1. Score each candidate from 0-100 based on job fit\n\
         2. Rank candidates from best to worst match\n\
         3. Provide specific reasoning for each candidate\n\
         4. Consider skills match, experience relevance, and overall fit\n\n\
         Return ONLY a valid JSON object with this structure:\n\
         {{\n\
         \x20   \"candidates\": [\n\
         \x20       {{\n\
         \x20           \"candidate_id\": \"<resume_id>\",\n\
         \x20           \"rank\": <number>,\n\
         \x20           \"score\": <0-100>,\n\
         \x20           \"summary\": \"<one sentence summary of match quality>\",\n\
         \x20           \"is_valid\": <true if score >= {threshold}, false otherwise>\n\
         \x20       }},\n\
         \x20       ...\n\
         \x20   ],\n\
         \x20   \"best_match\": \"<resume_id of best candidate>\"\n\
         }}\n\n\
         Do not include any other text or formatting.\n",
        threshold = validation_threshold,
    ));

    prompt
}

fn format_years(years: Option<f64>) -> String {
    years.map_or_else(|| "Unknown".to_string(), |y| y.to_string())
}

fn format_json_field(field: &Option<serde_json::Value>) -> String {
    match field {
        Some(value) if !value.is_null() => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "Not specified".to_string())
        }
        _ => "Not specified".to_string(),
    }
}

fn parse_validation_response(raw_response: &str, candidates: &[RecallCandidate]) -> Result<ValidationOutcome> {
    let cleaned = strip_markdown_fences(raw_response);

    let parsed: RawValidationResponse = serde_json::from_str(&cleaned).map_err(|e| EngineError::ValidatorSchema {
        message: format!("malformed validation response: {e}"),
        raw_response: raw_response.to_string(),
    })?;

    if parsed.candidates.is_empty() {
        return Err(EngineError::ValidatorSchema {
            message: "validation response contained no candidates".to_string(),
            raw_response: raw_response.to_string(),
        });
    }

    let known_ids: std::collections::HashSet<&str> = candidates.iter().map(|c| c.resume.id.as_str()).collect();

    let mut ranks: Vec<u32> = Vec::with_capacity(parsed.candidates.len());
    let mut evaluations = Vec::with_capacity(parsed.candidates.len());
    for candidate in &parsed.candidates {
        if !known_ids.contains(candidate.candidate_id.as_str()) {
            return Err(EngineError::ValidatorSchema {
                message: format!("validator referenced unknown candidate id '{}'", candidate.candidate_id),
                raw_response: raw_response.to_string(),
            });
        }
        ranks.push(candidate.rank);
        evaluations.push(CandidateEvaluation {
            candidate_id: candidate.candidate_id.clone(),
            rank: candidate.rank,
            score: candidate.score,
            summary: candidate.summary.clone(),
            is_valid: candidate.is_valid,
        });
    }

    if !is_permutation(&ranks) {
        log::warn!("validator ranks are not a clean 1..N permutation: {ranks:?}");
    }

    let returned_ids: std::collections::HashSet<&str> =
        evaluations.iter().map(|c| c.candidate_id.as_str()).collect();
    if !returned_ids.contains(parsed.best_match.as_str()) {
        return Err(EngineError::ValidatorSchema {
            message: format!(
                "best_match '{}' does not appear in the response's own candidates list",
                parsed.best_match
            ),
            raw_response: raw_response.to_string(),
        });
    }

    Ok(ValidationOutcome {
        candidates: evaluations,
        best_match: parsed.best_match,
    })
}

fn is_permutation(ranks: &[u32]) -> bool {
    let mut sorted = ranks.to_vec();
    sorted.sort_unstable();
    sorted.iter().enumerate().all(|(i, &r)| r as usize == i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as EngineResult;
    use crate::model::{JobHints, KeyMetrics, ResumePayload};
    use async_trait::async_trait;

    struct StubLlm {
        response: String,
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn generate(&self, _prompt: &str, _model: &str) -> EngineResult<String> {
            Ok(self.response.clone())
        }
    }

    fn job() -> Job {
        Job {
            id: "j1".into(),
            title: "Backend Engineer".into(),
            company: "Acme".into(),
            location: None,
            description: "Build things.".into(),
            job_link: None,
            embedding: vec![1.0],
            extraction_success: true,
            search_term: None,
            cycle: None,
            hints: JobHints::default(),
        }
    }

    fn candidate(id: &str, similarity: f64) -> RecallCandidate {
        RecallCandidate {
            resume: Resume {
                id: id.to_string(),
                file_id: format!("{id}-file"),
                payload: ResumePayload::default(),
                key_metrics: KeyMetrics::default(),
                industry_prefix: "tech".into(),
                embedding: vec![1.0],
            },
            similarity_score: similarity,
        }
    }

    #[tokio::test]
    async fn test_validate_parses_well_formed_response() {
        let response = r#"```json
{
  "candidates": [
    {"candidate_id": "r1", "rank": 1, "score": 90, "summary": "strong fit", "is_valid": true},
    {"candidate_id": "r2", "rank": 2, "score": 40, "summary": "weak fit", "is_valid": false}
  ],
  "best_match": "r1"
}
```"#;
        let validator = Validator::new(Arc::new(StubLlm { response: response.to_string() }));
        let config = Config::default();
        let metrics = PerformanceMetrics::default();
        let candidates = vec![candidate("r1", 0.9), candidate("r2", 0.4)];

        let outcome = validator.validate(&job(), &candidates, &config, &metrics).await.unwrap();
        assert_eq!(outcome.best_match, "r1");
        assert_eq!(outcome.candidates.len(), 2);
        assert!(outcome.candidates[0].is_valid);
    }

    #[tokio::test]
    async fn test_validate_rejects_unknown_best_match() {
        let response = r#"{"candidates": [{"candidate_id": "r1", "rank": 1, "score": 90, "summary": "ok", "is_valid": true}], "best_match": "rX"}"#;
        let validator = Validator::new(Arc::new(StubLlm { response: response.to_string() }));
        let config = Config::default();
        let metrics = PerformanceMetrics::default();
        let candidates = vec![candidate("r1", 0.9)];

        let err = validator.validate(&job(), &candidates, &config, &metrics).await.unwrap_err();
        assert!(matches!(err, EngineError::ValidatorSchema { .. }));
    }

    #[tokio::test]
    async fn test_validate_rejects_best_match_absent_from_returned_candidates() {
        // r2 was sent to the LLM and is a known recall candidate, but the
        // response's own "candidates" array only evaluates r1; best_match
        // must be drawn from what the response itself returned.
        let response = r#"{"candidates": [{"candidate_id": "r1", "rank": 1, "score": 90, "summary": "ok", "is_valid": true}], "best_match": "r2"}"#;
        let validator = Validator::new(Arc::new(StubLlm { response: response.to_string() }));
        let config = Config::default();
        let metrics = PerformanceMetrics::default();
        let candidates = vec![candidate("r1", 0.9), candidate("r2", 0.4)];

        let err = validator.validate(&job(), &candidates, &config, &metrics).await.unwrap_err();
        assert!(matches!(err, EngineError::ValidatorSchema { .. }));
    }

    #[tokio::test]
    async fn test_validate_rejects_empty_candidates() {
        let response = r#"{"candidates": [], "best_match": "r1"}"#;
        let validator = Validator::new(Arc::new(StubLlm { response: response.to_string() }));
        let config = Config::default();
        let metrics = PerformanceMetrics::default();
        let candidates = vec![candidate("r1", 0.9)];

        let err = validator.validate(&job(), &candidates, &config, &metrics).await.unwrap_err();
        assert!(matches!(err, EngineError::ValidatorSchema { .. }));
    }

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&[1, 2, 3]));
        assert!(is_permutation(&[3, 1, 2]));
        assert!(!is_permutation(&[1, 1, 3]));
    }

    #[test]
    fn test_build_prompt_includes_threshold_and_candidates() {
        let candidates = vec![candidate("r1", 0.9)];
        let prompt = build_prompt(&job(), &candidates, 70);
        assert!(prompt.contains("Backend Engineer"));
        assert!(prompt.contains(">= 70"));
        assert!(prompt.contains("ID: r1"));
    }
}
