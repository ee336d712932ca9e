//! Translates a `MatchDecider` decision into exactly one `DocumentStore`
//! write.

use chrono::Utc;

use crate::decider::Decision;
use crate::error::{EngineError, Result};
use crate::model::{Job, JobReference, MatchRecord, MatchStatus, Resume, UnmatchedRecord};
use crate::store::DocumentStore;

/// Persists a job's terminal decision. Holds no state of its own; every
/// call is a single, idempotent write keyed by `(job_id, workflow_run)`.
pub struct Persistor;

impl Persistor {
    /// Persist `decision` for `job`, resolving the chosen resume from
    /// `resumes_by_id` when the decision is `Matched`.
    ///
    /// Returns `Ok(())` for every decision except `ValidationError`, which
    /// is surfaced unchanged so the caller can count it without writing a
    /// record — an unmatched record must mean "we examined candidates and
    /// none qualified", not "validation itself failed".
    pub async fn persist(
        store: &dyn DocumentStore,
        job: &Job,
        decision: Decision,
        resolve_resume: impl Fn(&str) -> Option<Resume>,
        workflow_run: &str,
    ) -> Result<PersistOutcome> {
        let job_ref = JobReference::from(job);

        match decision {
            Decision::NoResumesFound => {
                store
                    .insert_unmatched(UnmatchedRecord {
                        job: job_ref,
                        shortlist: Vec::new(),
                        status: MatchStatus::NoValidMatch,
                        created_at: Utc::now(),
                        workflow_run: workflow_run.to_string(),
                    })
                    .await?;
                Ok(PersistOutcome::NoResumesFound)
            }

            Decision::NoValidMatch { shortlist } => {
                store
                    .insert_unmatched(UnmatchedRecord {
                        job: job_ref,
                        shortlist,
                        status: MatchStatus::NoValidMatch,
                        created_at: Utc::now(),
                        workflow_run: workflow_run.to_string(),
                    })
                    .await?;
                Ok(PersistOutcome::NoValidMatch)
            }

            Decision::Matched { shortlist, chosen } => {
                let chosen_entry = shortlist
                    .iter()
                    .find(|e| e.resume_id == chosen)
                    .ok_or_else(|| EngineError::internal(format!("chosen resume '{chosen}' missing from shortlist")))?
                    .clone();

                let resume = resolve_resume(&chosen).ok_or_else(|| {
                    EngineError::internal(format!("could not resolve chosen resume '{chosen}' for persistence"))
                })?;

                store
                    .insert_match(MatchRecord {
                        job: job_ref,
                        resume,
                        shortlist,
                        chosen_similarity_score: chosen_entry.similarity_score,
                        chosen_llm_score: chosen_entry.llm_score,
                        chosen_summary: chosen_entry.summary,
                        status: MatchStatus::Validated,
                        created_at: Utc::now(),
                        validated_at: Utc::now(),
                        workflow_run: workflow_run.to_string(),
                    })
                    .await?;
                Ok(PersistOutcome::Matched)
            }

            Decision::ValidationError(error) => Err(error),
        }
    }
}

/// Which branch `Persistor::persist` took, for the `WorkflowEngine`'s
/// counters. Distinct from `Decision` so the engine need not re-inspect
/// shortlist contents after the write has already happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// A `MatchRecord` was written.
    Matched,
    /// An `UnmatchedRecord` was written; the shortlist had no valid entry.
    NoValidMatch,
    /// An `UnmatchedRecord` was written with an empty shortlist.
    NoResumesFound,
}
