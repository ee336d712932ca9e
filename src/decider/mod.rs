//! Merges recall candidates with a validator outcome into a single
//! terminal decision per job.

use crate::error::EngineError;
use crate::model::ShortlistEntry;
use crate::recall::RecallCandidate;
use crate::validator::ValidationOutcome;

/// The terminal state reached for one job after recall and (optionally)
/// validation. Exactly one of these is produced per job, and exactly one
/// maps to a `Persistor` write (`ValidationError` maps to none).
#[derive(Debug)]
pub enum Decision {
    /// Recall returned no candidates; nothing was sent to the validator.
    NoResumesFound,
    /// The validator could not be trusted (transport/parse/schema error).
    ValidationError(EngineError),
    /// At least one shortlist entry is valid; `chosen` names the winner.
    Matched {
        /// Every evaluated candidate, sorted by rank ascending.
        shortlist: Vec<ShortlistEntry>,
        /// Resume id of the chosen candidate; present in `shortlist`.
        chosen: String,
    },
    /// The shortlist is non-empty but no entry is valid.
    NoValidMatch {
        /// Every evaluated candidate, sorted by rank ascending.
        shortlist: Vec<ShortlistEntry>,
    },
}

/// Joins recall candidates with a validation outcome and classifies the
/// result into a terminal [`Decision`].
pub struct MatchDecider;

impl MatchDecider {
    /// Decide the outcome for a job whose recall stage returned no candidates.
    pub fn no_resumes_found() -> Decision {
        Decision::NoResumesFound
    }

    /// Decide the outcome for a job whose validator call failed.
    pub fn validation_error(error: EngineError) -> Decision {
        Decision::ValidationError(error)
    }

    /// Decide the outcome for a job with a non-empty recall shortlist and
    /// a successful validation outcome.
    pub fn decide(job_id: &str, candidates: &[RecallCandidate], outcome: &ValidationOutcome) -> Decision {
        let mut shortlist = join_shortlist(candidates, outcome);
        shortlist.sort_by_key(|entry| entry.rank);

        if !shortlist.iter().any(|entry| entry.is_valid) {
            return Decision::NoValidMatch { shortlist };
        }

        let chosen = select_best_match(job_id, &shortlist, outcome);
        Decision::Matched { shortlist, chosen }
    }
}

fn join_shortlist(candidates: &[RecallCandidate], outcome: &ValidationOutcome) -> Vec<ShortlistEntry> {
    candidates
        .iter()
        .filter_map(|candidate| {
            outcome
                .candidates
                .iter()
                .find(|e| e.candidate_id == candidate.resume.id)
                .map(|evaluation| ShortlistEntry {
                    resume_id: candidate.resume.id.clone(),
                    file_id: candidate.resume.file_id.clone(),
                    similarity_score: candidate.similarity_score,
                    llm_score: evaluation.score,
                    rank: evaluation.rank,
                    summary: evaluation.summary.clone(),
                    is_valid: evaluation.is_valid,
                })
        })
        .collect()
}

/// Prefer the validator's stated `best_match` if it is itself valid.
/// Otherwise recover deterministically: pick the highest-`llm_score`
/// valid entry, breaking ties by lowest rank, then highest similarity
/// score, then lowest id lexicographically. A discrepancy here is logged,
/// never treated as fatal.
fn select_best_match(job_id: &str, shortlist: &[ShortlistEntry], outcome: &ValidationOutcome) -> String {
    if let Some(stated) = shortlist.iter().find(|e| e.resume_id == outcome.best_match) {
        if stated.is_valid {
            return stated.resume_id.clone();
        }
    }

    log::warn!(
        "job {job_id}: validator's best_match '{}' was not a valid shortlist entry; recovering deterministically",
        outcome.best_match
    );

    shortlist
        .iter()
        .filter(|e| e.is_valid)
        .min_by(|a, b| {
            b.llm_score
                .cmp(&a.llm_score)
                .then(a.rank.cmp(&b.rank))
                .then(
                    b.similarity_score
                        .partial_cmp(&a.similarity_score)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.resume_id.cmp(&b.resume_id))
        })
        .map(|e| e.resume_id.clone())
        .expect("at least one valid entry guaranteed by caller")
}
