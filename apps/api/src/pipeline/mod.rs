//! Pipeline Coordinator: sequences the five stages of one tailoring run.
//!
//! EXTRACTING and STRUCTURING run concurrently and join at MATCHING. The
//! tailor → verify loop is bounded by `max_verification_retries`; when the
//! budget runs out the best candidate is returned FLAGGED rather than as an
//! error. Every run owns its state, so a `Coordinator` can serve many runs at once.

pub mod error;
pub mod retry;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::grounding::verifier::verify;
use crate::llm_client::ReasoningService;
use crate::models::analysis::MatchReport;
use crate::models::report::{PipelineResult, PipelineStatus, VerificationReport};
use crate::models::requirements::JobRequirements;
use crate::models::resume::ResumeDocument;
use crate::pipeline::error::{PipelineError, StageError};
use crate::pipeline::retry::{run_stage, RetryPolicy};
use crate::pipeline::state::{PipelineState, Stage};
use crate::tailoring::content_tailor::{tailor_resume, TailoredCandidate};
use crate::tailoring::extractor::{extract_requirements, precheck_posting, PostingLimits};
use crate::tailoring::skill_matcher::{KeywordSkillMatcher, SkillMatcher};
use crate::tailoring::structurer::{precheck_resume, structure_resume};

/// Knobs for one coordinator, fixed at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Extra tailoring attempts after the first flagged one.
    pub max_verification_retries: u32,
    pub stage_timeout: Duration,
    pub stage_max_attempts: u32,
    pub backoff_base: Duration,
    pub min_posting_chars: usize,
    pub max_posting_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_verification_retries: 2,
            stage_timeout: Duration::from_secs(120),
            stage_max_attempts: 3,
            backoff_base: Duration::from_millis(1000),
            min_posting_chars: 50,
            max_posting_chars: 50_000,
        }
    }
}

impl PipelineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: self.stage_timeout,
            max_attempts: self.stage_max_attempts.max(1),
            backoff_base: self.backoff_base,
        }
    }

    pub fn posting_limits(&self) -> PostingLimits {
        PostingLimits {
            min_chars: self.min_posting_chars,
            max_chars: self.max_posting_chars,
        }
    }
}

/// A verified candidate, or the one with the fewest flags so far.
struct Attempt {
    candidate: TailoredCandidate,
    verification: VerificationReport,
    number: u32,
}

pub struct Coordinator {
    service: Arc<dyn ReasoningService>,
    matcher: Arc<dyn SkillMatcher>,
    config: PipelineConfig,
}

impl Coordinator {
    pub fn new(service: Arc<dyn ReasoningService>, config: PipelineConfig) -> Self {
        Self {
            service,
            matcher: Arc::new(KeywordSkillMatcher),
            config,
        }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn SkillMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Runs only the requirement extractor, under the same timeout and retry policy.
    pub async fn extract(
        &self,
        posting_text: &str,
        cancel: &CancellationToken,
    ) -> Result<JobRequirements, PipelineError> {
        let limits = self.config.posting_limits();
        let posting = precheck_posting(posting_text, limits)
            .map_err(|e| PipelineError::at(Stage::Extracting, e))?;
        let service = self.service.as_ref();
        run_stage(
            Stage::Extracting,
            &self.config.retry_policy(),
            cancel,
            move || extract_requirements(service, posting, limits),
        )
        .await
    }

    /// Runs the whole pipeline for one (resume, posting) pair.
    ///
    /// Returns `Ok` with status VERIFIED or FLAGGED; `Err` only for fatal stage
    /// errors (naming the stage) or cancellation. Inputs are never modified.
    pub async fn run(
        &self,
        resume_text: &str,
        posting_text: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        let run_id = Uuid::new_v4();
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Cheap input checks first, so malformed input costs no service calls.
        let limits = self.config.posting_limits();
        let posting = precheck_posting(posting_text, limits)
            .map_err(|e| PipelineError::at(Stage::Extracting, e))?;
        let resume = precheck_resume(resume_text)
            .map_err(|e| PipelineError::at(Stage::Structuring, e))?;

        let policy = self.config.retry_policy();
        let service = self.service.as_ref();

        self.log_state(run_id, PipelineState::Extracting);
        self.log_state(run_id, PipelineState::Structuring);
        let (requirements, original) = tokio::try_join!(
            run_stage(Stage::Extracting, &policy, cancel, move || {
                extract_requirements(service, posting, limits)
            }),
            run_stage(Stage::Structuring, &policy, cancel, move || {
                structure_resume(service, resume)
            }),
        )?;

        self.log_state(run_id, PipelineState::Matching);
        let match_report = self.run_matching(&requirements, &original, cancel).await?;

        let max_retries = self.config.max_verification_retries;
        let mut rejections: Vec<String> = Vec::new();
        let mut best: Option<Attempt> = None;
        let mut number = 0;

        loop {
            number += 1;
            self.log_state(run_id, PipelineState::Tailoring { attempt: number });

            let constraints = rejections.as_slice();
            let (original_ref, requirements_ref, report_ref) =
                (&original, &requirements, &match_report);
            let candidate = run_stage(Stage::Tailoring, &policy, cancel, move || {
                tailor_resume(service, original_ref, requirements_ref, report_ref, constraints)
            })
            .await?;

            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            self.log_state(run_id, PipelineState::Verifying { attempt: number });
            let verification = verify(&original, &candidate.tailored, &requirements);
            let passed = verification.passed;

            let attempt = Attempt {
                candidate,
                verification,
                number,
            };
            let new_reasons = attempt.verification.flagged_reasons();
            // Strictly fewer flags replaces, so the earliest candidate wins ties.
            let improves = best.as_ref().map_or(true, |b| {
                attempt.verification.flagged_count() < b.verification.flagged_count()
            });
            if passed || improves {
                best = Some(attempt);
            }

            let next = PipelineState::after_verification(passed, number, max_retries);
            self.log_state(run_id, next);
            match next {
                PipelineState::RetryTailoring { .. } => {
                    warn!(
                        "Run {run_id}: candidate {number} flagged ({} reasons); retrying tailoring",
                        new_reasons.len()
                    );
                    for reason in new_reasons {
                        if !rejections.contains(&reason) {
                            rejections.push(reason);
                        }
                    }
                }
                PipelineState::Done | PipelineState::Failed => {
                    let status = if next == PipelineState::Done {
                        PipelineStatus::Verified
                    } else {
                        PipelineStatus::Flagged
                    };
                    let chosen = best.ok_or_else(|| {
                        PipelineError::at(
                            Stage::Verifying,
                            StageError::Tailoring("no tailoring candidate was produced".into()),
                        )
                    })?;
                    return Ok(self.finish(
                        run_id,
                        status,
                        chosen,
                        number,
                        requirements,
                        match_report,
                    ));
                }
                other => {
                    return Err(PipelineError::at(
                        Stage::Verifying,
                        StageError::Tailoring(format!("unexpected transition to {other:?}")),
                    ))
                }
            }
        }
    }

    async fn run_matching(
        &self,
        requirements: &JobRequirements,
        original: &ResumeDocument,
        cancel: &CancellationToken,
    ) -> Result<MatchReport, PipelineError> {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            outcome = self.matcher.match_skills(requirements, original) => outcome,
        };
        let report = outcome.map_err(|e| PipelineError::at(Stage::Matching, e))?;

        if let Some(dangling) = report.dangling_reference(requirements) {
            return Err(PipelineError::at(
                Stage::Matching,
                StageError::Matching(format!(
                    "match report cites a requirement that was never extracted: '{dangling}'"
                )),
            ));
        }
        Ok(report)
    }

    fn finish(
        &self,
        run_id: Uuid,
        status: PipelineStatus,
        chosen: Attempt,
        attempts: u32,
        requirements: JobRequirements,
        match_report: MatchReport,
    ) -> PipelineResult {
        info!(
            "Run {run_id} finished {:?} after {attempts} tailoring attempts (returning attempt {}, {} flagged)",
            status,
            chosen.number,
            chosen.verification.flagged_count()
        );
        PipelineResult {
            run_id,
            status,
            tailored: chosen.candidate.tailored,
            changes: chosen.candidate.changes,
            verification: chosen.verification,
            requirements,
            match_report,
            tailoring_attempts: attempts,
            completed_at: Utc::now(),
        }
    }

    fn log_state(&self, run_id: Uuid, state: PipelineState) {
        info!(
            "Run {run_id}: {:?} ({:.0}%)",
            state,
            state.progress() * 100.0
        );
    }
}
