use std::fmt;

use serde::{Deserialize, Serialize};

/// The five transformation stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Extracting,
    Structuring,
    Matching,
    Tailoring,
    Verifying,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extracting => "requirement extraction",
            Stage::Structuring => "resume structuring",
            Stage::Matching => "skill matching",
            Stage::Tailoring => "content tailoring",
            Stage::Verifying => "fact verification",
        };
        f.write_str(name)
    }
}

/// Coordinator state machine.
///
/// EXTRACTING ∥ STRUCTURING → MATCHING → TAILORING → VERIFYING →
/// { DONE | RETRY_TAILORING → TAILORING | FAILED }
///
/// `Failed` here is the exhausted-retries outcome: the run still returns a
/// FLAGGED result. Fatal stage errors leave the machine through `Err` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Extracting,
    Structuring,
    Matching,
    Tailoring { attempt: u32 },
    Verifying { attempt: u32 },
    RetryTailoring { attempt: u32 },
    Done,
    Failed,
}

impl PipelineState {
    /// Where to go after verifying tailoring attempt `attempt` (1-based).
    ///
    /// Retries used so far are `attempt - 1`; another is allowed while that is
    /// below `max_retries`, so at most `max_retries + 1` attempts ever run.
    pub fn after_verification(passed: bool, attempt: u32, max_retries: u32) -> Self {
        if passed {
            PipelineState::Done
        } else if attempt.saturating_sub(1) < max_retries {
            PipelineState::RetryTailoring { attempt }
        } else {
            PipelineState::Failed
        }
    }

    /// Rough completion fraction for progress logging.
    pub fn progress(&self) -> f32 {
        match self {
            PipelineState::Extracting | PipelineState::Structuring => 0.10,
            PipelineState::Matching => 0.40,
            PipelineState::Tailoring { .. } | PipelineState::RetryTailoring { .. } => 0.60,
            PipelineState::Verifying { .. } => 0.80,
            PipelineState::Done | PipelineState::Failed => 1.0,
        }
    }
}
