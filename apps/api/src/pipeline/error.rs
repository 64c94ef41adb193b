use thiserror::Error;

use crate::llm_client::ServiceError;
use crate::pipeline::state::Stage;

/// Failure raised by a single stage.
///
/// Input errors (`Extraction`, `Structuring`, `Matching`) are fatal and never
/// retried. `Service` errors may be retried by the coordinator when transient.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("{0}")]
    Extraction(String),

    #[error("{0}")]
    Structuring(String),

    #[error("{0}")]
    Matching(String),

    #[error("{0}")]
    Tailoring(String),

    #[error("reasoning service error: {0}")]
    Service(#[from] ServiceError),
}

impl StageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StageError::Service(e) if e.is_retryable())
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            StageError::Extraction(_) => "EXTRACTION_ERROR",
            StageError::Structuring(_) => "STRUCTURING_ERROR",
            StageError::Matching(_) => "MATCHING_ERROR",
            StageError::Tailoring(_) => "TAILORING_ERROR",
            StageError::Service(_) => "SERVICE_ERROR",
        }
    }
}

/// Terminal failure of a pipeline run. A FLAGGED result is not an error.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },

    #[error("pipeline run was cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn at(stage: Stage, source: StageError) -> Self {
        PipelineError::Stage { stage, source }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            PipelineError::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_only_transient_service_errors_retry() {
        assert!(StageError::Service(ServiceError::Timeout(Duration::from_secs(5))).is_retryable());
        assert!(!StageError::Service(ServiceError::MalformedResponse("x".into())).is_retryable());
        assert!(!StageError::Extraction("empty".into()).is_retryable());
    }

    #[test]
    fn test_pipeline_error_names_the_stage() {
        let err = PipelineError::at(
            Stage::Extracting,
            StageError::Extraction("job posting text is empty".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "requirement extraction failed: job posting text is empty"
        );
        assert_eq!(err.stage(), Some(Stage::Extracting));
    }
}
