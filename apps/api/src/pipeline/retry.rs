//! Stage-level timeout and retry. Distinct from the verification loop: this
//! only retries transient service failures of a single stage invocation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::llm_client::ServiceError;
use crate::pipeline::error::{PipelineError, StageError};
use crate::pipeline::state::Stage;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Deadline for one attempt of a stage.
    pub timeout: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`: `base * 2^(attempt - 1)`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

/// Runs one stage invocation under the policy.
///
/// Each attempt races the cancellation token and the per-stage timeout. A
/// timeout counts as a retryable service failure. Input errors and exhausted
/// attempts are returned as a `PipelineError` naming `stage`. Cancellation
/// aborts the in-flight call and any pending backoff immediately.
pub async fn run_stage<T, F, Fut>(
    stage: Stage,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StageError>>,
{
    let mut attempt = 1;
    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = tokio::time::timeout(policy.timeout, call()) => result,
        };

        let error = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => error,
            Err(_) => StageError::Service(ServiceError::Timeout(policy.timeout)),
        };

        if !error.is_retryable() || attempt >= policy.max_attempts {
            return Err(PipelineError::at(stage, error));
        }

        let delay = policy.backoff_for(attempt);
        warn!(
            "{stage} attempt {attempt}/{} failed ({error}); retrying in {}ms",
            policy.max_attempts,
            delay.as_millis()
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
