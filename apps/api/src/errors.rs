use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::error::{PipelineError, StageError};
use crate::sources::{DocumentParseError, FetchError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentParseError),

    #[error("Posting fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut stage = None;
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                msg.clone(),
            ),
            AppError::Pipeline(PipelineError::Cancelled) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CANCELLED",
                "The tailoring run was cancelled".to_string(),
            ),
            AppError::Pipeline(PipelineError::Stage {
                stage: failed,
                source,
            }) => {
                stage = Some(failed.to_string());
                match source {
                    StageError::Service(e) => {
                        tracing::error!("Reasoning service error during {failed}: {e}");
                        (
                            StatusCode::BAD_GATEWAY,
                            source.code(),
                            format!("The reasoning service failed during {failed}"),
                        )
                    }
                    _ => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        source.code(),
                        source.to_string(),
                    ),
                }
            }
            AppError::Document(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DOCUMENT_PARSE_ERROR",
                e.to_string(),
            ),
            AppError::Fetch(FetchError::InvalidUrl(url)) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("job_url '{url}' is not an http(s) URL"),
            ),
            AppError::Fetch(e) => {
                tracing::warn!("Posting fetch failed: {e}");
                (StatusCode::BAD_GATEWAY, "FETCH_ERROR", e.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(stage) = stage {
            error["stage"] = json!(stage);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ServiceError;
    use crate::pipeline::state::Stage;

    #[test]
    fn test_input_errors_are_unprocessable() {
        let err = AppError::from(PipelineError::at(
            Stage::Extracting,
            StageError::Extraction("job posting text is empty".to_string()),
        ));
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_service_errors_are_bad_gateway() {
        let err = AppError::from(PipelineError::at(
            Stage::Tailoring,
            StageError::Service(ServiceError::RateLimited("slow down".to_string())),
        ));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_cancellation_is_service_unavailable() {
        let err = AppError::from(PipelineError::Cancelled);
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
