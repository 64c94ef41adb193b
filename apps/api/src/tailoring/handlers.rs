//! Axum route handlers for the Tailoring API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::report::PipelineResult;
use crate::models::requirements::JobRequirements;
use crate::sources::extractor_for;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RequirementsRequest {
    pub job_text: String,
}

#[derive(Debug, Serialize)]
pub struct RequirementsResponse {
    pub requirements: JobRequirements,
}

#[derive(Debug, Deserialize)]
pub struct TailorRequest {
    pub resume_text: String,
    pub job_text: Option<String>,
    pub job_url: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/requirements
///
/// Extracts requirements from a posting without touching a resume.
/// Useful for previewing what the matcher will score against.
pub async fn handle_extract_requirements(
    State(state): State<AppState>,
    Json(request): Json<RequirementsRequest>,
) -> Result<Json<RequirementsResponse>, AppError> {
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let requirements = state.coordinator.extract(&request.job_text, &cancel).await?;
    Ok(Json(RequirementsResponse { requirements }))
}

/// POST /api/v1/tailor
///
/// Full pipeline on pasted text. VERIFIED and FLAGGED results are both 200;
/// the caller reads `status` and `verification` to tell them apart.
pub async fn handle_tailor(
    State(state): State<AppState>,
    Json(request): Json<TailorRequest>,
) -> Result<Json<PipelineResult>, AppError> {
    if request.resume_text.len() > state.config.max_resume_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "resume_text exceeds {} bytes",
            state.config.max_resume_bytes
        )));
    }
    let posting = resolve_posting(&state, request.job_text, request.job_url).await?;
    run_pipeline(&state, &request.resume_text, &posting).await
}

/// POST /api/v1/tailor/upload
///
/// Multipart form: `resume` (PDF or text file) plus `job_text` or `job_url`.
pub async fn handle_tailor_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PipelineResult>, AppError> {
    let mut resume: Option<(String, Bytes)> = None;
    let mut job_text = None;
    let mut job_url = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let filename = field.file_name().unwrap_or("resume.txt").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("could not read resume: {e}")))?;
                resume = Some((filename, bytes));
            }
            "job_text" | "job_url" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("could not read {name}: {e}")))?;
                if name == "job_text" {
                    job_text = Some(value);
                } else {
                    job_url = Some(value);
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        resume.ok_or_else(|| AppError::Validation("a 'resume' file is required".to_string()))?;
    if bytes.len() > state.config.max_resume_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "resume file exceeds {} bytes",
            state.config.max_resume_bytes
        )));
    }
    info!("Resume upload '{filename}': {} bytes", bytes.len());

    let resume_text = tokio::task::spawn_blocking(move || extractor_for(&filename)?.extract(&bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("text extraction task failed: {e}")))??;

    let posting = resolve_posting(&state, job_text, job_url).await?;
    run_pipeline(&state, &resume_text, &posting).await
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Pasted text wins over a URL. A blank `job_text` with no URL is passed on,
/// so the extractor reports it the same way as any other empty posting.
async fn resolve_posting(
    state: &AppState,
    job_text: Option<String>,
    job_url: Option<String>,
) -> Result<String, AppError> {
    let job_url = job_url.filter(|u| !u.trim().is_empty());
    match (job_text, job_url) {
        (Some(text), _) if !text.trim().is_empty() => Ok(text),
        (_, Some(url)) => Ok(state.fetcher.fetch(url.trim()).await?),
        (Some(text), None) => Ok(text),
        (None, None) => Err(AppError::Validation(
            "either job_text or job_url is required".to_string(),
        )),
    }
}

/// Runs under a child of the server token; dropping the request future
/// (client disconnect) cancels the run.
async fn run_pipeline(
    state: &AppState,
    resume_text: &str,
    posting: &str,
) -> Result<Json<PipelineResult>, AppError> {
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let result = state.coordinator.run(resume_text, posting, &cancel).await?;
    let flagged = result.flagged_claims();
    info!(
        "Run {} returned {:?} with {} changes and {} flagged claims",
        result.run_id,
        result.status,
        result.changes.len(),
        flagged.len()
    );
    for claim in &flagged {
        warn!("Run {}: unverified claim {claim}", result.run_id);
    }
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use crate::config::Config;
    use crate::llm_client::testing::ScriptedService;
    use crate::llm_client::LlmSettings;
    use crate::models::report::PipelineStatus;
    use crate::pipeline::error::PipelineError;
    use crate::pipeline::{Coordinator, PipelineConfig};
    use crate::sources::{FetchError, PostingFetcher};
    use crate::tailoring::prompts::{EXTRACT_SYSTEM, STRUCTURE_SYSTEM, TAILOR_SYSTEM};

    const POSTING: &str = "Platform Engineer at Initech. Required: Rust and Kubernetes. \
        Nice to have: Terraform.";

    struct CannedFetcher;

    #[async_trait]
    impl PostingFetcher for CannedFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Ok(POSTING.to_string())
        }
    }

    fn state(service: ScriptedService) -> AppState {
        let pipeline = PipelineConfig {
            backoff_base: Duration::from_millis(1),
            ..PipelineConfig::default()
        };
        let config = Config {
            anthropic_api_key: "test".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            max_resume_bytes: 1024,
            llm: LlmSettings {
                model: "test-model".to_string(),
                temperature: 0.0,
                max_tokens: 1024,
                request_timeout: Duration::from_secs(5),
            },
            pipeline: pipeline.clone(),
        };
        AppState {
            config,
            coordinator: Arc::new(Coordinator::new(Arc::new(service), pipeline)),
            fetcher: Arc::new(CannedFetcher),
            shutdown: CancellationToken::new(),
        }
    }

    fn scripted() -> ScriptedService {
        ScriptedService::new()
            .always(
                EXTRACT_SYSTEM,
                r#"{"title": "Platform Engineer", "company": "Initech",
                    "skills": [{"name": "Rust", "required": true},
                               {"name": "Kubernetes", "required": true}],
                    "qualifications": [], "keywords": []}"#,
            )
            .always(
                STRUCTURE_SYSTEM,
                r#"{"sections": [{"name": "experience", "entries": [
                    {"text": "Systems Engineer, Hooli", "role": "Systems Engineer",
                     "organization": "Hooli", "bullets": ["Wrote Rust services on k8s"]}
                ]}]}"#,
            )
            .always(TAILOR_SYSTEM, "[]")
    }

    const RESUME: &str = "Systems Engineer, Hooli\n- Wrote Rust services on k8s";

    #[tokio::test]
    async fn test_tailor_from_url_uses_fetcher() {
        let request = TailorRequest {
            resume_text: RESUME.to_string(),
            job_text: None,
            job_url: Some("https://jobs.example.com/42".to_string()),
        };
        let Json(result) = handle_tailor(State(state(scripted())), Json(request))
            .await
            .unwrap();
        assert_eq!(result.status, PipelineStatus::Verified);
        assert_eq!(result.requirements.skills.len(), 2);
    }

    #[tokio::test]
    async fn test_tailor_without_posting_is_a_validation_error() {
        let request = TailorRequest {
            resume_text: RESUME.to_string(),
            job_text: None,
            job_url: None,
        };
        let err = handle_tailor(State(state(scripted())), Json(request))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_blank_posting_text_reaches_the_extractor() {
        let request = TailorRequest {
            resume_text: RESUME.to_string(),
            job_text: Some("   ".to_string()),
            job_url: None,
        };
        let err = handle_tailor(State(state(scripted())), Json(request))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Pipeline(PipelineError::Stage { .. })));
    }

    #[tokio::test]
    async fn test_oversized_resume_is_rejected() {
        let request = TailorRequest {
            resume_text: "x".repeat(2048),
            job_text: Some(POSTING.to_string()),
            job_url: None,
        };
        let err = handle_tailor(State(state(scripted())), Json(request))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_requests() {
        let state = state(scripted());
        state.shutdown.cancel();
        let request = RequirementsRequest {
            job_text: POSTING.to_string(),
        };
        let err = handle_extract_requirements(State(state), Json(request))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Pipeline(PipelineError::Cancelled)));
    }
}
