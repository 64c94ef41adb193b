//! Requirement Extractor: raw job posting text to a `JobRequirements` record.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::info;

use crate::llm_client::structured::{complete_structured, SchemaCheck};
use crate::llm_client::ReasoningService;
use crate::models::requirements::{JobRequirements, RequiredSkill, PREFERRED_WEIGHT, REQUIRED_WEIGHT};
use crate::pipeline::error::StageError;
use crate::tailoring::prompts::{EXTRACT_PROMPT_TEMPLATE, EXTRACT_SYSTEM};

/// Length bounds for posting text, counted in characters after trimming.
#[derive(Debug, Clone, Copy)]
pub struct PostingLimits {
    /// Anything shorter almost always means scraping or parsing failed upstream.
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for PostingLimits {
    fn default() -> Self {
        Self {
            min_chars: 50,
            max_chars: 50_000,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Response schema
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ExtractedPosting {
    title: Option<String>,
    company: Option<String>,
    #[serde(default)]
    skills: Vec<ExtractedSkill>,
    #[serde(default)]
    qualifications: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    experience_years: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ExtractedSkill {
    name: String,
    #[serde(default = "default_required")]
    required: bool,
    weight: Option<f32>,
}

fn default_required() -> bool {
    true
}

impl SchemaCheck for ExtractedPosting {
    fn check(&self) -> Result<(), String> {
        for (i, skill) in self.skills.iter().enumerate() {
            if skill.name.trim().is_empty() {
                return Err(format!("skills[{i}].name is empty"));
            }
            if let Some(w) = skill.weight {
                if !(0.0..=1.0).contains(&w) || w.is_nan() {
                    return Err(format!("skills[{i}].weight {w} is outside [0, 1]"));
                }
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stage entry points
// ────────────────────────────────────────────────────────────────────────────

/// Rejects posting text that cannot be a real posting, before any service call.
pub fn precheck_posting(text: &str, limits: PostingLimits) -> Result<&str, StageError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StageError::Extraction("job posting text is empty".to_string()));
    }
    let chars = trimmed.chars().count();
    if chars < limits.min_chars {
        return Err(StageError::Extraction(format!(
            "job posting text is too short ({chars} characters, minimum {}); \
             the posting was probably not fetched or parsed correctly",
            limits.min_chars
        )));
    }
    if chars > limits.max_chars {
        return Err(StageError::Extraction(format!(
            "job posting text is too long ({chars} characters, maximum {})",
            limits.max_chars
        )));
    }
    Ok(trimmed)
}

/// Extracts structured requirements from a job posting.
///
/// Deterministic for identical text under the pinned model settings
/// (temperature 0); any remaining variance comes from the service itself.
pub async fn extract_requirements(
    service: &dyn ReasoningService,
    posting_text: &str,
    limits: PostingLimits,
) -> Result<JobRequirements, StageError> {
    let posting = precheck_posting(posting_text, limits)?;
    let prompt = EXTRACT_PROMPT_TEMPLATE.replace("{posting_text}", posting);
    let extracted: ExtractedPosting = complete_structured(service, EXTRACT_SYSTEM, &prompt).await?;
    let requirements = normalise(extracted);

    info!(
        "Extracted {} skills, {} qualifications, {} keywords",
        requirements.skills.len(),
        requirements.qualifications.len(),
        requirements.keywords.len()
    );
    Ok(requirements)
}

/// Trims text, fills default weights, and drops case-insensitive duplicates
/// (first occurrence wins). Keywords that repeat a skill are dropped too.
fn normalise(extracted: ExtractedPosting) -> JobRequirements {
    let mut seen = HashSet::new();
    let skills: Vec<RequiredSkill> = extracted
        .skills
        .into_iter()
        .filter_map(|s| {
            let name = s.name.trim().to_string();
            seen.insert(name.to_lowercase()).then(|| RequiredSkill {
                weight: s.weight.unwrap_or(if s.required {
                    REQUIRED_WEIGHT
                } else {
                    PREFERRED_WEIGHT
                }),
                required: s.required,
                name,
            })
        })
        .collect();

    let qualifications = dedup(extracted.qualifications, &mut HashSet::new());
    let keywords = dedup(extracted.keywords, &mut seen);

    JobRequirements {
        title: non_blank(extracted.title),
        company: non_blank(extracted.company),
        skills,
        qualifications,
        keywords,
        experience_years: extracted.experience_years,
    }
}

fn dedup(items: Vec<String>, seen: &mut HashSet<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty() && seen.insert(item.to_lowercase()))
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedService;
    use crate::llm_client::ServiceError;

    const POSTING: &str = "Backend Engineer at Acme. Required: Python, AWS, 5 years experience. \
        Nice to have: Kubernetes. You will build data pipelines and APIs.";

    const REPLY: &str = r#"{
        "title": "Backend Engineer",
        "company": "Acme",
        "skills": [
            {"name": "Python", "required": true, "weight": 1.0},
            {"name": "AWS", "required": true},
            {"name": "python", "required": false, "weight": 0.3},
            {"name": "Kubernetes", "required": false}
        ],
        "qualifications": ["5 years experience"],
        "keywords": ["data pipelines", "AWS", "APIs"],
        "experience_years": 5
    }"#;

    #[test]
    fn test_precheck_rejects_empty_and_short_text() {
        let limits = PostingLimits::default();
        assert!(matches!(
            precheck_posting("   \n", limits),
            Err(StageError::Extraction(msg)) if msg.contains("empty")
        ));
        assert!(matches!(
            precheck_posting("Python dev", limits),
            Err(StageError::Extraction(msg)) if msg.contains("too short")
        ));
        assert!(precheck_posting(POSTING, limits).is_ok());
    }

    #[test]
    fn test_precheck_rejects_oversized_text() {
        let limits = PostingLimits {
            min_chars: 1,
            max_chars: 10,
        };
        assert!(matches!(
            precheck_posting("this is far longer than ten", limits),
            Err(StageError::Extraction(msg)) if msg.contains("too long")
        ));
    }

    #[tokio::test]
    async fn test_extract_fills_defaults_and_dedups() {
        let service = ScriptedService::new().reply(EXTRACT_SYSTEM, REPLY);
        let req = extract_requirements(&service, POSTING, PostingLimits::default())
            .await
            .unwrap();

        let names: Vec<&str> = req.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Python", "AWS", "Kubernetes"]);
        assert!((req.skills[1].weight - REQUIRED_WEIGHT).abs() < f32::EPSILON);
        assert!((req.skills[2].weight - PREFERRED_WEIGHT).abs() < f32::EPSILON);
        assert_eq!(req.keywords, vec!["data pipelines", "APIs"]);
        assert_eq!(req.experience_years, Some(5));
        assert_eq!(service.calls_for(EXTRACT_SYSTEM), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_weight_triggers_one_repair() {
        let bad = r#"{"skills": [{"name": "Python", "required": true, "weight": 4.0}]}"#;
        let service = ScriptedService::new()
            .reply(EXTRACT_SYSTEM, bad)
            .reply(EXTRACT_SYSTEM, REPLY);
        let req = extract_requirements(&service, POSTING, PostingLimits::default())
            .await
            .unwrap();
        assert_eq!(req.skills.len(), 3);
        assert_eq!(service.calls_for(EXTRACT_SYSTEM), 2);
        assert!(service.prompts_for(EXTRACT_SYSTEM)[1].contains("outside [0, 1]"));
    }

    #[tokio::test]
    async fn test_empty_posting_makes_no_service_call() {
        let service = ScriptedService::new().always(EXTRACT_SYSTEM, REPLY);
        let err = extract_requirements(&service, "", PostingLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Extraction(_)));
        assert_eq!(service.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_service_failure_is_surfaced_as_service_error() {
        let service = ScriptedService::new()
            .fail(EXTRACT_SYSTEM, ServiceError::RateLimited("slow down".to_string()));
        let err = extract_requirements(&service, POSTING, PostingLimits::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
