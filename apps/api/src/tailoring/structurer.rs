//! Resume Structurer: raw resume text to the immutable `original` ResumeDocument.
//!
//! The service does the splitting; this module assigns stable entry ids and
//! refuses any structure that silently lost a number or proper noun.

use serde::Deserialize;
use tracing::{info, warn};

use crate::grounding::coverage::{check_coverage, CoverageReport};
use crate::llm_client::structured::{complete_structured, SchemaCheck};
use crate::llm_client::ReasoningService;
use crate::models::resume::{Entry, EntryId, ResumeDocument, Section};
use crate::pipeline::error::StageError;
use crate::tailoring::prompts::{
    STRUCTURE_PROMPT_TEMPLATE, STRUCTURE_REPAIR_TEMPLATE, STRUCTURE_SYSTEM,
};

#[derive(Debug, Deserialize)]
struct StructuredResume {
    #[serde(default)]
    sections: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    name: String,
    #[serde(default)]
    entries: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    text: String,
    role: Option<String>,
    organization: Option<String>,
    dates: Option<String>,
    #[serde(default)]
    bullets: Vec<String>,
}

impl SchemaCheck for StructuredResume {
    fn check(&self) -> Result<(), String> {
        match self.sections.iter().position(|s| section_key(&s.name).is_empty()) {
            Some(i) => Err(format!("sections[{i}].name is empty")),
            None => Ok(()),
        }
    }
}

/// Rejects resume text with nothing to structure, before any service call.
pub fn precheck_resume(text: &str) -> Result<&str, StageError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StageError::Structuring("resume text is empty".to_string()));
    }
    Ok(trimmed)
}

/// Structures a raw resume and checks verbatim coverage of its factual tokens.
///
/// When coverage is incomplete the service is asked once to restore the missing
/// tokens; if they are still missing the stage fails.
pub async fn structure_resume(
    service: &dyn ReasoningService,
    resume_text: &str,
) -> Result<ResumeDocument, StageError> {
    let resume = precheck_resume(resume_text)?;

    let prompt = STRUCTURE_PROMPT_TEMPLATE.replace("{resume_text}", resume);
    let structured: StructuredResume =
        complete_structured(service, STRUCTURE_SYSTEM, &prompt).await?;
    let document = build_document(structured)?;

    let coverage = check_coverage(resume, &document);
    if coverage.is_complete() {
        log_structured(&document, &coverage);
        return Ok(document);
    }

    warn!(
        "Structured resume dropped {} factual tokens; requesting repair",
        coverage.missing_count
    );
    let repair_prompt = STRUCTURE_REPAIR_TEMPLATE
        .replace("{missing}", &coverage.missing.join(", "))
        .replace("{resume_text}", resume);
    let repaired: StructuredResume =
        complete_structured(service, STRUCTURE_SYSTEM, &repair_prompt).await?;
    let document = build_document(repaired)?;

    let coverage = check_coverage(resume, &document);
    if !coverage.is_complete() {
        return Err(StageError::Structuring(format!(
            "structured resume is missing {} factual tokens from the original: {}",
            coverage.missing_count,
            coverage.missing.join(", ")
        )));
    }
    log_structured(&document, &coverage);
    Ok(document)
}

fn log_structured(document: &ResumeDocument, coverage: &CoverageReport) {
    info!(
        "Structured resume: {} sections, {} entries, {} factual tokens covered",
        document.sections.len(),
        document.entry_count(),
        coverage.checked
    );
}

/// Assigns `section#index` ids in reading order. Repeated section names are
/// merged so every id stays unique.
fn build_document(structured: StructuredResume) -> Result<ResumeDocument, StageError> {
    let mut sections: Vec<Section> = Vec::new();

    for raw in structured.sections {
        let name = section_key(&raw.name);
        let position = match sections.iter().position(|s| s.name == name) {
            Some(p) => p,
            None => {
                sections.push(Section {
                    name: name.clone(),
                    entries: Vec::new(),
                });
                sections.len() - 1
            }
        };
        let section = &mut sections[position];

        for entry in raw.entries {
            let bullets: Vec<String> = entry
                .bullets
                .into_iter()
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect();
            let text = entry.text.trim().to_string();
            let role = non_blank(entry.role);
            let organization = non_blank(entry.organization);
            let dates = non_blank(entry.dates);
            if text.is_empty()
                && bullets.is_empty()
                && role.is_none()
                && organization.is_none()
                && dates.is_none()
            {
                continue;
            }
            let index = section.entries.len();
            section.entries.push(Entry {
                id: EntryId::new(name.clone(), index),
                text,
                role,
                organization,
                dates,
                bullets,
            });
        }
    }

    sections.retain(|s| !s.entries.is_empty());
    if sections.is_empty() {
        return Err(StageError::Structuring(
            "no section boundaries could be detected in the resume".to_string(),
        ));
    }
    Ok(ResumeDocument { sections })
}

/// "Work Experience " → "work_experience".
fn section_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
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

    const RESUME: &str = "EXPERIENCE\n\
        Engineering Manager, Contoso, 2018 - 2022\n\
        - Managed a team of 5 engineers\n\
        - Migrated billing to Azure\n";

    const COMPLETE: &str = r#"{"sections": [{"name": "Experience", "entries": [{
        "text": "Engineering Manager, Contoso, 2018 - 2022",
        "role": "Engineering Manager",
        "organization": "Contoso",
        "dates": "2018 - 2022",
        "bullets": ["Managed a team of 5 engineers", "Migrated billing to Azure"]
    }]}]}"#;

    const TRUNCATED: &str = r#"{"sections": [{"name": "experience", "entries": [{
        "text": "Engineering Manager, Contoso, 2018 - 2022",
        "role": "Engineering Manager",
        "organization": "Contoso",
        "dates": "2018 - 2022",
        "bullets": ["Managed a team of engineers"]
    }]}]}"#;

    #[tokio::test]
    async fn test_structure_assigns_ids_and_normalises_section_names() {
        let service = ScriptedService::new().reply(STRUCTURE_SYSTEM, COMPLETE);
        let doc = structure_resume(&service, RESUME).await.unwrap();

        assert_eq!(doc.sections[0].name, "experience");
        let entry = &doc.sections[0].entries[0];
        assert_eq!(entry.id, EntryId::new("experience", 0));
        assert_eq!(entry.bullets.len(), 2);
        assert_eq!(service.calls_for(STRUCTURE_SYSTEM), 1);
    }

    #[tokio::test]
    async fn test_truncation_triggers_repair_listing_missing_tokens() {
        let service = ScriptedService::new()
            .reply(STRUCTURE_SYSTEM, TRUNCATED)
            .reply(STRUCTURE_SYSTEM, COMPLETE);
        let doc = structure_resume(&service, RESUME).await.unwrap();

        assert_eq!(doc.entry_count(), 1);
        let prompts = service.prompts_for(STRUCTURE_SYSTEM);
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("azure"), "{}", prompts[1]);
    }

    #[tokio::test]
    async fn test_persistent_truncation_is_a_structuring_error() {
        let service = ScriptedService::new().always(STRUCTURE_SYSTEM, TRUNCATED);
        let err = structure_resume(&service, RESUME).await.unwrap_err();
        assert!(matches!(err, StageError::Structuring(msg) if msg.contains("missing")));
        assert_eq!(service.calls_for(STRUCTURE_SYSTEM), 2);
    }

    #[tokio::test]
    async fn test_no_sections_is_a_structuring_error() {
        let service = ScriptedService::new().reply(STRUCTURE_SYSTEM, r#"{"sections": []}"#);
        let err = structure_resume(&service, "just some words").await.unwrap_err();
        assert!(matches!(err, StageError::Structuring(msg) if msg.contains("section")));
    }

    #[test]
    fn test_repeated_sections_merge_with_unique_ids() {
        let structured: StructuredResume = serde_json::from_str(
            r#"{"sections": [
                {"name": "Projects", "entries": [{"text": "Parser"}]},
                {"name": "projects", "entries": [{"text": "Compiler"}, {"text": "  "}]}
            ]}"#,
        )
        .unwrap();
        let doc = build_document(structured).unwrap();
        assert_eq!(doc.sections.len(), 1);
        let ids: Vec<String> = doc.entries().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["projects#0", "projects#1"]);
    }

    #[test]
    fn test_empty_resume_fails_precheck() {
        assert!(matches!(
            precheck_resume(" \n\t"),
            Err(StageError::Structuring(_))
        ));
    }
}
