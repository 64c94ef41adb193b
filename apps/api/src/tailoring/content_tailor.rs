//! Content Tailor: reorders and rephrases the original resume toward the
//! matched requirements, producing a fresh `tailored` candidate each call.
//!
//! Ordering is decided here, deterministically; the service only rephrases.
//! Structured fields (role, organization, dates) are always copied from the
//! original entry, never from the service reply.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, SCOPE_INSTRUCTION};
use crate::llm_client::structured::{complete_structured, SchemaCheck};
use crate::llm_client::ReasoningService;
use crate::models::analysis::MatchReport;
use crate::models::report::{ChangeRecord, ChangeReport};
use crate::models::requirements::JobRequirements;
use crate::models::resume::{Entry, EntryId, ResumeDocument, Section};
use crate::pipeline::error::StageError;
use crate::tailoring::prompts::{
    TAILOR_PROMPT_TEMPLATE, TAILOR_REJECTION_TEMPLATE, TAILOR_SELF_CHECK_TEMPLATE, TAILOR_SYSTEM,
};
use crate::tailoring::skill_matcher::mentions;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One tailoring attempt: the candidate document and what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct TailoredCandidate {
    pub tailored: ResumeDocument,
    pub changes: ChangeReport,
}

/// A requirement the resume evidences, with the weight it lends to entries.
#[derive(Debug, Clone)]
struct Priority {
    text: String,
    weight: f32,
    cited: EntryId,
    matched: bool,
}

/// Planned position of one entry: its original position and bullet order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEntry {
    pub original_position: usize,
    pub bullet_order: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSection {
    pub name: String,
    pub entries: Vec<PlannedEntry>,
}

#[derive(Debug, Serialize)]
struct PromptEntry<'a> {
    entry_id: String,
    role: Option<&'a str>,
    organization: Option<&'a str>,
    dates: Option<&'a str>,
    text: &'a str,
    bullets: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct Rewrites(Vec<Rewrite>);

#[derive(Debug, Deserialize)]
struct Rewrite {
    entry_id: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    bullets: Vec<String>,
    #[serde(default)]
    rationale: String,
}

impl SchemaCheck for Rewrites {
    fn check(&self) -> Result<(), String> {
        for (i, rewrite) in self.0.iter().enumerate() {
            if EntryId::parse(&rewrite.entry_id).is_none() {
                return Err(format!(
                    "[{i}].entry_id '{}' is not of the form section#index",
                    rewrite.entry_id
                ));
            }
            if rewrite.bullets.iter().any(|b| b.trim().is_empty()) {
                return Err(format!("[{i}].bullets contains an empty bullet"));
            }
        }
        Ok(())
    }
}

/// A rewrite that passed the traceability self-check.
struct CheckedRewrite {
    text: Option<String>,
    bullets: Vec<String>,
    rationale: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Ordering
// ────────────────────────────────────────────────────────────────────────────

fn priorities(requirements: &JobRequirements, report: &MatchReport) -> Vec<Priority> {
    let matched = report.matched.iter().map(|m| Priority {
        text: m.requirement.text.clone(),
        weight: requirements.weight_of(&m.requirement),
        cited: m.evidence.clone(),
        matched: true,
    });
    let transferable = report.transferable.iter().map(|t| Priority {
        text: t.requirement.text.clone(),
        weight: requirements.weight_of(&t.requirement) * t.confidence,
        cited: t.inferred_from.clone(),
        matched: false,
    });
    matched.chain(transferable).collect()
}

fn evidenced_by<'p>(
    entry: &Entry,
    priorities: &'p [Priority],
) -> impl Iterator<Item = &'p Priority> {
    let text = entry.full_text();
    let id = entry.id.clone();
    priorities
        .iter()
        .filter(move |p| p.cited == id || mentions(&text, &p.text))
}

fn entry_priority(entry: &Entry, priorities: &[Priority]) -> f32 {
    evidenced_by(entry, priorities).map(|p| p.weight).sum()
}

fn bullet_priority(bullet: &str, priorities: &[Priority]) -> f32 {
    priorities
        .iter()
        .filter(|p| mentions(bullet, &p.text))
        .map(|p| p.weight)
        .sum()
}

/// Descending by priority, stable, so equally-weighted items keep their original order.
fn stable_order(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// Promotes entries (within their section) and bullets (within their entry)
/// by the summed weight of the requirements they evidence. Section order is kept.
pub fn plan_order(
    original: &ResumeDocument,
    requirements: &JobRequirements,
    report: &MatchReport,
) -> Vec<PlannedSection> {
    let priorities = priorities(requirements, report);

    original
        .sections
        .iter()
        .map(|section| {
            let scores: Vec<f32> = section
                .entries
                .iter()
                .map(|e| entry_priority(e, &priorities))
                .collect();
            let entries = stable_order(&scores)
                .into_iter()
                .map(|position| {
                    let entry = &section.entries[position];
                    let bullet_scores: Vec<f32> = entry
                        .bullets
                        .iter()
                        .map(|b| bullet_priority(b, &priorities))
                        .collect();
                    PlannedEntry {
                        original_position: position,
                        bullet_order: stable_order(&bullet_scores),
                    }
                })
                .collect();
            PlannedSection {
                name: section.name.clone(),
                entries,
            }
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tailoring
// ────────────────────────────────────────────────────────────────────────────

/// Produces one tailored candidate.
///
/// `rejections` are reasons earlier candidates failed verification; they are
/// passed to the service as hard constraints. A reply that fails the
/// traceability self-check is retried once before `TailoringError`.
pub async fn tailor_resume(
    service: &dyn ReasoningService,
    original: &ResumeDocument,
    requirements: &JobRequirements,
    report: &MatchReport,
    rejections: &[String],
) -> Result<TailoredCandidate, StageError> {
    let plan = plan_order(original, requirements, report);
    let prompt = build_prompt(original, &plan, requirements, report, rejections)?;

    let rewrites = match request_rewrites(service, &prompt, original).await {
        Err(StageError::Tailoring(problem)) => {
            warn!("Tailoring reply failed self-check ({problem}); retrying once");
            let retry_prompt = format!(
                "{prompt}\n\n{}",
                TAILOR_SELF_CHECK_TEMPLATE.replace("{problem}", &problem)
            );
            request_rewrites(service, &retry_prompt, original).await?
        }
        other => other?,
    };

    let candidate = assemble(original, &plan, requirements, report, rewrites);
    info!(
        "Tailored candidate: {} rewrites and moves across {} sections",
        candidate.changes.len(),
        candidate.changes.by_section().len()
    );
    Ok(candidate)
}

async fn request_rewrites(
    service: &dyn ReasoningService,
    prompt: &str,
    original: &ResumeDocument,
) -> Result<HashMap<EntryId, CheckedRewrite>, StageError> {
    let reply: Rewrites = complete_structured(service, TAILOR_SYSTEM, prompt).await?;
    self_check(reply, original)
}

/// Every rewrite must name a known entry, at most once, with the same bullet count.
fn self_check(
    reply: Rewrites,
    original: &ResumeDocument,
) -> Result<HashMap<EntryId, CheckedRewrite>, StageError> {
    let mut checked = HashMap::new();
    for rewrite in reply.0 {
        let not_traceable = |detail: String| {
            StageError::Tailoring(format!("rewrite is not traceable to the original: {detail}"))
        };
        let id = EntryId::parse(&rewrite.entry_id)
            .ok_or_else(|| not_traceable(format!("malformed entry_id '{}'", rewrite.entry_id)))?;
        let source = original
            .find(&id)
            .ok_or_else(|| not_traceable(format!("unknown entry_id '{id}'")))?;
        if checked.contains_key(&id) {
            return Err(not_traceable(format!("entry_id '{id}' appears more than once")));
        }
        if rewrite.bullets.len() != source.bullets.len() {
            return Err(not_traceable(format!(
                "entry '{id}' has {} bullets but {} were returned",
                source.bullets.len(),
                rewrite.bullets.len()
            )));
        }
        let text = rewrite
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && source.bullets.is_empty());
        checked.insert(
            id,
            CheckedRewrite {
                text,
                bullets: rewrite.bullets.into_iter().map(|b| b.trim().to_string()).collect(),
                rationale: rewrite.rationale.trim().to_string(),
            },
        );
    }
    Ok(checked)
}

fn build_prompt(
    original: &ResumeDocument,
    plan: &[PlannedSection],
    requirements: &JobRequirements,
    report: &MatchReport,
    rejections: &[String],
) -> Result<String, StageError> {
    let mut entries = Vec::with_capacity(original.entry_count());
    for (section, planned) in original.sections.iter().zip(plan) {
        for p in &planned.entries {
            let entry = &section.entries[p.original_position];
            entries.push(PromptEntry {
                entry_id: entry.id.to_string(),
                role: entry.role.as_deref(),
                organization: entry.organization.as_deref(),
                dates: entry.dates.as_deref(),
                text: &entry.text,
                bullets: p.bullet_order.iter().map(|&i| entry.bullets[i].as_str()).collect(),
            });
        }
    }
    let entries_json = serde_json::to_string_pretty(&entries)
        .map_err(|e| StageError::Tailoring(format!("could not serialise entries: {e}")))?;

    let mut ranked = priorities(requirements, report);
    ranked.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    let priorities_text = if ranked.is_empty() {
        "- none identified; keep the existing emphasis".to_string()
    } else {
        ranked
            .iter()
            .map(|p| {
                let kind = if p.matched { "evidenced" } else { "inferred" };
                format!("- {} ({kind}, weight {:.2})", p.text, p.weight)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let constraints = if rejections.is_empty() {
        String::new()
    } else {
        let reasons = rejections
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n");
        TAILOR_REJECTION_TEMPLATE.replace("{reasons}", &reasons)
    };

    Ok(TAILOR_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{scope_instruction}", SCOPE_INSTRUCTION)
        .replace("{priorities}", &priorities_text)
        .replace("{entries_json}", &entries_json)
        .replace("{constraints}", &constraints))
}

/// Builds the candidate wholesale from the original, the plan, and the checked rewrites.
fn assemble(
    original: &ResumeDocument,
    plan: &[PlannedSection],
    requirements: &JobRequirements,
    report: &MatchReport,
    mut rewrites: HashMap<EntryId, CheckedRewrite>,
) -> TailoredCandidate {
    let priorities = priorities(requirements, report);
    let mut sections = Vec::with_capacity(plan.len());
    let mut records = Vec::new();

    for (section, planned) in original.sections.iter().zip(plan) {
        let mut entries = Vec::with_capacity(section.entries.len());

        for (new_position, p) in planned.entries.iter().enumerate() {
            let source = &section.entries[p.original_position];
            let rewrite = rewrites.remove(&source.id);

            let bullets = match &rewrite {
                Some(r) if !r.bullets.is_empty() => r.bullets.clone(),
                _ => p
                    .bullet_order
                    .iter()
                    .map(|&i| source.bullets[i].clone())
                    .collect(),
            };
            let text = rewrite
                .as_ref()
                .and_then(|r| r.text.clone())
                .unwrap_or_else(|| source.text.clone());

            let tailored = Entry {
                id: source.id.clone(),
                text,
                role: source.role.clone(),
                organization: source.organization.clone(),
                dates: source.dates.clone(),
                bullets,
            };

            let moved = new_position != p.original_position;
            let reordered = p.bullet_order.iter().enumerate().any(|(i, &b)| i != b);
            let reworded = rewrite.as_ref().is_some_and(|r| {
                r.text.is_some()
                    || r
                        .bullets
                        .iter()
                        .zip(&p.bullet_order)
                        .any(|(new, &i)| *new != source.bullets[i])
            });

            if moved || reordered || reworded {
                let evidenced: Vec<&str> = evidenced_by(source, &priorities)
                    .map(|p| p.text.as_str())
                    .collect();
                let mut rationale = Vec::new();
                if reworded {
                    match rewrite.as_ref().map(|r| r.rationale.as_str()) {
                        Some(r) if !r.is_empty() => rationale.push(r.to_string()),
                        _ => rationale.push("rephrased for the target role".to_string()),
                    }
                }
                if moved {
                    rationale.push(format!(
                        "moved from position {} to {} in {} for: {}",
                        p.original_position + 1,
                        new_position + 1,
                        section.name,
                        if evidenced.is_empty() {
                            "higher-priority entries above it".to_string()
                        } else {
                            evidenced.join(", ")
                        }
                    ));
                }
                if reordered {
                    rationale.push(
                        "bullets reordered to lead with the most relevant evidence".to_string(),
                    );
                }
                records.push(ChangeRecord {
                    entry: source.id.clone(),
                    section: section.name.clone(),
                    original_text: source.render(),
                    tailored_text: tailored.render(),
                    rationale: rationale.join("; "),
                });
            }
            entries.push(tailored);
        }

        sections.push(Section {
            name: section.name.clone(),
            entries,
        });
    }

    let key_improvements = key_improvements(&priorities, &sections, &records);
    let warnings = report
        .gaps
        .iter()
        .map(|g| {
            format!(
                "No evidence for {} in the original resume; it was not added",
                g.requirement.text
            )
        })
        .collect();
    TailoredCandidate {
        tailored: ResumeDocument { sections },
        changes: ChangeReport {
            records,
            key_improvements,
            warnings,
        },
    }
}

/// One line per requirement whose cited entry was changed, heaviest first.
fn key_improvements(
    priorities: &[Priority],
    sections: &[Section],
    records: &[ChangeRecord],
) -> Vec<String> {
    let mut ranked: Vec<&Priority> = priorities.iter().collect();
    ranked.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));

    ranked
        .into_iter()
        .filter(|p| records.iter().any(|r| r.entry == p.cited))
        .filter_map(|p| {
            let section = sections.iter().find(|s| s.name == p.cited.section)?;
            let position = section.entries.iter().position(|e| e.id == p.cited)?;
            let kind = if p.matched { "evidenced" } else { "inferred" };
            Some(format!(
                "{} ({kind}) now led by {} at position {} in {}",
                p.text,
                p.cited,
                position + 1,
                section.name
            ))
        })
        .collect()
}
