//! Skill Matcher: pluggable, trait-based comparison of extracted requirements
//! against the structured resume.
//!
//! Default: `KeywordSkillMatcher` (pure Rust, deterministic, no service call).
//! The coordinator holds an `Arc<dyn SkillMatcher>`, so a semantic backend can be
//! swapped in without touching the pipeline.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::models::analysis::{GapSkill, MatchReport, MatchedSkill, TransferableSkill};
use crate::models::requirements::{JobRequirements, Requirement};
use crate::models::resume::{Entry, EntryId, ResumeDocument};
use crate::pipeline::error::StageError;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait SkillMatcher: Send + Sync {
    /// Classifies every requirement as matched, transferable or a gap.
    ///
    /// Fails only on malformed input; a resume with no matches is a valid result.
    async fn match_skills(
        &self,
        requirements: &JobRequirements,
        resume: &ResumeDocument,
    ) -> Result<MatchReport, StageError>;
}

/// Whole-token phrase matching with aliases, stated-years inference, a
/// related-skills table, and partial overlap for multi-word requirements.
pub struct KeywordSkillMatcher;

#[async_trait]
impl SkillMatcher for KeywordSkillMatcher {
    async fn match_skills(
        &self,
        requirements: &JobRequirements,
        resume: &ResumeDocument,
    ) -> Result<MatchReport, StageError> {
        compute_matches(requirements, resume)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ────────────────────────────────────────────────────────────────────────────

static YEARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*(?:years?|yrs?)\b").expect("valid years pattern")
});

static YEAR_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b((?:19|20)\d{2})\s*(?:-|–|to)\s*((?:19|20)\d{2})\b")
        .expect("valid year range pattern")
});

const ALIASES: &[(&str, &str)] = &[
    ("k8s", "kubernetes"),
    ("js", "javascript"),
    ("golang", "go"),
    ("postgres", "postgresql"),
    ("ts", "typescript"),
    ("py", "python"),
];

/// Words that say nothing about which skill is meant.
const FILLER_WORDS: &[&str] = &[
    "a", "an", "and", "or", "of", "in", "with", "the", "to", "for", "on", "at", "as",
    "experience", "experienced", "knowledge", "proficiency", "proficient", "strong",
    "solid", "familiarity", "familiar", "understanding", "skills", "skill", "ability",
    "years", "year", "yrs", "yr", "plus", "working", "hands-on", "professional",
];

/// Analogous skills, symmetric. Confidence is what one says about the other.
const RELATED_SKILLS: &[(&str, &str, f32)] = &[
    ("kubernetes", "docker", 0.6),
    ("kubernetes", "openshift", 0.7),
    ("typescript", "javascript", 0.7),
    ("postgresql", "mysql", 0.6),
    ("sql", "postgresql", 0.8),
    ("sql", "mysql", 0.8),
    ("pytorch", "tensorflow", 0.6),
    ("react", "vue", 0.5),
    ("kafka", "rabbitmq", 0.5),
    ("terraform", "pulumi", 0.6),
    ("jenkins", "github actions", 0.6),
    ("java", "kotlin", 0.6),
];

/// Skill names that are also everyday words. Written in lowercase they are
/// read as the word, so "ready to go live" is not evidence of Go.
const AMBIGUOUS_WORDS: &[&str] = &["go"];

/// Competing platforms. Experience with one never evidences another.
const VENDORS: &[&str] = &["aws", "azure", "gcp", "google", "amazon", "oracle", "ibm", "alibaba"];

const PARTIAL_OVERLAP_MIN: f32 = 0.5;
const PARTIAL_OVERLAP_SCALE: f32 = 0.8;
const GENERIC_YEARS_CONFIDENCE: f32 = 0.75;
const UNDATED_SKILL_CONFIDENCE: f32 = 0.5;

/// Lowercased tokens split on anything outside `[a-z0-9+#.]`, aliases resolved.
/// Trailing dots are trimmed so "Python." matches but ".NET" keeps its dot.
/// Ambiguous words written in lowercase are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '.')))
        .map(|t| t.trim_end_matches('.'))
        .filter(|t| !t.is_empty())
        .filter_map(|raw| {
            let t = raw.to_lowercase();
            if raw == t && AMBIGUOUS_WORDS.contains(&t.as_str()) {
                return None;
            }
            let canonical = ALIASES
                .iter()
                .find(|(alias, _)| *alias == t)
                .map(|(_, canonical)| canonical.to_string());
            Some(canonical.unwrap_or(t))
        })
        .collect()
}

/// Canonical single-word skill terms: the content words of the requested
/// skills and keywords, plus every term the alias, related-skill and vendor
/// tables know about. Compare against [`tokenize`] output.
pub fn skill_vocabulary(requirements: &JobRequirements) -> BTreeSet<String> {
    let mut vocabulary: BTreeSet<String> = requirements
        .skills
        .iter()
        .map(|s| s.name.as_str())
        .chain(requirements.keywords.iter().map(String::as_str))
        .flat_map(|text| content_tokens(&tokenize(text)))
        .collect();
    vocabulary.extend(ALIASES.iter().map(|(_, canonical)| canonical.to_string()));
    vocabulary.extend(
        RELATED_SKILLS
            .iter()
            .flat_map(|(a, b, _)| [*a, *b])
            .filter(|term| !term.contains(' '))
            .map(str::to_string),
    );
    vocabulary.extend(VENDORS.iter().map(|v| v.to_string()));
    vocabulary
}

fn occurrences(haystack: &[String], phrase: &[String]) -> usize {
    if phrase.is_empty() || phrase.len() > haystack.len() {
        return 0;
    }
    haystack.windows(phrase.len()).filter(|w| *w == phrase).count()
}

fn content_tokens(tokens: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .iter()
        .filter(|t| !FILLER_WORDS.contains(&t.as_str()))
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit() || c == '+'))
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// True when `text` evidences `requirement` lexically: the whole phrase
/// appears, or every content word of it does.
pub fn mentions(text: &str, requirement: &str) -> bool {
    let haystack = tokenize(text);
    let phrase = tokenize(requirement);
    if occurrences(&haystack, &phrase) > 0 {
        return true;
    }
    let content = content_tokens(&phrase);
    !content.is_empty() && content.iter().all(|t| haystack.contains(t))
}

// ────────────────────────────────────────────────────────────────────────────
// Core matching algorithm
// ────────────────────────────────────────────────────────────────────────────

struct IndexedEntry<'a> {
    id: &'a EntryId,
    tokens: Vec<String>,
    stated_years: Option<u32>,
}

impl<'a> IndexedEntry<'a> {
    fn new(entry: &'a Entry) -> Self {
        let text = entry.full_text();
        Self {
            id: &entry.id,
            tokens: tokenize(&text),
            stated_years: stated_years(entry, &text),
        }
    }

    fn contains_all(&self, words: &[String]) -> bool {
        words.iter().all(|w| self.tokens.contains(w))
    }

    fn density(&self, hits: usize, phrase_len: usize) -> f32 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        ((hits * phrase_len) as f32 / self.tokens.len() as f32).min(1.0)
    }
}

/// Largest explicit "N years" mention, or the span of a closed year range in the dates.
fn stated_years(entry: &Entry, text: &str) -> Option<u32> {
    let mentioned = YEARS
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max();
    let spanned = entry.dates.as_deref().and_then(|d| {
        YEAR_RANGE.captures(d).and_then(|c| {
            let start: u32 = c[1].parse().ok()?;
            let end: u32 = c[2].parse().ok()?;
            end.checked_sub(start)
        })
    });
    mentioned.max(spanned)
}

enum Outcome {
    Matched(MatchedSkill),
    Transferable(TransferableSkill),
    Gap(GapSkill),
}

fn compute_matches(
    requirements: &JobRequirements,
    resume: &ResumeDocument,
) -> Result<MatchReport, StageError> {
    if requirements.is_empty() {
        return Err(StageError::Matching(
            "requirement set is empty; there is nothing to match the resume against".to_string(),
        ));
    }
    if resume.entry_count() == 0 {
        return Err(StageError::Matching(
            "resume has no entries to search for evidence".to_string(),
        ));
    }

    let entries: Vec<IndexedEntry> = resume.entries().map(IndexedEntry::new).collect();

    let mut matched = Vec::new();
    let mut transferable = Vec::new();
    let mut gaps = Vec::new();
    let mut total_weight = 0.0_f32;
    let mut earned = 0.0_f32;

    for requirement in requirements.requirements() {
        total_weight += requirement.weight;
        match classify(&requirement, &entries) {
            Outcome::Matched(m) => {
                earned += requirement.weight;
                matched.push(m);
            }
            Outcome::Transferable(t) => {
                earned += requirement.weight * t.confidence;
                transferable.push(t);
            }
            Outcome::Gap(g) => gaps.push(g),
        }
    }

    let match_score = if total_weight > 0.0 {
        ((earned / total_weight) * 100.0).round().clamp(0.0, 100.0) as u32
    } else {
        0
    };
    let summary = build_summary(match_score, &gaps, transferable.len());

    info!(
        "Skill match: {} matched, {} transferable, {} gaps, score {}/100",
        matched.len(),
        transferable.len(),
        gaps.len(),
        match_score
    );

    Ok(MatchReport {
        matched,
        gaps,
        transferable,
        match_score,
        summary,
    })
}

fn classify(requirement: &Requirement, entries: &[IndexedEntry]) -> Outcome {
    let phrase = tokenize(&requirement.reference.text);
    let content = content_tokens(&phrase);
    let required_years = YEARS
        .captures(&requirement.reference.text)
        .and_then(|c| c[1].parse::<u32>().ok());

    if let Some(years) = required_years {
        if let Some(outcome) = classify_years(requirement, years, &content, entries) {
            return outcome;
        }
    }

    if let Some(m) = direct_evidence(requirement, &phrase, &content, entries) {
        return Outcome::Matched(m);
    }
    if let Some(t) = related_evidence(requirement, &phrase, entries) {
        return Outcome::Transferable(t);
    }
    if let Some(t) = partial_evidence(requirement, &content, entries) {
        return Outcome::Transferable(t);
    }
    Outcome::Gap(GapSkill {
        requirement: requirement.reference.clone(),
    })
}

/// "5+ years Rust" needs Rust and enough stated years in one entry.
/// "5 years experience" with no subject is inferred from any stated duration.
fn classify_years(
    requirement: &Requirement,
    required: u32,
    subject: &[String],
    entries: &[IndexedEntry],
) -> Option<Outcome> {
    let candidates = entries
        .iter()
        .filter(|e| e.contains_all(subject))
        .filter_map(|e| e.stated_years.map(|y| (e, y)));
    let best = first_max(candidates);

    match (best, subject.is_empty()) {
        (Some((entry, stated)), false) if stated >= required => {
            Some(Outcome::Matched(MatchedSkill {
                requirement: requirement.reference.clone(),
                evidence: entry.id.clone(),
                strength: 1.0,
            }))
        }
        (Some((entry, stated)), is_generic) => {
            let ratio = (stated as f32 / required.max(1) as f32).min(1.0);
            let scale = if is_generic {
                GENERIC_YEARS_CONFIDENCE
            } else {
                PARTIAL_OVERLAP_SCALE
            };
            Some(Outcome::Transferable(TransferableSkill {
                requirement: requirement.reference.clone(),
                inferred_from: entry.id.clone(),
                confidence: (ratio * scale).clamp(0.0, 1.0),
                basis: format!("{stated} years stated in {}", entry.id),
            }))
        }
        (None, false) => entries
            .iter()
            .find(|e| e.contains_all(subject))
            .map(|entry| {
                Outcome::Transferable(TransferableSkill {
                    requirement: requirement.reference.clone(),
                    inferred_from: entry.id.clone(),
                    confidence: UNDATED_SKILL_CONFIDENCE,
                    basis: format!(
                        "{} appears in {} without a stated duration",
                        subject.join(" "),
                        entry.id
                    ),
                })
            }),
        (None, true) => None,
    }
}

/// Picks the strongest evidence: highest density, earliest entry on ties.
fn direct_evidence(
    requirement: &Requirement,
    phrase: &[String],
    content: &[String],
    entries: &[IndexedEntry],
) -> Option<MatchedSkill> {
    let mut best: Option<(&IndexedEntry, f32)> = None;
    for entry in entries {
        let hits = occurrences(&entry.tokens, phrase);
        let density = if hits > 0 {
            entry.density(hits, phrase.len())
        } else if !content.is_empty() && entry.contains_all(content) {
            entry.density(1, content.len())
        } else {
            continue;
        };
        if best.map_or(true, |(_, d)| density > d) {
            best = Some((entry, density));
        }
    }
    best.map(|(entry, strength)| MatchedSkill {
        requirement: requirement.reference.clone(),
        evidence: entry.id.clone(),
        strength,
    })
}

fn related_evidence(
    requirement: &Requirement,
    phrase: &[String],
    entries: &[IndexedEntry],
) -> Option<TransferableSkill> {
    let wanted = phrase.join(" ");
    let mut best: Option<(&IndexedEntry, &str, f32)> = None;

    for (a, b, confidence) in RELATED_SKILLS {
        let related = if *a == wanted {
            *b
        } else if *b == wanted {
            *a
        } else {
            continue;
        };
        let related_tokens = tokenize(related);
        let hit = entries
            .iter()
            .find(|e| occurrences(&e.tokens, &related_tokens) > 0);
        if let Some(entry) = hit {
            if best.map_or(true, |(_, _, c)| *confidence > c) {
                best = Some((entry, related, *confidence));
            }
        }
    }

    best.map(|(entry, related, confidence)| TransferableSkill {
        requirement: requirement.reference.clone(),
        inferred_from: entry.id.clone(),
        confidence,
        basis: format!("related skill '{related}' in {}", entry.id),
    })
}

/// Multi-word requirements half-covered by one entry. A named platform the
/// entry lacks disqualifies it outright.
fn partial_evidence(
    requirement: &Requirement,
    content: &[String],
    entries: &[IndexedEntry],
) -> Option<TransferableSkill> {
    if content.len() < 2 {
        return None;
    }
    let vendors: Vec<&String> = content
        .iter()
        .filter(|t| VENDORS.contains(&t.as_str()))
        .collect();

    let mut best: Option<(&IndexedEntry, usize)> = None;
    for entry in entries {
        if vendors.iter().any(|v| !entry.tokens.contains(v)) {
            continue;
        }
        let present = content.iter().filter(|t| entry.tokens.contains(t)).count();
        if best.map_or(true, |(_, p)| present > p) {
            best = Some((entry, present));
        }
    }

    let (entry, present) = best?;
    let ratio = present as f32 / content.len() as f32;
    (ratio >= PARTIAL_OVERLAP_MIN).then(|| TransferableSkill {
        requirement: requirement.reference.clone(),
        inferred_from: entry.id.clone(),
        confidence: (ratio * PARTIAL_OVERLAP_SCALE).clamp(0.0, 1.0),
        basis: format!("{present} of {} key terms in {}", content.len(), entry.id),
    })
}

/// Highest stated years; the earliest entry wins ties.
fn first_max<'a, 'b>(
    candidates: impl Iterator<Item = (&'a IndexedEntry<'b>, u32)>,
) -> Option<(&'a IndexedEntry<'b>, u32)> {
    candidates.fold(None, |best, (entry, years)| match best {
        Some((_, best_years)) if best_years >= years => best,
        _ => Some((entry, years)),
    })
}

/// Builds a human-readable summary from score and gaps.
fn build_summary(score: u32, gaps: &[GapSkill], transferable: usize) -> String {
    let top_gaps: Vec<&str> = gaps
        .iter()
        .take(3)
        .map(|g| g.requirement.text.as_str())
        .collect();

    if score >= 80 {
        "Strong match. The resume directly evidences the key requirements.".to_string()
    } else if top_gaps.is_empty() {
        format!(
            "Partial match ({score}/100). {transferable} requirements are only inferred from related experience."
        )
    } else if score >= 60 {
        format!(
            "Moderate match ({score}/100). Not evidenced: {}.",
            top_gaps.join(", ")
        )
    } else {
        format!(
            "Low match ({score}/100). Significant gaps: {}. Tailoring can only emphasise what the resume already shows.",
            top_gaps.join(", ")
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requirements::{RequirementKind, RequiredSkill};
    use crate::models::resume::Section;
    use proptest::prelude::*;

    fn entry(section: &str, index: usize, text: &str, bullets: &[&str]) -> Entry {
        Entry {
            id: EntryId::new(section, index),
            text: text.to_string(),
            role: None,
            organization: None,
            dates: None,
            bullets: bullets.iter().map(|b| b.to_string()).collect(),
        }
    }

    fn resume(entries: Vec<Entry>) -> ResumeDocument {
        ResumeDocument {
            sections: vec![Section {
                name: "experience".to_string(),
                entries,
            }],
        }
    }

    fn requirements(skills: &[&str], qualifications: &[&str]) -> JobRequirements {
        JobRequirements {
            title: None,
            company: None,
            skills: skills
                .iter()
                .map(|s| RequiredSkill {
                    name: s.to_string(),
                    weight: 1.0,
                    required: true,
                })
                .collect(),
            qualifications: qualifications.iter().map(|q| q.to_string()).collect(),
            keywords: vec![],
            experience_years: None,
        }
    }

    fn scenario_a_resume() -> ResumeDocument {
        resume(vec![
            entry(
                "experience",
                0,
                "Cloud Engineer, Contoso",
                &["Migrated reporting services to Azure"],
            ),
            entry(
                "experience",
                1,
                "Backend Developer, Initech",
                &["Python (6 years) for data pipelines and APIs"],
            ),
        ])
    }

    #[test]
    fn test_tokenize_resolves_aliases_and_keeps_symbols() {
        assert_eq!(tokenize("K8s, Golang."), vec!["kubernetes", "go"]);
        assert_eq!(tokenize("C++ and C#"), vec!["c++", "and", "c#"]);
        assert_eq!(tokenize(".NET"), vec![".net"]);
    }

    #[test]
    fn test_whole_token_matching_does_not_hit_substrings() {
        assert!(!mentions("Built tooling in JavaScript", "Java"));
        assert!(mentions("Deployed services on k8s", "Kubernetes"));
        assert!(mentions("Ran CI/CD pipelines", "CI/CD"));
    }

    #[test]
    fn test_scenario_python_aws_five_years() {
        let req = requirements(&["Python", "AWS"], &["5 years experience"]);
        let report = compute_matches(&req, &scenario_a_resume()).unwrap();

        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.matched[0].requirement.text, "Python");
        assert_eq!(report.matched[0].evidence, EntryId::new("experience", 1));

        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].requirement.text, "AWS");

        assert_eq!(report.transferable.len(), 1);
        let years = &report.transferable[0];
        assert_eq!(years.requirement.kind, RequirementKind::Qualification);
        assert_eq!(years.inferred_from, EntryId::new("experience", 1));
        assert!((years.confidence - GENERIC_YEARS_CONFIDENCE).abs() < f32::EPSILON);
        assert!(report.dangling_reference(&req).is_none());
    }

    #[test]
    fn test_competing_vendor_is_never_transferable() {
        let req = requirements(&["AWS Lambda"], &[]);
        let res = resume(vec![entry("experience", 0, "Azure Functions and Lambda calculus", &[])]);
        let report = compute_matches(&req, &res).unwrap();
        assert_eq!(report.gaps.len(), 1);
        assert!(report.transferable.is_empty());
    }

    #[test]
    fn test_skill_years_requirement_matched_when_enough_years() {
        let req = requirements(&[], &["5+ years Python"]);
        let report = compute_matches(&req, &scenario_a_resume()).unwrap();
        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.matched[0].evidence, EntryId::new("experience", 1));
    }

    #[test]
    fn test_skill_years_short_of_requirement_is_transferable() {
        let req = requirements(&[], &["8 years Python"]);
        let report = compute_matches(&req, &scenario_a_resume()).unwrap();
        assert_eq!(report.transferable.len(), 1);
        assert!(report.transferable[0].confidence < PARTIAL_OVERLAP_SCALE);
    }

    #[test]
    fn test_related_skill_is_transferable() {
        let req = requirements(&["Kubernetes"], &[]);
        let res = resume(vec![entry("experience", 0, "Containerised services with Docker", &[])]);
        let report = compute_matches(&req, &res).unwrap();
        assert_eq!(report.transferable.len(), 1);
        assert!((report.transferable[0].confidence - 0.6).abs() < f32::EPSILON);
        assert!(report.transferable[0].basis.contains("docker"));
    }

    #[test]
    fn test_tie_prefers_denser_then_earlier_entry() {
        let req = requirements(&["Rust"], &[]);
        let res = resume(vec![
            entry("experience", 0, "Wrote Rust services", &[]),
            entry("experience", 1, "Rust tools", &["Also Rust"]),
            entry("experience", 2, "Wrote Rust daemons", &[]),
        ]);
        let report = compute_matches(&req, &res).unwrap();
        assert_eq!(report.matched[0].evidence, EntryId::new("experience", 1));

        let tied = resume(vec![
            entry("experience", 0, "Wrote Rust services", &[]),
            entry("experience", 1, "Wrote Rust daemons", &[]),
        ]);
        let report = compute_matches(&req, &tied).unwrap();
        assert_eq!(report.matched[0].evidence, EntryId::new("experience", 0));
    }

    #[test]
    fn test_empty_requirements_is_a_matching_error() {
        let err = compute_matches(&requirements(&[], &[]), &scenario_a_resume()).unwrap_err();
        assert!(matches!(err, StageError::Matching(_)));
    }

    #[test]
    fn test_no_matches_is_a_valid_report() {
        let req = requirements(&["Haskell"], &[]);
        let report = compute_matches(&req, &scenario_a_resume()).unwrap();
        assert_eq!(report.match_score, 0);
        assert_eq!(report.gaps.len(), 1);
        assert!(report.summary.contains("Haskell"));
    }

    #[test]
    fn test_score_weights_transferable_by_confidence() {
        let req = requirements(&["Python", "Kubernetes"], &[]);
        let res = resume(vec![entry("experience", 0, "Python services in Docker", &[])]);
        let report = compute_matches(&req, &res).unwrap();
        // (1.0 + 0.6) / 2.0
        assert_eq!(report.match_score, 80);
        assert!(report.summary.contains("Strong match"));
    }

    #[test]
    fn test_lowercase_go_is_not_the_language() {
        assert_eq!(tokenize("ready to go live"), vec!["ready", "to", "live"]);
        assert!(!mentions("Ready to go live on day one", "Go"));
        assert!(mentions("Built services in Go", "Go"));
        assert!(mentions("Golang microservices", "Go"));

        let req = requirements(&["Go"], &[]);
        let res = resume(vec![entry("experience", 0, "Happy to go the extra mile", &[])]);
        let report = compute_matches(&req, &res).unwrap();
        assert!(report.matched.is_empty());
        assert_eq!(report.gaps.len(), 1);
    }

    #[test]
    fn test_skill_vocabulary_covers_requirements_and_tables() {
        let mut req = requirements(&["Rust", "CI/CD experience"], &[]);
        req.keywords = vec!["Snowflake".to_string()];
        let vocabulary = skill_vocabulary(&req);
        for term in ["rust", "ci", "cd", "snowflake", "kubernetes", "terraform", "python", "azure"] {
            assert!(vocabulary.contains(term), "missing {term}");
        }
        assert!(!vocabulary.contains("experience"));
        assert!(!vocabulary.contains("actions"));
    }

    const SKILL_POOL: &[&str] = &[
        "Rust", "Python", "Kubernetes", "Docker", "AWS", "Azure", "PostgreSQL", "MySQL",
        "Terraform", "Go", "Kafka", "React",
    ];

    const WORD_POOL: &[&str] = &[
        "Built", "services", "in", "Rust", "python", "k8s", "docker", "Azure", "pipelines",
        "MySQL", "golang", "go", "live", "Terraform", "with", "teams", "React", "Vue",
    ];

    proptest! {
        /// Every requirement lands in exactly one bucket, and every bucket
        /// cites a requirement that was extracted and an entry that exists.
        #[test]
        fn prop_match_report_only_cites_extracted_requirements(
            skills in proptest::sample::subsequence(SKILL_POOL.to_vec(), 1..6),
            years in proptest::option::of(1u32..10),
            bullets in proptest::collection::vec(
                proptest::sample::subsequence(WORD_POOL.to_vec(), 1..8),
                1..5,
            ),
            stated in 0u32..12,
        ) {
            let qualifications: Vec<String> =
                years.map(|y| format!("{y}+ years {}", skills[0])).into_iter().collect();
            let qualification_refs: Vec<&str> = qualifications.iter().map(String::as_str).collect();
            let req = requirements(&skills, &qualification_refs);

            let mut texts: Vec<String> = bullets.iter().map(|words| words.join(" ")).collect();
            texts[0] = format!("{} ({stated} years)", texts[0]);
            let res = resume(
                texts
                    .iter()
                    .enumerate()
                    .map(|(i, text)| entry("experience", i, text, &[]))
                    .collect(),
            );

            let report = compute_matches(&req, &res).unwrap();
            prop_assert!(report.dangling_reference(&req).is_none());
            prop_assert_eq!(
                report.matched.len() + report.transferable.len() + report.gaps.len(),
                req.requirements().count()
            );
            prop_assert!(report.match_score <= 100);
            for m in &report.matched {
                prop_assert!(res.find(&m.evidence).is_some());
            }
            for t in &report.transferable {
                prop_assert!(res.find(&t.inferred_from).is_some());
            }
        }
    }
}
