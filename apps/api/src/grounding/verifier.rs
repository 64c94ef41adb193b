//! Fact Verifier: checks a tailored resume against the original, entry by entry.
//!
//! A pair is FLAGGED when the tailored entry:
//! - changes a structured field (title, employer, dates)
//! - adds or drops a date or quantity claim (an altered metric is reported as such)
//! - moves a quantity to a bullet it was never stated in, or repeats it
//! - names an entity or skill the original entry never mentions, or loses an entity it did
//! - escalates ownership ("contributed to" → "led") or adds absolute qualifiers
//!
//! False negatives are worse than false positives here: anything ambiguous is flagged.
//! The check is pure, so running it twice on the same pair gives the same report.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::grounding::claims::{
    entry_claims, quantity_claims, sentence_initial_words, word_set, Claim, ClaimKind,
};
use crate::models::report::{VerificationReport, VerificationStatus, VerificationVerdict};
use crate::models::requirements::JobRequirements;
use crate::models::resume::{Entry, ResumeDocument};
use crate::tailoring::skill_matcher::{skill_vocabulary, tokenize};

/// Verbs that claim more ownership than "worked on" / "contributed to".
const OWNERSHIP_WORDS: &[&str] = &[
    "led",
    "lead",
    "leading",
    "owned",
    "owner",
    "architected",
    "spearheaded",
    "founded",
    "co-founded",
    "directed",
    "headed",
    "managed",
    "oversaw",
    "drove",
    "pioneered",
    "invented",
    "sole",
    "solely",
    "single-handedly",
];

/// Qualifiers that turn a factual statement into a stronger one.
const ABSOLUTE_QUALIFIERS: &[&str] = &[
    "only",
    "first",
    "all",
    "every",
    "entire",
    "best",
    "top",
    "largest",
    "fastest",
    "award-winning",
    "record",
    "always",
    "guaranteed",
    "world-class",
];

/// Common bullet openers. A rephrase may start a sentence with one of these
/// even when the original entry never used it.
const ACTION_VERBS: &[&str] = &[
    "built",
    "developed",
    "designed",
    "implemented",
    "improved",
    "reduced",
    "increased",
    "grew",
    "delivered",
    "created",
    "migrated",
    "wrote",
    "shipped",
    "maintained",
    "automated",
    "optimized",
    "optimised",
    "deployed",
    "launched",
    "streamlined",
    "collaborated",
    "partnered",
    "supported",
    "worked",
    "contributed",
    "established",
    "enabled",
    "scaled",
    "refactored",
    "tested",
    "analyzed",
    "analysed",
    "coordinated",
    "mentored",
    "resolved",
    "ran",
    "cut",
];

/// Words too common to tie a tailored bullet to an original one.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "in", "on", "to", "for", "by", "with", "at", "as",
    "from", "into", "over",
];

/// Verifies every tailored entry against the original entry with the same id.
///
/// `requirements` supplies the skill vocabulary: a requested skill that the
/// original entry never names is flagged even when written in lowercase.
pub fn verify(
    original: &ResumeDocument,
    tailored: &ResumeDocument,
    requirements: &JobRequirements,
) -> VerificationReport {
    let vocabulary = skill_vocabulary(requirements);
    let mut verdicts = Vec::with_capacity(tailored.entry_count());
    let mut seen = HashSet::new();

    for entry in tailored.entries() {
        let reasons = if !seen.insert(entry.id.clone()) {
            vec!["entry appears more than once in the tailored resume".to_string()]
        } else {
            match original.find(&entry.id) {
                Some(source) => compare_entries(source, entry, &vocabulary),
                None => vec!["entry has no counterpart in the original resume".to_string()],
            }
        };
        verdicts.push(verdict(entry, reasons));
    }

    for entry in original.entries() {
        if !seen.contains(&entry.id) {
            verdicts.push(verdict(
                entry,
                vec!["entry was dropped from the tailored resume".to_string()],
            ));
        }
    }

    let passed = verdicts
        .iter()
        .all(|v| v.status == VerificationStatus::Verified);

    let report = VerificationReport { verdicts, passed };
    info!(
        "Verification: {} pairs, {} flagged, passed={}",
        report.verdicts.len(),
        report.flagged_count(),
        report.passed
    );
    report
}

fn verdict(entry: &Entry, reasons: Vec<String>) -> VerificationVerdict {
    VerificationVerdict {
        entry: entry.id.clone(),
        status: if reasons.is_empty() {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Flagged
        },
        reasons,
    }
}

/// Returns every reason the tailored entry fails to match its source.
fn compare_entries(
    original: &Entry,
    tailored: &Entry,
    vocabulary: &BTreeSet<String>,
) -> Vec<String> {
    let mut reasons = Vec::new();

    compare_field("job title", &original.role, &tailored.role, &mut reasons);
    compare_field(
        "employer",
        &original.organization,
        &tailored.organization,
        &mut reasons,
    );
    compare_field("dates", &original.dates, &tailored.dates, &mut reasons);

    let before = entry_claims(original);
    let after = entry_claims(tailored);

    compare_dates(&before, &after, &mut reasons);
    compare_quantities(&before, &after, &mut reasons);
    compare_bullet_quantities(original, tailored, &before, &mut reasons);

    let original_words = EntryWords::of(original);
    let tailored_words = EntryWords::of(tailored);
    compare_entities(&before, &after, &original_words, &tailored_words, &mut reasons);
    compare_new_terms(tailored, &after, &original_words, vocabulary, &mut reasons);
    compare_wording(&original_words.words, &tailored_words.words, &mut reasons);

    if !reasons.is_empty() {
        debug!("Entry {} flagged: {:?}", tailored.id, reasons);
    }
    reasons
}

fn compare_field(
    label: &str,
    original: &Option<String>,
    tailored: &Option<String>,
    reasons: &mut Vec<String>,
) {
    let norm = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or("").to_string();
    let (a, b) = (norm(original), norm(tailored));
    if a != b {
        reasons.push(format!("changed {label}: '{a}' became '{b}'"));
    }
}

fn of_kind(claims: &BTreeSet<Claim>, kind: ClaimKind) -> BTreeSet<&Claim> {
    claims.iter().filter(|c| c.kind == kind).collect()
}

fn compare_dates(before: &BTreeSet<Claim>, after: &BTreeSet<Claim>, reasons: &mut Vec<String>) {
    let a = of_kind(before, ClaimKind::Date);
    let b = of_kind(after, ClaimKind::Date);
    for added in b.difference(&a) {
        reasons.push(format!("introduced {added} not in the original"));
    }
    for dropped in a.difference(&b) {
        reasons.push(format!("dropped {dropped}"));
    }
}

/// Pairs each added quantity with a dropped one of the same unit, so
/// "team of 5" → "team of 12" reads as an altered metric, not two problems.
fn compare_quantities(
    before: &BTreeSet<Claim>,
    after: &BTreeSet<Claim>,
    reasons: &mut Vec<String>,
) {
    let a = of_kind(before, ClaimKind::Quantity);
    let b = of_kind(after, ClaimKind::Quantity);
    let mut dropped: Vec<&Claim> = a.difference(&b).copied().collect();

    for added in b.difference(&a) {
        let replaced = dropped
            .iter()
            .position(|d| d.unit_signature() == added.unit_signature());
        match replaced {
            Some(i) => {
                let old = dropped.remove(i);
                reasons.push(format!(
                    "altered quantity: {} changed to {}",
                    old.value, added.value
                ));
            }
            None => reasons.push(format!("introduced {added} not in the original")),
        }
    }
    for old in dropped {
        reasons.push(format!("dropped {old}"));
    }
}

/// One heading or bullet: its content words and its quantities, repeats kept.
struct Segment {
    words: BTreeSet<String>,
    quantities: Vec<Claim>,
}

impl Segment {
    fn new(text: &str) -> Self {
        Self {
            words: word_set(text)
                .into_iter()
                .filter(|w| !STOP_WORDS.contains(&w.as_str()))
                .collect(),
            quantities: quantity_claims(text),
        }
    }

    fn shared_quantities(&self, available: &[Claim]) -> usize {
        let mut pool = available.to_vec();
        self.quantities
            .iter()
            .filter(|q| match pool.iter().position(|p| p == *q) {
                Some(i) => {
                    pool.swap_remove(i);
                    true
                }
                None => false,
            })
            .count()
    }
}

fn segments(entry: &Entry) -> Vec<Segment> {
    std::iter::once(entry.text.as_str())
        .filter(|t| !t.trim().is_empty())
        .chain(entry.bullets.iter().map(String::as_str))
        .map(Segment::new)
        .collect()
}

/// Ties every quantity to the bullet it was stated in. Each tailored segment
/// is paired with the original segment scoring two points per shared word and
/// one per shared unspent quantity (earliest wins ties), and may only spend
/// that segment's quantities, each as often as the original states it.
///
/// Quantities absent from the whole original entry are already reported by
/// [`compare_quantities`] and are skipped here.
fn compare_bullet_quantities(
    original: &Entry,
    tailored: &Entry,
    before: &BTreeSet<Claim>,
    reasons: &mut Vec<String>,
) {
    let sources = segments(original);
    if sources.is_empty() {
        return;
    }
    let mut remaining: Vec<Vec<Claim>> = sources.iter().map(|s| s.quantities.clone()).collect();

    for segment in segments(tailored) {
        if segment.quantities.is_empty() {
            continue;
        }
        let mut best = 0;
        let mut best_score = 0;
        for (i, source) in sources.iter().enumerate() {
            let score = 2 * segment.words.intersection(&source.words).count()
                + segment.shared_quantities(&remaining[i]);
            if score > best_score {
                best = i;
                best_score = score;
            }
        }

        for quantity in &segment.quantities {
            if !before.contains(quantity) {
                continue;
            }
            let pool = &mut remaining[best];
            if let Some(i) = pool.iter().position(|q| q == quantity) {
                pool.remove(i);
                continue;
            }
            if sources[best].quantities.contains(quantity) {
                reasons.push(format!(
                    "{quantity} is repeated more often than in the original"
                ));
            } else if let Some(i) = pool
                .iter()
                .position(|q| q.unit_signature() == quantity.unit_signature())
            {
                let old = pool.remove(i);
                reasons.push(format!(
                    "altered quantity: {} changed to {}",
                    old.value, quantity.value
                ));
            } else {
                reasons.push(format!(
                    "{quantity} is attached to a statement the original never made it about"
                ));
            }
        }
    }
}

/// Words of one entry, as written and as canonical skill terms.
struct EntryWords {
    words: BTreeSet<String>,
    terms: BTreeSet<String>,
}

impl EntryWords {
    fn of(entry: &Entry) -> Self {
        let text = entry.full_text();
        Self {
            words: word_set(&text),
            terms: tokenize(&text).into_iter().collect(),
        }
    }

    /// True when `word` appears, directly or as an alias ("k8s" for "kubernetes").
    fn mentions(&self, word: &str) -> bool {
        if self.words.contains(word) {
            return true;
        }
        let terms = tokenize(word);
        !terms.is_empty() && terms.iter().all(|t| self.terms.contains(t))
    }
}

/// Entities are compared by word presence rather than claim sets, because a
/// rephrase can move a name to the start of a sentence where it no longer
/// reads as a proper noun.
fn compare_entities(
    before: &BTreeSet<Claim>,
    after: &BTreeSet<Claim>,
    original_words: &EntryWords,
    tailored_words: &EntryWords,
    reasons: &mut Vec<String>,
) {
    for claim in of_kind(after, ClaimKind::Entity) {
        if !original_words.mentions(&claim.value) {
            reasons.push(format!("introduced {claim} not in the original"));
        }
    }
    for claim in of_kind(before, ClaimKind::Entity) {
        if !tailored_words.mentions(&claim.value) {
            reasons.push(format!("dropped {claim}"));
        }
    }
}

/// Flags words the original entry never uses that the capitalised-entity
/// check cannot see: requested or known skills in any case, and capitalised
/// words opening a sentence or bullet.
fn compare_new_terms(
    tailored: &Entry,
    after: &BTreeSet<Claim>,
    original_words: &EntryWords,
    vocabulary: &BTreeSet<String>,
    reasons: &mut Vec<String>,
) {
    let mut reported: BTreeSet<String> = of_kind(after, ClaimKind::Entity)
        .into_iter()
        .map(|c| c.value.clone())
        .collect();

    for term in tokenize(&tailored.full_text()) {
        if vocabulary.contains(&term)
            && !original_words.mentions(&term)
            && reported.insert(term.clone())
        {
            reasons.push(format!("introduced skill '{term}' not in the original"));
        }
    }

    for word in sentence_initial_words(&tailored.full_text()) {
        let w = word.as_str();
        if original_words.mentions(w)
            || ACTION_VERBS.contains(&w)
            || OWNERSHIP_WORDS.contains(&w)
            || ABSOLUTE_QUALIFIERS.contains(&w)
            || !reported.insert(word.clone())
        {
            continue;
        }
        reasons.push(format!(
            "introduced '{word}' at the start of a sentence; the original never mentions it"
        ));
    }
}

fn compare_wording(
    original_words: &BTreeSet<String>,
    tailored_words: &BTreeSet<String>,
    reasons: &mut Vec<String>,
) {
    for word in OWNERSHIP_WORDS {
        if tailored_words.contains(*word) && !original_words.contains(*word) {
            reasons.push(format!(
                "ownership escalated: '{word}' does not appear in the original"
            ));
        }
    }
    for word in ABSOLUTE_QUALIFIERS {
        if tailored_words.contains(*word) && !original_words.contains(*word) {
            reasons.push(format!(
                "added qualifier '{word}' that could change the meaning"
            ));
        }
    }
}
