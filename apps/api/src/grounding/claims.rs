//! Atomic claim extraction, rule-based, deliberately over-inclusive.
//!
//! A claim is a minimal factual unit whose alteration would be fabrication:
//! a date, a quantity or a named entity. Structured fields (title, employer,
//! dates) are compared as fields by the verifier, not as claims.
//! Quantities and dates are normalised so "five" == "5" and "Jan 2020" == "01/2020".

use std::collections::BTreeSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::resume::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Date,
    Quantity,
    Entity,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Claim {
    pub kind: ClaimKind,
    /// Normalised value; two claims are the same fact iff kind and value match.
    pub value: String,
}

impl Claim {
    fn new(kind: ClaimKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Unit signature of a quantity ("$_k", "_%", "_ year"), used to pair an
    /// added quantity with the removed one it most likely replaced.
    pub fn unit_signature(&self) -> Option<String> {
        if self.kind != ClaimKind::Quantity {
            return None;
        }
        Some(
            self.value
                .chars()
                .map(|c| if c.is_ascii_digit() || c == '.' { '_' } else { c })
                .collect::<String>()
                .split('_')
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("_"),
        )
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            ClaimKind::Date => "date",
            ClaimKind::Quantity => "quantity",
            ClaimKind::Entity => "named entity",
        };
        write!(f, "{label} '{}'", self.value)
    }
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?,?\s+((?:19|20)\d{2})\b",
    )
    .expect("valid month-year pattern")
});

static NUMERIC_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(0?[1-9]|1[0-2])/((?:19|20)\d{2})\b|\b((?:19|20)\d{2})-(0[1-9]|1[0-2])\b")
        .expect("valid numeric date pattern")
});

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year pattern"));

static PRESENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpresent\b").expect("valid present pattern"));

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?P<cur>[$€£])?\s?\b(?P<num>\d+(?:,\d{3})*(?:\.\d+)?)(?:\s?(?P<suf>%|\+|x\b|k\b|mm\b|m\b|bn\b|b\b))?(?:\s*(?P<unit>years?|yrs?|months?|weeks?|days?|hours?|hrs?|minutes?|mins?)\b)?",
    )
    .expect("valid quantity pattern")
});

static WORD_QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<word>two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|fifteen|twenty|dozen)\b(?:\s*\+)?(?:\s*(?P<unit>years?|yrs?|months?|weeks?|days?|hours?|hrs?|minutes?|mins?)\b)?",
    )
    .expect("valid word quantity pattern")
});

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9+#.&'-]*").expect("valid word pattern"));

/// Capitalised words that carry no factual content on their own.
const NON_ENTITY_WORDS: &[&str] = &["i", "a", "an", "the", "and", "or", "of", "to", "in"];

/// Extracts date, quantity and named-entity claims from free text.
pub fn extract_claims(text: &str) -> BTreeSet<Claim> {
    let mut claims = BTreeSet::new();
    let masked = extract_dates(text, &mut claims);
    claims.extend(extract_quantities(&masked));
    for entity in named_entities(text) {
        claims.insert(Claim::new(ClaimKind::Entity, entity));
    }
    claims
}

/// Every claim of an entry, structured fields included as text.
pub fn entry_claims(entry: &Entry) -> BTreeSet<Claim> {
    extract_claims(&entry.full_text())
}

/// Quantity claims of `text` in order of appearance, repeats kept.
pub fn quantity_claims(text: &str) -> Vec<Claim> {
    let mut dates = BTreeSet::new();
    let masked = extract_dates(text, &mut dates);
    extract_quantities(&masked)
}

/// Lowercased word tokens, trailing punctuation trimmed.
pub fn word_set(text: &str) -> BTreeSet<String> {
    WORD.find_iter(text)
        .map(|m| trim_token(m.as_str()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Proper nouns, acronyms and mixed-case product names, lowercased.
///
/// Sentence-initial capitalisation is ignored unless the word has inner
/// capitals or is an acronym, since every bullet starts with a capital.
pub fn named_entities(text: &str) -> Vec<String> {
    capitalised_words(text)
        .into_iter()
        .filter(|w| !w.sentence_start || w.inner_caps)
        .map(|w| w.lower)
        .collect()
}

/// Capitalised words at the start of a sentence or bullet that
/// [`named_entities`] skips, lowercased.
pub fn sentence_initial_words(text: &str) -> Vec<String> {
    capitalised_words(text)
        .into_iter()
        .filter(|w| w.sentence_start && !w.inner_caps)
        .map(|w| w.lower)
        .collect()
}

struct Capitalised {
    lower: String,
    sentence_start: bool,
    inner_caps: bool,
}

fn capitalised_words(text: &str) -> Vec<Capitalised> {
    let mut out = Vec::new();
    let mut previous_end = 0usize;
    let mut first = true;

    for m in WORD.find_iter(text) {
        let gap = &text[previous_end..m.start()];
        let previous_token = text[..previous_end].trim_end();
        let sentence_start = first
            || gap.contains(['\n', '!', '?', ':', ';', '•', '*', '(', '|'])
            || previous_token.ends_with('.')
            || gap.trim().starts_with('-');
        first = false;
        previous_end = m.end();

        let token = trim_token(m.as_str());
        let mut chars = token.chars();
        let Some(head) = chars.next() else { continue };
        let rest: Vec<char> = chars.collect();
        let inner_caps = rest.iter().any(|c| c.is_ascii_uppercase());
        if rest.is_empty() || !head.is_ascii_uppercase() && !inner_caps {
            continue;
        }
        let lower = token.to_lowercase();
        if NON_ENTITY_WORDS.contains(&lower.as_str()) {
            continue;
        }
        out.push(Capitalised {
            lower,
            sentence_start,
            inner_caps,
        });
    }
    out
}

fn trim_token(token: &str) -> &str {
    token.trim_end_matches(['.', '-', '\'', '&'])
}

/// Records date claims and returns the text with every date span blanked,
/// so years are not double-counted as quantities.
fn extract_dates(text: &str, claims: &mut BTreeSet<Claim>) -> String {
    let mut masked = text.to_string();

    for caps in MONTH_YEAR.captures_iter(text) {
        let month = caps[1].to_lowercase();
        let index = MONTHS
            .iter()
            .position(|m| month.starts_with(m))
            .map(|i| i + 1)
            .unwrap_or(0);
        claims.insert(Claim::new(
            ClaimKind::Date,
            format!("{}-{:02}", &caps[2], index),
        ));
        blank(&mut masked, caps.get(0).map(|m| m.range()));
    }

    let snapshot = masked.clone();
    for caps in NUMERIC_MONTH_YEAR.captures_iter(&snapshot) {
        let (year, month) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
            (Some(m), Some(y), _, _) => (y.as_str(), m.as_str()),
            (_, _, Some(y), Some(m)) => (y.as_str(), m.as_str()),
            _ => continue,
        };
        let month: u32 = month.parse().unwrap_or(0);
        claims.insert(Claim::new(ClaimKind::Date, format!("{year}-{month:02}")));
        blank(&mut masked, caps.get(0).map(|m| m.range()));
    }

    let snapshot = masked.clone();
    for m in YEAR.find_iter(&snapshot) {
        claims.insert(Claim::new(ClaimKind::Date, m.as_str()));
        blank(&mut masked, Some(m.range()));
    }

    if PRESENT.is_match(&masked) {
        claims.insert(Claim::new(ClaimKind::Date, "present"));
    }

    masked
}

fn extract_quantities(text: &str) -> Vec<Claim> {
    let mut claims = Vec::new();
    for caps in QUANTITY.captures_iter(text) {
        let number = caps["num"].replace(',', "");
        let mut value = String::new();
        if let Some(cur) = caps.name("cur") {
            value.push_str(cur.as_str());
        }
        value.push_str(&number);
        if let Some(suffix) = caps.name("suf") {
            value.push_str(&suffix.as_str().to_lowercase());
        }
        if let Some(unit) = caps.name("unit") {
            value.push(' ');
            value.push_str(canonical_unit(unit.as_str()));
        }
        claims.push(Claim::new(ClaimKind::Quantity, value));
    }

    for caps in WORD_QUANTITY.captures_iter(text) {
        let number = match caps["word"].to_lowercase().as_str() {
            "two" => 2,
            "three" => 3,
            "four" => 4,
            "five" => 5,
            "six" => 6,
            "seven" => 7,
            "eight" => 8,
            "nine" => 9,
            "ten" => 10,
            "eleven" => 11,
            "twelve" | "dozen" => 12,
            "fifteen" => 15,
            _ => 20,
        };
        let mut value = number.to_string();
        if caps.get(0).is_some_and(|m| m.as_str().contains('+')) {
            value.push('+');
        }
        if let Some(unit) = caps.name("unit") {
            value.push(' ');
            value.push_str(canonical_unit(unit.as_str()));
        }
        claims.push(Claim::new(ClaimKind::Quantity, value));
    }
    claims
}

fn canonical_unit(unit: &str) -> &'static str {
    let unit = unit.to_lowercase();
    match unit.as_str() {
        u if u.starts_with("y") => "year",
        u if u.starts_with("mo") => "month",
        u if u.starts_with("w") => "week",
        u if u.starts_with("d") => "day",
        u if u.starts_with("h") => "hour",
        _ => "minute",
    }
}

fn blank(text: &mut String, range: Option<std::ops::Range<usize>>) {
    if let Some(range) = range {
        let spaces = " ".repeat(range.len());
        text.replace_range(range, &spaces);
    }
}
