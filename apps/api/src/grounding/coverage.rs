//! Verbatim coverage: every number and proper noun in the raw resume must
//! survive structuring in at least one entry. Catches silent truncation.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::grounding::claims::{named_entities, word_set};
use crate::models::resume::ResumeDocument;

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("valid digit pattern"));

/// Cap on tokens listed in a report; the count is always exact.
const MAX_LISTED: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub checked: usize,
    pub missing_count: usize,
    /// First few missing tokens in order of appearance.
    pub missing: Vec<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.missing_count == 0
    }
}

/// Checks that factual tokens of `raw_text` appear in `document`.
///
/// Digit runs must appear verbatim as whole runs. Named entities are matched as whole
/// words, case-insensitively, because section headers are often re-cased.
pub fn check_coverage(raw_text: &str, document: &ResumeDocument) -> CoverageReport {
    let haystack = document.searchable_text();
    let haystack_words = word_set(&haystack);
    let haystack_numbers: HashSet<&str> =
        DIGIT_RUN.find_iter(&haystack).map(|m| m.as_str()).collect();

    let mut tokens: Vec<(String, bool)> = DIGIT_RUN
        .find_iter(raw_text)
        .map(|m| (m.as_str().to_string(), haystack_numbers.contains(m.as_str())))
        .collect();
    tokens.extend(named_entities(raw_text).into_iter().map(|e| {
        let found = haystack_words.contains(&e);
        (e, found)
    }));

    let mut missing: Vec<String> = Vec::new();
    let mut missing_count = 0;
    let mut seen = HashSet::new();
    for (token, found) in &tokens {
        if *found || !seen.insert(token.as_str()) {
            continue;
        }
        missing_count += 1;
        if missing.len() < MAX_LISTED {
            missing.push(token.clone());
        }
    }

    CoverageReport {
        checked: tokens.len(),
        missing_count,
        missing,
    }
}
