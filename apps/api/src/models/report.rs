use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::analysis::MatchReport;
use crate::models::requirements::JobRequirements;
use crate::models::resume::{EntryId, ResumeDocument};

/// One modified entry: what it was, what it became, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub entry: EntryId,
    pub section: String,
    pub original_text: String,
    pub tailored_text: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub records: Vec<ChangeRecord>,
    /// One line per requirement the tailored resume now leads with.
    pub key_improvements: Vec<String>,
    /// Requirements the original resume has no evidence for.
    pub warnings: Vec<String>,
}

impl ChangeReport {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Number of changed entries per section.
    pub fn by_section(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.section.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Verified,
    Flagged,
}

/// Verdict for one (original, tailored) entry pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub entry: EntryId,
    pub status: VerificationStatus,
    /// Itemized reasons; empty when verified.
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verdicts: Vec<VerificationVerdict>,
    pub passed: bool,
}

impl VerificationReport {
    pub fn flagged(&self) -> impl Iterator<Item = &VerificationVerdict> {
        self.verdicts
            .iter()
            .filter(|v| v.status == VerificationStatus::Flagged)
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged().count()
    }

    /// `entry: reason` lines for every flagged claim, in verdict order.
    pub fn flagged_reasons(&self) -> Vec<String> {
        self.flagged()
            .flat_map(|v| v.reasons.iter().map(move |r| format!("{}: {}", v.entry, r)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Verified,
    Flagged,
}

/// Final bundle of one pipeline run. Everything a renderer or a change-report
/// view needs is carried here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub status: PipelineStatus,
    pub tailored: ResumeDocument,
    pub changes: ChangeReport,
    pub verification: VerificationReport,
    pub requirements: JobRequirements,
    pub match_report: MatchReport,
    pub tailoring_attempts: u32,
    pub completed_at: DateTime<Utc>,
}

impl PipelineResult {
    /// The claims a reader must double-check. Empty for verified results.
    pub fn flagged_claims(&self) -> Vec<String> {
        self.verification.flagged_reasons()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(section: &str, index: usize) -> ChangeRecord {
        ChangeRecord {
            entry: EntryId::new(section, index),
            section: section.to_string(),
            original_text: "a".to_string(),
            tailored_text: "b".to_string(),
            rationale: "reordered".to_string(),
        }
    }

    #[test]
    fn test_by_section_counts_changes() {
        let report = ChangeReport {
            records: vec![
                record("experience", 0),
                record("experience", 1),
                record("skills", 0),
            ],
            key_improvements: vec![],
            warnings: vec![],
        };
        let counts = report.by_section();
        assert_eq!(counts.get("experience"), Some(&2));
        assert_eq!(counts.get("skills"), Some(&1));
    }

    #[test]
    fn test_flagged_reasons_are_prefixed_with_entry() {
        let report = VerificationReport {
            verdicts: vec![
                VerificationVerdict {
                    entry: EntryId::new("experience", 0),
                    status: VerificationStatus::Verified,
                    reasons: vec![],
                },
                VerificationVerdict {
                    entry: EntryId::new("experience", 1),
                    status: VerificationStatus::Flagged,
                    reasons: vec!["altered quantity: 5 changed to 12".to_string()],
                },
            ],
            passed: false,
        };
        assert_eq!(report.flagged_count(), 1);
        assert_eq!(
            report.flagged_reasons(),
            vec!["experience#1: altered quantity: 5 changed to 12".to_string()]
        );
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&PipelineStatus::Flagged).unwrap();
        assert_eq!(json, "\"FLAGGED\"");
    }
}
