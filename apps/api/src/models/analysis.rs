use serde::{Deserialize, Serialize};

use crate::models::requirements::{JobRequirements, RequirementRef};
use crate::models::resume::EntryId;

/// A requirement with direct evidence in the resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSkill {
    pub requirement: RequirementRef,
    pub evidence: EntryId,
    /// Evidence density of the chosen entry, 0.0 – 1.0.
    pub strength: f32,
}

/// A requirement with no evidence at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapSkill {
    pub requirement: RequirementRef,
}

/// A requirement not directly evidenced but inferable from related content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferableSkill {
    pub requirement: RequirementRef,
    pub inferred_from: EntryId,
    pub confidence: f32, // clamped to [0, 1]
    pub basis: String,
}

/// Output of the skill matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub matched: Vec<MatchedSkill>,
    pub gaps: Vec<GapSkill>,
    pub transferable: Vec<TransferableSkill>,
    pub match_score: u32, // 0 – 100
    pub summary: String,
}

impl MatchReport {
    /// Every requirement reference the report cites.
    pub fn references(&self) -> impl Iterator<Item = &RequirementRef> {
        self.matched
            .iter()
            .map(|m| &m.requirement)
            .chain(self.gaps.iter().map(|g| &g.requirement))
            .chain(self.transferable.iter().map(|t| &t.requirement))
    }

    /// Returns the first reference that does not exist in `requirements`.
    pub fn dangling_reference<'a>(
        &'a self,
        requirements: &JobRequirements,
    ) -> Option<&'a RequirementRef> {
        self.references().find(|r| !requirements.contains(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requirements::{RequirementKind, RequiredSkill};

    #[test]
    fn test_dangling_reference_detected() {
        let requirements = JobRequirements {
            title: None,
            company: None,
            skills: vec![RequiredSkill {
                name: "Rust".to_string(),
                weight: 1.0,
                required: true,
            }],
            qualifications: vec![],
            keywords: vec![],
            experience_years: None,
        };
        let report = MatchReport {
            matched: vec![],
            gaps: vec![GapSkill {
                requirement: RequirementRef {
                    kind: RequirementKind::Skill,
                    index: 0,
                    text: "Go".to_string(),
                },
            }],
            transferable: vec![],
            match_score: 0,
            summary: String::new(),
        };
        assert_eq!(
            report.dangling_reference(&requirements).map(|r| r.text.as_str()),
            Some("Go")
        );
    }
}
