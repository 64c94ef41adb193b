use std::fmt;

use serde::{Deserialize, Serialize};

/// Default weight for a skill the posting marks as required.
pub const REQUIRED_WEIGHT: f32 = 1.0;
/// Default weight for a nice-to-have skill.
pub const PREFERRED_WEIGHT: f32 = 0.5;
/// Qualifications are weighted like preferred skills unless the posting says otherwise.
pub const QUALIFICATION_WEIGHT: f32 = 0.75;
/// Keywords only nudge ordering.
pub const KEYWORD_WEIGHT: f32 = 0.25;

/// A skill named by the job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredSkill {
    pub name: String,
    /// Priority in [0, 1]. Higher-weight skills promote matching entries further.
    pub weight: f32,
    pub required: bool,
}

/// Structured requirements extracted from a single job posting.
///
/// Produced once per run by the requirement extractor and never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequirements {
    pub title: Option<String>,
    pub company: Option<String>,
    pub skills: Vec<RequiredSkill>,
    pub qualifications: Vec<String>,
    pub keywords: Vec<String>,
    pub experience_years: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Skill,
    Qualification,
    Keyword,
}

/// Stable reference into a `JobRequirements` value: which list, which position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequirementRef {
    pub kind: RequirementKind,
    pub index: usize,
    pub text: String,
}

impl fmt::Display for RequirementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A flattened view of one requirement, used by the matcher and the tailor.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub reference: RequirementRef,
    pub weight: f32,
}

impl JobRequirements {
    /// Iterates skills, then qualifications, then keywords, in posting order.
    pub fn requirements(&self) -> impl Iterator<Item = Requirement> + '_ {
        let skills = self.skills.iter().enumerate().map(|(index, s)| Requirement {
            reference: RequirementRef {
                kind: RequirementKind::Skill,
                index,
                text: s.name.clone(),
            },
            weight: s.weight,
        });
        let qualifications = self
            .qualifications
            .iter()
            .enumerate()
            .map(|(index, q)| Requirement {
                reference: RequirementRef {
                    kind: RequirementKind::Qualification,
                    index,
                    text: q.clone(),
                },
                weight: QUALIFICATION_WEIGHT,
            });
        let keywords = self.keywords.iter().enumerate().map(|(index, k)| Requirement {
            reference: RequirementRef {
                kind: RequirementKind::Keyword,
                index,
                text: k.clone(),
            },
            weight: KEYWORD_WEIGHT,
        });
        skills.chain(qualifications).chain(keywords)
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.qualifications.is_empty() && self.keywords.is_empty()
    }

    /// True when `reference` points at an existing item with the same text.
    pub fn contains(&self, reference: &RequirementRef) -> bool {
        let text = match reference.kind {
            RequirementKind::Skill => self.skills.get(reference.index).map(|s| s.name.as_str()),
            RequirementKind::Qualification => {
                self.qualifications.get(reference.index).map(String::as_str)
            }
            RequirementKind::Keyword => self.keywords.get(reference.index).map(String::as_str),
        };
        text == Some(reference.text.as_str())
    }

    /// Weight of the referenced requirement, 0.0 when it does not exist.
    pub fn weight_of(&self, reference: &RequirementRef) -> f32 {
        if !self.contains(reference) {
            return 0.0;
        }
        match reference.kind {
            RequirementKind::Skill => self.skills[reference.index].weight,
            RequirementKind::Qualification => QUALIFICATION_WEIGHT,
            RequirementKind::Keyword => KEYWORD_WEIGHT,
        }
    }
}
