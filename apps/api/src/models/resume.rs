use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of an entry: the section key and its position in the
/// *original* document. Tailoring may reorder entries but never reassigns ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId {
    pub section: String,
    pub index: usize,
}

impl EntryId {
    pub fn new(section: impl Into<String>, index: usize) -> Self {
        Self {
            section: section.into(),
            index,
        }
    }

    /// Parses the `section#index` form used in prompts.
    pub fn parse(value: &str) -> Option<Self> {
        let (section, index) = value.rsplit_once('#')?;
        if section.is_empty() {
            return None;
        }
        Some(Self::new(section, index.parse().ok()?))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.section, self.index)
    }
}

/// One item of a resume section: a job, a degree, a project, a skills line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    /// Raw text of the entry as it appeared in the resume (heading line or whole item).
    pub text: String,
    pub role: Option<String>,
    pub organization: Option<String>,
    pub dates: Option<String>,
    pub bullets: Vec<String>,
}

impl Entry {
    /// All free text and structured fields joined by newlines.
    pub fn full_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(4 + self.bullets.len());
        if !self.text.is_empty() {
            parts.push(&self.text);
        }
        for field in [&self.role, &self.organization, &self.dates] {
            if let Some(value) = field.as_deref() {
                parts.push(value);
            }
        }
        parts.extend(self.bullets.iter().map(String::as_str));
        parts.join("\n")
    }

    /// Human-readable rendering used in change records.
    pub fn render(&self) -> String {
        let mut out = self.text.clone();
        for bullet in &self.bullets {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("- ");
            out.push_str(bullet);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Lowercase section key, e.g. "experience", "education", "skills".
    pub name: String,
    pub entries: Vec<Entry>,
}

/// A structured resume. Two exist per run: the immutable `original` and the
/// `tailored` candidate, which is rebuilt wholesale on every tailoring attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeDocument {
    pub sections: Vec<Section>,
}

impl ResumeDocument {
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.sections.iter().flat_map(|s| s.entries.iter())
    }

    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }

    pub fn find(&self, id: &EntryId) -> Option<&Entry> {
        self.sections
            .iter()
            .filter(|s| s.name == id.section)
            .flat_map(|s| s.entries.iter())
            .find(|e| &e.id == id)
    }

    /// Section names and the full text of every entry, for coverage checks.
    pub fn searchable_text(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&section.name);
            out.push('\n');
            for entry in &section.entries {
                out.push_str(&entry.full_text());
                out.push('\n');
            }
        }
        out
    }
}
