// LLM prompt constants for the tailoring stages.
// Cross-cutting fragments (grounding, scope, schema repair) live in llm_client::prompts.
// The system prompts double as stage identifiers in the scripted test service.

/// System prompt for requirement extraction.
pub const EXTRACT_SYSTEM: &str = "You are an expert job posting analyst. \
    Extract the concrete, checkable requirements a posting asks of a candidate. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Requirement extraction prompt. Replace `{posting_text}` before sending.
pub const EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract the requirements from the job posting below.

Return a JSON object with this EXACT schema (no extra fields):
{
  "title": "Senior Backend Engineer",
  "company": "Acme Corp",
  "skills": [
    {"name": "Python", "required": true, "weight": 1.0},
    {"name": "Kubernetes", "required": false, "weight": 0.5}
  ],
  "qualifications": ["5+ years of backend experience", "BS in Computer Science"],
  "keywords": ["microservices", "observability"],
  "experience_years": 5
}

Rules:
- "skills": languages, frameworks, platforms and tools, one per item, in the order the posting names them.
  Use the posting's own spelling. Do NOT merge two tools into one item.
- "required": true for must-haves ("required", "must have", "you will need"), false for
  nice-to-haves ("preferred", "bonus", "a plus").
- "weight": priority in [0, 1]. Required skills 0.8-1.0, preferred 0.3-0.6.
- "qualifications": degrees, certifications, years of experience, domain experience.
- "keywords": other recurring terms a recruiter would scan for. No duplicates of skills.
- "experience_years": the minimum years of experience asked for, or null.
- "title" and "company": null when the posting does not state them.

JOB POSTING:
{posting_text}"#;

/// System prompt for resume structuring.
pub const STRUCTURE_SYSTEM: &str = "You are a meticulous resume parser. \
    You convert a resume into structured sections without changing a single fact. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT summarise, shorten, or correct the candidate's wording.";

/// Resume structuring prompt. Replace `{resume_text}` before sending.
pub const STRUCTURE_PROMPT_TEMPLATE: &str = r#"Split the resume below into sections and entries.

Return a JSON object with this EXACT schema:
{
  "sections": [
    {
      "name": "experience",
      "entries": [
        {
          "text": "Senior Engineer, Globex Corporation, Jan 2020 - Present",
          "role": "Senior Engineer",
          "organization": "Globex Corporation",
          "dates": "Jan 2020 - Present",
          "bullets": ["Cut p99 latency 40% by introducing Redis caching"]
        }
      ]
    }
  ]
}

Rules:
- Section "name" is a lowercase key: contact, summary, experience, education, skills,
  projects, certifications, publications, or another short key if none fits.
- One entry per job, degree, project or skills line. "text" is the entry's heading line
  (or the whole item when it has no bullets), copied verbatim.
- "role", "organization" and "dates" are copied verbatim from the entry, or null.
- "bullets" are copied verbatim, one string per bullet, without the bullet marker.
- Every number, date, company, product and proper noun in the resume MUST appear in
  exactly the same form in some entry. Do NOT drop content you cannot classify; put it
  in an "other" section instead.

RESUME:
{resume_text}"#;

/// Sent once when the structured resume dropped factual tokens.
/// Replace: {missing}, {resume_text}
pub const STRUCTURE_REPAIR_TEMPLATE: &str = r#"Your structured resume dropped facts from the original.

These tokens appear in the resume but in none of your entries:
{missing}

Structure the resume again using the same JSON schema, and make sure every one of these
tokens appears verbatim in the entry it belongs to.

RESUME:
{resume_text}"#;

/// System prompt for content tailoring.
pub const TAILOR_SYSTEM: &str = "You are an expert resume editor. \
    You rephrase existing resume bullets so that the candidate's relevant experience \
    is easy to find for a specific role. You never add facts. \
    You MUST respond with valid JSON only, a JSON array of entry objects. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences.";

/// Content tailoring prompt.
/// Replace: {grounding_instruction}, {scope_instruction}, {priorities},
///          {entries_json}, {constraints}
pub const TAILOR_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

{scope_instruction}

ROLE PRIORITIES (emphasise evidence for these, most important first):
{priorities}

RESUME ENTRIES (source of truth; bullets are already in the order they will appear):
{entries_json}

{constraints}

Rephrase the bullets of each entry to foreground the role priorities where the entry
already supports them. Return a JSON ARRAY:
[
  {
    "entry_id": "experience#0",
    "text": null,
    "bullets": ["Rephrased first bullet", "Rephrased second bullet"],
    "rationale": "Foregrounds Python pipeline work for the data platform role"
  }
]

HARD RULES:
1. "entry_id" MUST be copied exactly from the entries above. Each id at most once.
2. "bullets" MUST have exactly as many items as the entry has, in the same order.
3. "text" is null unless the entry has no bullets, in which case it is the rephrased text.
4. Omit entries you would not change.
5. Never introduce a number, date, employer, title, tool or product the entry does not state."#;

/// Appended to the tailoring prompt when a previous candidate failed verification.
/// Replace: {reasons}
pub const TAILOR_REJECTION_TEMPLATE: &str = r#"A PREVIOUS ATTEMPT WAS REJECTED BY FACT VERIFICATION for these reasons.
Each one is a hard constraint for this attempt:
{reasons}"#;

/// Appended when the reply failed the traceability self-check.
/// Replace: {problem}
pub const TAILOR_SELF_CHECK_TEMPLATE: &str = r#"YOUR PREVIOUS REPLY BROKE THE HARD RULES:
{problem}
Answer again and follow every hard rule."#;
