// Shared prompt constants and prompt-building utilities.
// Each stage keeps its own prompts in tailoring/prompts.rs.
// This file contains cross-cutting prompt fragments.

/// Common instruction for every stage that rewrites resume text.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Every entry you return must carry the exact `entry_id` it was given. \
    Do NOT add entries, merge entries, or split entries. \
    Do NOT add, remove, or change dates, employers, job titles, numbers, percentages, \
    currency amounts, team sizes, or durations. \
    If a fact is not in the source entry, it must not be in your output.";

/// Instruction to avoid contribution inflation.
pub const SCOPE_INSTRUCTION: &str = "\
    CRITICAL: Keep the candidate's level of ownership exactly as written. \
    'Contributed to' must never become 'Led', 'Owned', 'Architected' or 'Spearheaded'. \
    'Helped' must never become 'Drove'. Do NOT add 'sole', 'first', 'only', 'all' \
    or superlatives that the source does not state.";

/// Sent once when a structured reply fails to parse or validate.
/// Replace: {problem}, {previous_reply}, {original_prompt}
pub const SCHEMA_REPAIR_TEMPLATE: &str = r#"Your previous reply could not be accepted.

PROBLEM:
{problem}

YOUR PREVIOUS REPLY:
{previous_reply}

Answer the original request again. Follow the JSON schema exactly.
Return ONLY the JSON value. No prose, no code fences.

ORIGINAL REQUEST:
{original_prompt}"#;
