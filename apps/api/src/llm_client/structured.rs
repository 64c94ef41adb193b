//! Structured output: deserialise a reply into a typed schema, validate it,
//! and give the model exactly one chance to repair a malformed reply.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::llm_client::prompts::SCHEMA_REPAIR_TEMPLATE;
use crate::llm_client::{ReasoningService, ServiceError};

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("valid trailing comma pattern"));

/// Post-deserialisation validation for a response schema.
///
/// Serde enforces shape; `check` enforces the rules serde cannot express
/// (ranges, non-empty fields, id formats).
pub trait SchemaCheck {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Calls the service and parses the reply as `T`.
///
/// On a parse or validation failure the model is re-prompted once with the
/// problem and its previous reply. A second failure is `MalformedResponse`.
pub async fn complete_structured<T>(
    service: &dyn ReasoningService,
    system: &str,
    prompt: &str,
) -> Result<T, ServiceError>
where
    T: DeserializeOwned + SchemaCheck,
{
    let reply = service.complete(system, prompt).await?;
    let problem = match parse_checked::<T>(&reply) {
        Ok(value) => return Ok(value),
        Err(problem) => problem,
    };

    warn!("Structured reply rejected ({problem}); sending schema repair request");

    let repair_prompt = SCHEMA_REPAIR_TEMPLATE
        .replace("{problem}", &problem)
        .replace("{previous_reply}", &reply)
        .replace("{original_prompt}", prompt);
    let repaired = service.complete(system, &repair_prompt).await?;

    parse_checked::<T>(&repaired).map_err(ServiceError::MalformedResponse)
}

/// Parses and validates a raw reply. The error string is fed back to the model.
pub fn parse_checked<T>(reply: &str) -> Result<T, String>
where
    T: DeserializeOwned + SchemaCheck,
{
    let candidate = extract_json(reply).ok_or_else(|| "reply contains no JSON value".to_string())?;
    let value: T = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(first) => {
            let fixed = TRAILING_COMMA.replace_all(candidate, "$1");
            serde_json::from_str(&fixed).map_err(|_| format!("invalid JSON for schema: {first}"))?
        }
    };
    value.check()?;
    Ok(value)
}

/// Narrows a reply to the outermost JSON object or array it contains.
fn extract_json(reply: &str) -> Option<&str> {
    let text = strip_json_fences(reply);
    let start = text.find(['{', '['])?;
    let closing = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closing)?;
    (end > start).then(|| &text[start..=end])
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedService;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Scored {
        score: f32,
    }

    impl SchemaCheck for Scored {
        fn check(&self) -> Result<(), String> {
            if (0.0..=1.0).contains(&self.score) {
                Ok(())
            } else {
                Err(format!("score {} outside [0, 1]", self.score))
            }
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_json_skips_leading_prose() {
        let reply = "Sure! Here it is:\n{\"score\": 0.5}\nHope that helps.";
        assert_eq!(extract_json(reply), Some("{\"score\": 0.5}"));
    }

    #[test]
    fn test_parse_checked_tolerates_trailing_comma() {
        let scored: Scored = parse_checked("{\"score\": 0.25,}").unwrap();
        assert!((scored.score - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_checked_runs_schema_check() {
        let err = parse_checked::<Scored>("{\"score\": 3.0}").unwrap_err();
        assert!(err.contains("outside"));
    }

    #[tokio::test]
    async fn test_complete_structured_repairs_once() {
        let service = ScriptedService::new()
            .reply("sys", "not json at all")
            .reply("sys", "{\"score\": 0.9}");
        let scored: Scored = complete_structured(&service, "sys", "prompt").await.unwrap();
        assert!((scored.score - 0.9).abs() < f32::EPSILON);
        assert_eq!(service.calls_for("sys"), 2);
        assert!(service.prompts_for("sys")[1].contains("not json at all"));
    }

    #[tokio::test]
    async fn test_complete_structured_gives_up_after_repair() {
        let service = ScriptedService::new()
            .reply("sys", "{\"score\": 7}")
            .reply("sys", "{\"score\": 8}");
        let err = complete_structured::<Scored>(&service, "sys", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MalformedResponse(_)));
        assert_eq!(service.calls_for("sys"), 2);
    }
}
