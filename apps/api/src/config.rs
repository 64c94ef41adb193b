use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::LlmSettings;
use crate::pipeline::PipelineConfig;

const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub max_resume_bytes: usize,
    pub llm: LlmSettings,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = PipelineConfig::default();
        let stage_timeout = Duration::from_secs(env_or(
            "STAGE_TIMEOUT_SECS",
            defaults.stage_timeout.as_secs(),
        )?);

        let pipeline = PipelineConfig {
            max_verification_retries: env_or(
                "MAX_VERIFICATION_RETRIES",
                defaults.max_verification_retries,
            )?,
            stage_timeout,
            stage_max_attempts: env_or("STAGE_MAX_ATTEMPTS", defaults.stage_max_attempts)?,
            backoff_base: Duration::from_millis(env_or(
                "STAGE_BACKOFF_MS",
                defaults.backoff_base.as_millis() as u64,
            )?),
            min_posting_chars: env_or("MIN_POSTING_CHARS", defaults.min_posting_chars)?,
            max_posting_chars: env_or("MAX_POSTING_CHARS", defaults.max_posting_chars)?,
        };
        if pipeline.min_posting_chars > pipeline.max_posting_chars {
            anyhow::bail!("MIN_POSTING_CHARS must not exceed MAX_POSTING_CHARS");
        }

        let llm = LlmSettings {
            model: std::env::var("CLAUDE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            temperature: env_or("LLM_TEMPERATURE", 0.0)?,
            max_tokens: env_or("LLM_MAX_TOKENS", 8192)?,
            // The stage timeout is the binding deadline; the HTTP one only catches hangs.
            request_timeout: stage_timeout + Duration::from_secs(5),
        };

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_resume_bytes: env_or("MAX_RESUME_BYTES", DEFAULT_MAX_RESUME_BYTES)?,
            llm,
            pipeline,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{value}'")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_blank_value_uses_default() {
        assert_eq!(parse_or("PORT", None, 8080u16).unwrap(), 8080);
        assert_eq!(parse_or("PORT", Some("  ".to_string()), 8080u16).unwrap(), 8080);
    }

    #[test]
    fn test_value_is_parsed() {
        assert_eq!(parse_or("MAX_VERIFICATION_RETRIES", Some("4".to_string()), 2u32).unwrap(), 4);
        assert_eq!(parse_or("LLM_TEMPERATURE", Some("0.2".to_string()), 0.0f32).unwrap(), 0.2);
    }

    #[test]
    fn test_invalid_value_names_the_variable() {
        let err = parse_or("PORT", Some("eighty".to_string()), 8080u16).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
