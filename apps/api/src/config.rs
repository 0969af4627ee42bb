use anyhow::{Context, Result};

const DEFAULT_LLM_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-5";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional: review persistence routes answer 503 without it.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub llm_api_url: String,
    pub llm_model: String,
    pub llm_max_tokens: u32,
    pub llm_timeout_secs: u64,
    /// When every input category is absent, skip the completion call and
    /// answer with the no-data fallback.
    pub skip_synthesis_when_empty: bool,
    pub max_upload_bytes: usize,
    /// Reported by `/health`. Defaults to the crate version at build time.
    pub service_version: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_api_url: optional_env("LLM_API_URL")
                .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_max_tokens: parse_env("LLM_MAX_TOKENS", 4096)?,
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            skip_synthesis_when_empty: parse_env("SYNTHESIS_SKIP_WHEN_EMPTY", true)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
            service_version: optional_env("SERVICE_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Configuration used by handler tests: no database, synthesis skipped on empty input.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            database_url: None,
            anthropic_api_key: "test-key".to_string(),
            llm_api_url: DEFAULT_LLM_API_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_max_tokens: 1024,
            llm_timeout_secs: 5,
            skip_synthesis_when_empty: true,
            max_upload_bytes: 1024 * 1024,
            service_version: "test".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
