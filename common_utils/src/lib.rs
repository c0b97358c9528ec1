// common_utils/src/lib.rs

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Which graph shape the orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantVariant {
    /// classify -> coding/general instruction set -> answer
    Routed,
    /// tool-calling agent with the built-in tools
    Tools,
}

impl FromStr for AssistantVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "routed" | "simple" | "classify" => Ok(AssistantVariant::Routed),
            "tools" | "tool" | "agent" => Ok(AssistantVariant::Tools),
            other => Err(format!("unknown assistant variant: {}", other)),
        }
    }
}

/// How the classifier reads the model's yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierPolicy {
    /// exact, case-sensitive match against `true`, `yes`, `1`
    Strict,
    /// trimmed, lower-cased, trailing punctuation removed
    Lenient,
}

impl FromStr for ClassifierPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(ClassifierPolicy::Strict),
            "lenient" => Ok(ClassifierPolicy::Lenient),
            other => Err(format!("unknown classifier policy: {}", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("could not determine a home directory for the default database path")]
    NoHomeDir,
}

/// Process-wide configuration. Built once at start-up, read-only afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub chat_model: String,
    pub classifier_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_tool_rounds: usize,
    pub llm_timeout: Duration,
    pub tool_timeout: Duration,
    pub variant: AssistantVariant,
    pub classifier_policy: ClassifierPolicy,
    pub weather_default_city: String,
    pub search_top_k: usize,
    pub database_path: PathBuf,
    pub bind_addr: String,
}

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup` instead.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let chat_model = get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let database_path = match get("CHAT_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => dirs::home_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join(".codeburrito")
                .join("conversations.db"),
        };

        let config = Self {
            llm_base_url: get("LLM_BASE_URL")
                .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string()),
            llm_api_key: get("GROQ_API_KEY").or_else(|| get("LLM_API_KEY")),
            classifier_model: get("CLASSIFIER_MODEL").unwrap_or_else(|| chat_model.clone()),
            chat_model,
            temperature: parse_or(&get, "LLM_TEMPERATURE", 0.7)?,
            max_tokens: parse_or(&get, "LLM_MAX_TOKENS", 2048)?,
            max_tool_rounds: parse_or(&get, "MAX_TOOL_ROUNDS", 10)?,
            llm_timeout: Duration::from_secs(parse_or(&get, "LLM_TIMEOUT_SECS", 60)?),
            tool_timeout: Duration::from_secs(parse_or(&get, "TOOL_TIMEOUT_SECS", 20)?),
            variant: parse_or(&get, "ASSISTANT_VARIANT", AssistantVariant::Tools)?,
            classifier_policy: parse_or(&get, "CLASSIFIER_POLICY", ClassifierPolicy::Strict)?,
            weather_default_city: get("WEATHER_DEFAULT_CITY").unwrap_or_else(|| "Delhi".to_string()),
            search_top_k: parse_or(&get, "SEARCH_TOP_K", 5)?,
            database_path,
            bind_addr: get("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8383".to_string()),
        };

        info!(
            "[Config] variant={:?} model={} max_tool_rounds={}",
            config.variant, config.chat_model, config.max_tool_rounds
        );
        Ok(config)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
