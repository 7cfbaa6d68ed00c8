use std::{net::IpAddr, str::FromStr, time::Duration};

use assistant::{LLMConfig, ProviderType};
use thiserror::Error;
use utils::assets::database_path;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub session_ttl_days: i64,
    pub llm: LLMConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = parse_or(get("HOST"), "HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_or(get("BACKEND_PORT").or_else(|| get("PORT")), "PORT", 8000)?;
        let database_url = get("DATABASE_URL")
            .unwrap_or_else(|| format!("sqlite://{}", database_path().to_string_lossy()));
        let session_ttl_days = parse_or(get("SESSION_TTL_DAYS"), "SESSION_TTL_DAYS", 30)?;

        let provider = match get("LLM_PROVIDER") {
            Some(raw) => ProviderType::from_str(&raw).map_err(|_| ConfigError::Invalid {
                key: "LLM_PROVIDER",
                value: raw,
            })?,
            None => ProviderType::OpenAI,
        };

        let defaults = LLMConfig::default();
        let llm = LLMConfig {
            provider,
            model: get("ASSISTANT_MODEL"),
            temperature: parse_or(
                get("ASSISTANT_TEMPERATURE"),
                "ASSISTANT_TEMPERATURE",
                defaults.temperature,
            )?,
            chat_timeout: Duration::from_secs(parse_or(
                get("CHAT_TIMEOUT_SECS"),
                "CHAT_TIMEOUT_SECS",
                defaults.chat_timeout.as_secs(),
            )?),
            analyzer_timeout: Duration::from_secs(parse_or(
                get("ANALYZER_TIMEOUT_SECS"),
                "ANALYZER_TIMEOUT_SECS",
                defaults.analyzer_timeout.as_secs(),
            )?),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
        };

        Ok(AppConfig {
            host,
            port,
            database_url,
            session_ttl_days,
            llm,
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_ttl_days)
    }
}

fn parse_or<T: FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
