use crate::error::{Error, Result};
use crate::services::status_machine::{OfferLetterPolicy, TransitionPolicy};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Retry settings for dispatched store writes.
#[derive(Debug, Clone, Copy)]
pub struct WriteRetry {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for WriteRetry {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub jwt_secret: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub hr_uids: Vec<String>,
    pub role_check_timeout: Duration,
    pub write_retry: WriteRetry,
    pub transition_policy: TransitionPolicy,
    pub offer_letter_policy: OfferLetterPolicy,
    pub log_format: LogFormat,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let store_backend = get_env_or("STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(Error::Config(
                "DATABASE_URL is required when STORE_BACKEND=postgres".to_string(),
            ));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            jwt_secret: get_env("JWT_SECRET")?,
            store_backend,
            database_url,
            hr_uids: env::var("HR_UIDS")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
            role_check_timeout: Duration::from_millis(get_env_or("ROLE_CHECK_TIMEOUT_MS", 3000)?),
            write_retry: WriteRetry {
                max_attempts: get_env_or("WRITE_MAX_ATTEMPTS", 3u32)?.max(1),
                base_delay: Duration::from_millis(get_env_or("WRITE_BACKOFF_MS", 200)?),
            },
            transition_policy: get_env_or("STATUS_TRANSITIONS", TransitionPolicy::Permissive)?,
            offer_letter_policy: get_env_or("OFFER_LETTER_ON_EXIT", OfferLetterPolicy::Retain)?,
            log_format: get_env_or("LOG_FORMAT", LogFormat::Text)?,
        })
    }

    /// In-memory configuration with default policies, used by tests and local tooling.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            server_address: "127.0.0.1:0".to_string(),
            jwt_secret: jwt_secret.into(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            hr_uids: Vec::new(),
            role_check_timeout: Duration::from_secs(3),
            write_retry: WriteRetry::default(),
            transition_policy: TransitionPolicy::Permissive,
            offer_letter_policy: OfferLetterPolicy::Retain,
            log_format: LogFormat::Text,
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn init_config() -> Result<&'static Config> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    get_config()
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hr_uid_list_ignores_blanks() {
        assert_eq!(parse_list(" a, ,b ,,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!("Memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("postgresql".parse::<StoreBackend>(), Ok(StoreBackend::Postgres));
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn in_memory_config_uses_observed_policies() {
        let config = Config::in_memory("secret");
        assert_eq!(config.transition_policy, TransitionPolicy::Permissive);
        assert_eq!(config.offer_letter_policy, OfferLetterPolicy::Retain);
        assert_eq!(config.write_retry.max_attempts, 3);
    }
}
