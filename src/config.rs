//! Process configuration read from the environment at start-up

use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::protocol::{DEFAULT_THEME, DEFAULT_USERNAME};
use crate::sanitize::{LinkPolicy, SanitizeConfig, DEFAULT_CANONICAL_URL};
use crate::runtime::DEFAULT_IDLE_TIMEOUT;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DUDESK_PORT must be a port number, got {0:?}")]
    InvalidPort(String),
    #[error("DUDESK_LINK_POLICY must be pass-through or canonicalized, got {0:?}")]
    InvalidLinkPolicy(String),
    #[error("DUDESK_SESSION_IDLE_SECS must be a positive number of seconds, got {0:?}")]
    InvalidIdleTimeout(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Without a key the built-in chat endpoint is disabled
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Directory holding the reference CSV datasets
    pub data_dir: PathBuf,
    pub sanitize: SanitizeConfig,
    /// Send session replies to this URL instead of the built-in endpoint
    pub chat_endpoint: Option<String>,
    pub theme: String,
    pub username: String,
    /// Sessions without events for this long are dropped
    pub session_idle_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("DUDESK_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let link_policy = match get("DUDESK_LINK_POLICY") {
            Some(raw) => raw
                .parse::<LinkPolicy>()
                .map_err(|_| ConfigError::InvalidLinkPolicy(raw))?,
            None => LinkPolicy::default(),
        };
        let session_idle_timeout = match get("DUDESK_SESSION_IDLE_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidIdleTimeout(raw)),
            },
            None => DEFAULT_IDLE_TIMEOUT,
        };

        let canonical_url =
            get("DUDESK_CANONICAL_URL").unwrap_or_else(|| DEFAULT_CANONICAL_URL.to_string());

        Ok(Self {
            port,
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            data_dir: get("DUDESK_DATA_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from),
            sanitize: SanitizeConfig {
                link_policy,
                canonical_url,
            },
            chat_endpoint: get("DUDESK_CHAT_ENDPOINT"),
            theme: get("DUDESK_THEME").unwrap_or_else(|| DEFAULT_THEME.to_string()),
            username: get("DUDESK_USERNAME").unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            session_idle_timeout,
        })
    }
}
