//! Process configuration
//!
//! Secrets and settings are read once at startup. A missing secret is fatal.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_WASENDER_BASE_URL: &str = "https://www.wasenderapi.com";
const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Runtime configuration for the intake service
#[derive(Clone)]
pub struct Config {
    /// Messaging provider (`WaSender`) API key
    pub api_key: String,
    pub database_url: String,
    pub gemini_key: String,
    pub gemini_model: String,
    pub wasender_base_url: String,
    /// Public base URL used to register the webhook with the provider
    pub public_url: Option<String>,
    pub port: u16,
    pub classifier_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let optional = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = required("API_KEY")?;
        let database_url = required("DATABASE_URL")?;
        let gemini_key = required("GEMINI_KEY")?;

        let port = match optional("WALLY_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "WALLY_PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match optional("CLASSIFIER_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "CLASSIFIER_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_CLASSIFIER_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            database_url,
            gemini_key,
            gemini_model: optional("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            wasender_base_url: optional("WASENDER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_WASENDER_BASE_URL.into()),
            public_url: optional("WALLY_PUBLIC_URL"),
            port,
            classifier_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Filesystem path (or `:memory:`) for the `SQLite` database
    pub fn database_path(&self) -> &str {
        self.database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))
            .unwrap_or(&self.database_url)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("database_url", &self.database_url)
            .field("gemini_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("wasender_base_url", &self.wasender_base_url)
            .field("public_url", &self.public_url)
            .field("port", &self.port)
            .field("classifier_timeout", &self.classifier_timeout)
            .finish()
    }
}
