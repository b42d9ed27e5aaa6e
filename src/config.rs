//! Configuration management for Jarvis.
//!
//! Configuration can be set via environment variables:
//! - `GEMINI_API_KEY` - Required. Your Gemini API key.
//! - `JARVIS_MODEL` - Optional. The model to use. Defaults to `gemini-flash-latest`.
//! - `JARVIS_SYSTEM_INSTRUCTION` - Optional. Replaces the built-in assistant persona.
//! - `JARVIS_COMMAND_TIMEOUT` - Optional. Shell command timeout in seconds. Defaults to `10`.
//! - `GEMINI_API_BASE` - Optional. Service base URL. Defaults to the public Gemini endpoint.
//!
//! [`Config::load`] also reads a `.env` file from the working directory or
//! one of its parents. Variables already set in the process take precedence
//! over the file.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::agent::DEFAULT_SYSTEM_INSTRUCTION;

pub const DEFAULT_MODEL: &str = "gemini-flash-latest";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} env var is not set")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key
    pub api_key: String,

    /// Model identifier sent with every request
    pub model: String,

    /// System instruction (persona + operating constraints)
    pub system_instruction: String,

    /// Wall-clock limit for synchronous shell commands
    pub command_timeout: Duration,

    /// Base URL of the generateContent service
    pub api_base: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `GEMINI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from the environment, falling back to `.env`.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match dotenvy::dotenv_iter() {
            Ok(iter) => collect_env_file(iter),
            Err(e) => {
                tracing::debug!(error = %e, "No .env file loaded");
                HashMap::new()
            }
        };
        Self::layered(|key| std::env::var(key).ok(), &file)
    }

    /// `env` first, then `file`. Blank values count as unset.
    fn layered<F>(env: F, file: &HashMap<String, String>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| {
            env(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file.get(key).cloned())
        })
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model = lookup("JARVIS_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let system_instruction = lookup("JARVIS_SYSTEM_INSTRUCTION")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string());

        let timeout_secs = lookup("JARVIS_COMMAND_TIMEOUT")
            .map(|v| parse_timeout(&v))
            .transpose()?
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS);

        let api_base = lookup("GEMINI_API_BASE")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self {
            api_key,
            model,
            system_instruction,
            command_timeout: Duration::from_secs(timeout_secs),
            api_base,
        })
    }

    /// Create a config with default values (useful for testing).
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Variables from an env file, stopping at the first malformed line.
fn collect_env_file<I>(iter: I) -> HashMap<String, String>
where
    I: Iterator<Item = Result<(String, String), dotenvy::Error>>,
{
    let mut values = HashMap::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                values.insert(key, value);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stopped reading env file");
                break;
            }
        }
    }
    values
}

fn parse_timeout(value: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue("JARVIS_COMMAND_TIMEOUT".to_string(), reason);
    let secs = value
        .trim()
        .parse::<u64>()
        .map_err(|e| invalid(format!("{}", e)))?;
    if secs == 0 {
        return Err(invalid("must be at least 1 second".to_string()));
    }
    Ok(secs)
}
