//! Layered configuration: defaults, home file, local file, environment, CLI.
//!
//! Each source is parsed into a [`ConfigLayer`] whose fields are all optional.
//! [`resolve`] overlays the layers per field and validates the result into an
//! immutable [`EffectiveConfig`] that is passed by reference through the run.

pub mod file;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::llm::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_LANGUAGE: &str = "english";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_REGENERATIONS: u32 = 3;
/// Maximum bytes of diff text sent to the model.
pub const DEFAULT_MAX_DIFF_BYTES: usize = 30_000;

const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;

/// Environment variable names read by [`ConfigLayer::from_env`].
pub mod env_vars {
    pub const API_KEY: &str = "OPENAI_API_KEY";
    pub const BASE_URL: &str = "OPENAI_BASE_URL";
    pub const MODEL: &str = "GCOMMIT_MODEL";
    pub const TEMPERATURE: &str = "GCOMMIT_TEMPERATURE";
    pub const MAX_TOKENS: &str = "GCOMMIT_MAX_TOKENS";
    pub const LANGUAGE: &str = "GCOMMIT_LANGUAGE";
    pub const FORMAT: &str = "GCOMMIT_FORMAT";
    pub const TIMEOUT: &str = "GCOMMIT_TIMEOUT";
    pub const CONFIG: &str = "GCOMMIT_CONFIG";
}

/// Output format of the generated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitFormat {
    Conventional,
    Simple,
    Custom,
}

impl CommitFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitFormat::Conventional => "conventional",
            CommitFormat::Simple => "simple",
            CommitFormat::Custom => "custom",
        }
    }
}

impl fmt::Display for CommitFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conventional" => Ok(Self::Conventional),
            "simple" => Ok(Self::Simple),
            "custom" => Ok(Self::Custom),
            _ => Err(ConfigError::InvalidValue {
                field: "format",
                value: s.to_string(),
            }),
        }
    }
}

/// API key wrapper whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for the Authorization header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// One configuration source. `None` means "not set by this source".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigLayer {
    pub api_key: Option<ApiKey>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub language: Option<String>,
    pub format: Option<String>,
    pub custom_template: Option<String>,
    pub auto_commit: Option<bool>,
    pub edit_before_commit: Option<bool>,
    pub max_regenerations: Option<u32>,
    pub max_diff_bytes: Option<usize>,
    pub hint: Option<String>,
}

impl ConfigLayer {
    /// Overlay `higher` on top of `self`; every field set in `higher` wins.
    pub fn overlay(self, higher: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            api_key: higher.api_key.or(self.api_key),
            base_url: higher.base_url.or(self.base_url),
            model: higher.model.or(self.model),
            temperature: higher.temperature.or(self.temperature),
            max_tokens: higher.max_tokens.or(self.max_tokens),
            timeout_secs: higher.timeout_secs.or(self.timeout_secs),
            max_retries: higher.max_retries.or(self.max_retries),
            language: higher.language.or(self.language),
            format: higher.format.or(self.format),
            custom_template: higher.custom_template.or(self.custom_template),
            auto_commit: higher.auto_commit.or(self.auto_commit),
            edit_before_commit: higher.edit_before_commit.or(self.edit_before_commit),
            max_regenerations: higher.max_regenerations.or(self.max_regenerations),
            max_diff_bytes: higher.max_diff_bytes.or(self.max_diff_bytes),
            hint: higher.hint.or(self.hint),
        }
    }

    /// Build the environment layer through a variable lookup.
    ///
    /// Empty values count as unset. Numbers that do not parse are reported
    /// as [`ConfigError::InvalidValue`].
    pub fn from_env<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(ConfigLayer {
            api_key: get(env_vars::API_KEY).map(ApiKey::new),
            base_url: get(env_vars::BASE_URL),
            model: get(env_vars::MODEL),
            temperature: parse_env(env_vars::TEMPERATURE, "temperature", get(env_vars::TEMPERATURE))?,
            max_tokens: parse_env(env_vars::MAX_TOKENS, "max_tokens", get(env_vars::MAX_TOKENS))?,
            timeout_secs: parse_env(env_vars::TIMEOUT, "timeout_secs", get(env_vars::TIMEOUT))?,
            language: get(env_vars::LANGUAGE),
            format: get(env_vars::FORMAT),
            ..ConfigLayer::default()
        })
    }

    /// Environment layer from the process environment.
    pub fn from_process_env() -> Result<Self, ConfigError> {
        Self::from_env(|name| std::env::var(name).ok())
    }
}

fn parse_env<T: FromStr>(
    var: &str,
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field,
                value: format!("{value} (from {var})"),
            }),
    }
}

/// The single merged configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_retries: u32,
    pub language: String,
    pub format: CommitFormat,
    /// Present iff `format` is [`CommitFormat::Custom`].
    pub custom_template: Option<String>,
    pub auto_commit: bool,
    pub edit_before_commit: bool,
    pub max_regenerations: u32,
    pub max_diff_bytes: usize,
    pub hint: Option<String>,
}

impl EffectiveConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }
}

/// Merge the four sources (lowest to highest: home, local, env, CLI) over
/// the built-in defaults and validate the result.
pub fn resolve(
    cli: ConfigLayer,
    env: ConfigLayer,
    local: Option<ConfigLayer>,
    home: Option<ConfigLayer>,
) -> Result<EffectiveConfig, ConfigError> {
    let merged = home
        .unwrap_or_default()
        .overlay(local.unwrap_or_default())
        .overlay(env)
        .overlay(cli);

    let api_key = merged
        .api_key
        .filter(|k| !k.is_blank())
        .ok_or(ConfigError::MissingField("api_key"))?;

    let format = match merged.format.as_deref() {
        Some(raw) => raw.parse::<CommitFormat>()?,
        None => CommitFormat::Conventional,
    };

    let custom_template = match format {
        CommitFormat::Custom => Some(
            merged
                .custom_template
                .filter(|t| !t.trim().is_empty())
                .ok_or(ConfigError::MissingField("custom_template"))?,
        ),
        _ => None,
    };

    let temperature = merged.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(ConfigError::InvalidValue {
            field: "temperature",
            value: temperature.to_string(),
        });
    }

    let max_tokens = positive(merged.max_tokens, DEFAULT_MAX_TOKENS, "max_tokens")?;
    let timeout_secs = positive(merged.timeout_secs, DEFAULT_TIMEOUT_SECS, "timeout_secs")?;
    let max_diff_bytes = positive(merged.max_diff_bytes, DEFAULT_MAX_DIFF_BYTES, "max_diff_bytes")?;

    let auto_commit = merged.auto_commit.unwrap_or(false);
    let edit_before_commit = merged.edit_before_commit.unwrap_or(false);
    if auto_commit && edit_before_commit {
        return Err(ConfigError::InvalidValue {
            field: "edit_before_commit",
            value: "true (cannot be combined with auto_commit)".to_string(),
        });
    }

    Ok(EffectiveConfig {
        api_key,
        base_url: merged
            .base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        model: merged.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        temperature,
        max_tokens,
        timeout: Duration::from_secs(timeout_secs),
        max_retries: merged.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        language: merged.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        format,
        custom_template,
        auto_commit,
        edit_before_commit,
        max_regenerations: merged.max_regenerations.unwrap_or(DEFAULT_MAX_REGENERATIONS),
        max_diff_bytes,
        hint: merged.hint.filter(|h| !h.trim().is_empty()),
    })
}

fn positive<T>(value: Option<T>, default: T, field: &'static str) -> Result<T, ConfigError>
where
    T: PartialOrd + Default + fmt::Display,
{
    let value = value.unwrap_or(default);
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}
