//! Classifier configuration.
//!
//! A [`ClassifierConfig`] is a plain value handed to every pipeline call.
//! Changing a setting produces a new value via
//! [`ClassifierConfig::with_setting`]; nothing is mutated in place.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/v1";
pub const DEFAULT_MODEL: &str = "aifeifei798/DarkIdol-Llama-3.1-8B-Instruct-1.2-Uncensored";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MIN_WORDS: usize = 50;
/// Forum post separators (`---- 1234 ----`) and escaped quote markers.
pub const DEFAULT_SKIP_PREFIXES: [&str; 2] = ["---", "&gt;&gt;"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown setting: {0}")]
    UnknownSetting(String),
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Connection settings for the chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL including the API version prefix, e.g. `http://host:8000/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub min_words: usize,
    /// Lines starting with any of these never enter a window.
    pub skip_prefixes: Vec<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
            skip_prefixes: DEFAULT_SKIP_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Which reply format the model is asked for and parsed as.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    #[default]
    Marker,
    Json,
}

impl ParserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Json => "json",
        }
    }
}

/// Where source documents live and where result sets are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLayout {
    pub data_root: PathBuf,
    /// Defaults to `<data_root>/processed`.
    pub processed_dir: Option<PathBuf>,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            processed_dir: None,
        }
    }
}

impl StoreLayout {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            processed_dir: None,
        }
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.processed_dir
            .clone()
            .unwrap_or_else(|| self.data_root.join("processed"))
    }

    /// Uploaded raw documents land here.
    pub fn raw_dir(&self) -> PathBuf {
        self.data_root.join("raw")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model: ModelConfig,
    pub window: WindowConfig,
    pub parser: ParserKind,
    /// Reject threat levels outside the six known labels.
    pub strict_labels: bool,
    pub layout: StoreLayout,
    /// Webhook that finished results are pushed to when a job asks for it.
    pub webhook_url: Option<String>,
}

impl ClassifierConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.min_words == 0 {
            return Err(invalid("min_words", "must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(invalid("temperature", "must be within 0.0..=2.0"));
        }
        if self.model.base_url.trim().is_empty() {
            return Err(invalid("base_url", "must not be empty"));
        }
        Ok(())
    }

    /// Return a copy with one named setting changed.
    ///
    /// An empty `value` clears optional settings (`api_key`, `webhook_url`,
    /// `processed_dir`).
    pub fn with_setting(&self, name: &str, value: &str) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());

        match name {
            "base_url" => next.model.base_url = value.trim_end_matches('/').to_string(),
            "api_key" => next.model.api_key = optional(value),
            "model" | "llm_model" => next.model.model = value.to_string(),
            "temperature" => next.model.temperature = parse_value(name, value)?,
            "timeout_secs" => next.model.timeout_secs = parse_value(name, value)?,
            "min_words" => next.window.min_words = parse_value(name, value)?,
            "skip_prefixes" => {
                next.window.skip_prefixes = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "parser" => {
                next.parser = match value {
                    "marker" => ParserKind::Marker,
                    "json" => ParserKind::Json,
                    other => return Err(invalid(name, &format!("expected marker or json, got {other}"))),
                }
            }
            "strict_labels" => next.strict_labels = parse_value(name, value)?,
            "data_root" => next.layout.data_root = PathBuf::from(value),
            "processed_dir" => next.layout.processed_dir = optional(value).map(PathBuf::from),
            "webhook_url" => next.webhook_url = optional(value),
            other => return Err(ConfigError::UnknownSetting(other.to_string())),
        }

        next.validate()?;
        Ok(next)
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| invalid(name, &e.to_string()))
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
