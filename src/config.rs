//! Runtime configuration.
//!
//! Values come from the environment (see [`OraculoConfig::from_env`]) and can
//! be overridden with builder setters before [`OraculoConfig::validate`].

use std::path::PathBuf;
use std::str::FromStr;

use crate::confidence::gate::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DISCLAIMER_THRESHOLD, MAX_CONFIDENCE_THRESHOLD,
    MIN_CONFIDENCE_THRESHOLD,
};
use crate::confidence::signals::DEFAULT_MAX_ANSWER_CHARS;
use crate::context::DEFAULT_MAX_HISTORY;
use crate::error::{Error, Result};
use crate::llm::{ClientConfig, GenerationSettings};

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_DATABASE_PATH: &str = "data/oraculo_concursos.db";
pub const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Process configuration.
#[derive(Clone, PartialEq)]
pub struct OraculoConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub database_path: PathBuf,
    pub confidence_threshold: f64,
    pub disclaimer_threshold: f64,
    pub max_history: usize,
    pub max_response_chars: usize,
    pub log_level: String,
}

impl std::fmt::Debug for OraculoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OraculoConfig")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("database_path", &self.database_path)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("disclaimer_threshold", &self.disclaimer_threshold)
            .field("max_history", &self.max_history)
            .field("max_response_chars", &self.max_response_chars)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for OraculoConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_base_url: None,
            temperature: 0.1,
            max_tokens: 2048,
            timeout_secs: 30,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            disclaimer_threshold: DEFAULT_DISCLAIMER_THRESHOLD,
            max_history: DEFAULT_MAX_HISTORY,
            max_response_chars: DEFAULT_MAX_ANSWER_CHARS,
            log_level: "info".to_string(),
        }
    }
}

impl OraculoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.gemini_api_key = get("GEMINI_API_KEY");
        if let Some(model) = get("GEMINI_MODEL") {
            config.gemini_model = model;
        }
        config.gemini_base_url = get("GEMINI_BASE_URL");
        if let Some(v) = get("GEMINI_TEMPERATURE") {
            config.temperature = parse_var("GEMINI_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("GEMINI_MAX_TOKENS") {
            config.max_tokens = parse_var("GEMINI_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("GEMINI_TIMEOUT") {
            config.timeout_secs = parse_var("GEMINI_TIMEOUT", &v)?;
        }
        if let Some(path) = get("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(v) = get("CONFIDENCE_THRESHOLD") {
            config.confidence_threshold = parse_var("CONFIDENCE_THRESHOLD", &v)?;
        } else if let Some(v) = get("CONFIANCA_MINIMA") {
            config.confidence_threshold = parse_var("CONFIANCA_MINIMA", &v)?;
        }
        if let Some(v) = get("DISCLAIMER_THRESHOLD") {
            config.disclaimer_threshold = parse_var("DISCLAIMER_THRESHOLD", &v)?;
        }
        if let Some(v) = get("MAX_HISTORY_ENTRIES") {
            config.max_history = parse_var("MAX_HISTORY_ENTRIES", &v)?;
        }
        if let Some(v) = get("MAX_RESPONSE_CHARS") {
            config.max_response_chars = parse_var("MAX_RESPONSE_CHARS", &v)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            config.log_level = level.to_lowercase();
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.gemini_api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.gemini_model = model.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Check ranges. `require_api_key` is set when a live client will be built.
    pub fn validate(&self, require_api_key: bool) -> Result<()> {
        if !(MIN_CONFIDENCE_THRESHOLD..=MAX_CONFIDENCE_THRESHOLD).contains(&self.confidence_threshold)
        {
            return Err(Error::config(format!(
                "confidence threshold {} outside [{}, {}]",
                self.confidence_threshold, MIN_CONFIDENCE_THRESHOLD, MAX_CONFIDENCE_THRESHOLD
            )));
        }
        if !(0.0..=1.0).contains(&self.disclaimer_threshold) {
            return Err(Error::config(format!(
                "disclaimer threshold {} outside [0, 1]",
                self.disclaimer_threshold
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::config(format!(
                "temperature {} outside [0, 2]",
                self.temperature
            )));
        }
        if !(1..=MAX_OUTPUT_TOKENS).contains(&self.max_tokens) {
            return Err(Error::config(format!(
                "max tokens {} outside [1, {}]",
                self.max_tokens, MAX_OUTPUT_TOKENS
            )));
        }
        if self.max_history == 0 {
            return Err(Error::config("MAX_HISTORY_ENTRIES must be at least 1"));
        }
        if require_api_key && self.gemini_api_key.is_none() {
            return Err(Error::config("GEMINI_API_KEY is not set"));
        }
        Ok(())
    }

    /// Client settings for the Gemini API.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.gemini_api_key.clone().unwrap_or_default())
            .with_default_model(self.gemini_model.clone())
            .with_timeout(self.timeout_secs);
        if let Some(url) = &self.gemini_base_url {
            config = config.with_base_url(url.clone());
        }
        config
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: Some(self.gemini_model.clone()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..GenerationSettings::default()
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{} has an invalid value: {:?}", key, value)))
}
