//! Configuration management for secdoc
//!
//! Settings are read from environment variables with defaults. Nothing about the model
//! endpoint or credential is hardcoded; the caller supplies both.
//!
//! # Environment Variables
//!
//! ## Model capability
//! - `SECDOC_PROVIDER`: adapter (openai|ollama|anthropic|gemini|groq|xai|deepseek|cohere) - default: "openai"
//! - `SECDOC_MODEL`: model identifier - **required**
//! - `SECDOC_API_BASE_URL`: endpoint override, e.g. an OpenAI-compatible gateway
//! - `SECDOC_API_KEY`: credential
//! - `SECDOC_API_KEY_ENV`: name of the variable holding the credential when `SECDOC_API_KEY` is unset
//! - `SECDOC_REQUEST_TIMEOUT`: seconds per call and per streamed fragment - default: "60"
//! - `SECDOC_MAX_TOKENS`: generation limit per call - default: "2048"
//!
//! ## Resources
//! - `SECDOC_KEYWORDS_FILE`, `SECDOC_PHRASES_FILE`: lexicon files (JSON or YAML)
//! - `SECDOC_PROMPTS_DIR`: directory of `.j2` prompt overrides
//! - `SECDOC_POLICY_FILE`: TOML decision policy
//!
//! ## Decision policy overrides
//! - `SECDOC_FORWARD_WEIGHT`, `SECDOC_REVERSE_WEIGHT`, `SECDOC_LEXICAL_WEIGHT`
//! - `SECDOC_CONFIDENCE_THRESHOLD`, `SECDOC_DECISION_STRATEGY` (model|rules)
//!
//! ## Logging
//! - `SECDOC_LOG_LEVEL`: default "info"
//! - `SECDOC_LOG_JSON`: default "false"

use crate::lexicon::{Lexicon, LexiconError};
use crate::llm::GenAIClient;
use crate::policy::{DecisionPolicy, PolicyError};
use crate::prompt::{PromptError, PromptLibrary};
use genai::adapter::AdapterKind;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PROVIDER: &str = "openai";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    /// Invalid provider name
    #[error("Invalid provider: {0}. Valid options: openai, ollama, anthropic, gemini, groq, xai, deepseek, cohere")]
    InvalidProvider(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Maps a provider name onto the genai adapter that speaks its protocol
pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
    match name.trim().to_lowercase().as_str() {
        "openai" | "openai-compatible" | "openai_compatible" => Ok(AdapterKind::OpenAI),
        "ollama" => Ok(AdapterKind::Ollama),
        "anthropic" | "claude" => Ok(AdapterKind::Anthropic),
        "gemini" => Ok(AdapterKind::Gemini),
        "groq" => Ok(AdapterKind::Groq),
        "xai" | "grok" => Ok(AdapterKind::Xai),
        "deepseek" => Ok(AdapterKind::DeepSeek),
        "cohere" => Ok(AdapterKind::Cohere),
        other => Err(ConfigError::InvalidProvider(other.to_string())),
    }
}

/// Conventional credential variable per provider
fn default_key_env(provider: AdapterKind) -> Option<&'static str> {
    match provider {
        AdapterKind::OpenAI => Some("OPENAI_API_KEY"),
        AdapterKind::Anthropic => Some("ANTHROPIC_API_KEY"),
        AdapterKind::Gemini => Some("GEMINI_API_KEY"),
        AdapterKind::Groq => Some("GROQ_API_KEY"),
        AdapterKind::Xai => Some("XAI_API_KEY"),
        AdapterKind::DeepSeek => Some("DEEPSEEK_API_KEY"),
        AdapterKind::Cohere => Some("COHERE_API_KEY"),
        _ => None,
    }
}

/// Main configuration structure for secdoc
#[derive(Clone)]
pub struct SecdocConfig {
    pub provider: AdapterKind,

    /// Model identifier as understood by the endpoint
    pub model: String,

    pub api_base_url: Option<String>,

    pub api_key: Option<String>,

    /// Variable named by `SECDOC_API_KEY_ENV`, kept for error reporting
    pub api_key_env: Option<String>,

    pub request_timeout_secs: u64,

    pub max_tokens: u32,

    pub keywords_file: Option<PathBuf>,
    pub phrases_file: Option<PathBuf>,
    pub prompts_dir: Option<PathBuf>,
    pub policy_file: Option<PathBuf>,

    /// Policy after file and environment overrides
    pub policy: DecisionPolicy,

    pub log_level: String,
    pub log_json: bool,
}

impl SecdocConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = parse_provider(
            &get("SECDOC_PROVIDER").unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
        )?;

        let model = get("SECDOC_MODEL").ok_or_else(|| ConfigError::MissingKey {
            key: "SECDOC_MODEL".to_string(),
        })?;

        let api_key_env = get("SECDOC_API_KEY_ENV").map(|name| name.trim().to_string());
        let api_key = get("SECDOC_API_KEY").or_else(|| {
            api_key_env
                .clone()
                .or_else(|| default_key_env(provider).map(str::to_string))
                .and_then(|name| get(&name))
        });

        let request_timeout_secs =
            parse_field(&get, "SECDOC_REQUEST_TIMEOUT")?.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let max_tokens = parse_field(&get, "SECDOC_MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS);

        let policy_file = get("SECDOC_POLICY_FILE").map(PathBuf::from);
        let mut policy = match &policy_file {
            Some(path) => DecisionPolicy::load(path)?,
            None => DecisionPolicy::default(),
        };
        policy.apply_overrides(&get)?;

        let log_json = parse_field(&get, "SECDOC_LOG_JSON")?.unwrap_or(false);
        let log_level = get("SECDOC_LOG_LEVEL")
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Ok(Self {
            provider,
            model,
            api_base_url: get("SECDOC_API_BASE_URL"),
            api_key,
            api_key_env,
            request_timeout_secs,
            max_tokens,
            keywords_file: get("SECDOC_KEYWORDS_FILE").map(PathBuf::from),
            phrases_file: get("SECDOC_PHRASES_FILE").map(PathBuf::from),
            prompts_dir: get("SECDOC_PROMPTS_DIR").map(PathBuf::from),
            policy_file,
            policy,
            log_level,
            log_json,
        })
    }

    /// Validates the configuration
    ///
    /// Checks that:
    /// - A credential was resolved, unless the provider runs locally (Ollama)
    /// - Timeout is between 1 second and 10 minutes
    /// - Token limit is non-zero
    /// - Policy weights and threshold are usable
    /// - Log level is valid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_none() && self.provider != AdapterKind::Ollama {
            let key = self
                .api_key_env
                .clone()
                .unwrap_or_else(|| "SECDOC_API_KEY".to_string());
            return Err(ConfigError::MissingKey { key });
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max tokens must be greater than zero".to_string(),
            ));
        }

        self.policy.validate()?;

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Creates the language-model client for the configured endpoint
    pub fn create_client(&self) -> Arc<GenAIClient> {
        Arc::new(GenAIClient::new(
            self.provider,
            self.model.clone(),
            self.api_base_url.clone(),
            self.api_key.clone(),
            self.request_timeout(),
        ))
    }

    pub fn load_lexicon(&self) -> Result<Lexicon, LexiconError> {
        Lexicon::load(self.keywords_file.as_deref(), self.phrases_file.as_deref())
    }

    pub fn load_prompts(&self) -> Result<PromptLibrary, PromptError> {
        PromptLibrary::load(self.prompts_dir.as_deref())
    }

    /// Flat key/value view for machine-readable output; the credential is never included
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        map.insert("provider".to_string(), self.provider.as_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        if let Some(ref url) = self.api_base_url {
            map.insert("api_base_url".to_string(), url.clone());
        }
        map.insert("api_key_set".to_string(), self.api_key.is_some().to_string());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert("max_tokens".to_string(), self.max_tokens.to_string());
        map.insert("keywords_file".to_string(), display_path(&self.keywords_file));
        map.insert("phrases_file".to_string(), display_path(&self.phrases_file));
        map.insert("prompts_dir".to_string(), display_path(&self.prompts_dir));
        map.insert("policy_file".to_string(), display_path(&self.policy_file));
        map.insert(
            "forward_weight".to_string(),
            self.policy.forward_weight.to_string(),
        );
        map.insert(
            "reverse_weight".to_string(),
            self.policy.reverse_weight.to_string(),
        );
        map.insert(
            "lexical_weight".to_string(),
            self.policy.lexical_weight.to_string(),
        );
        map.insert(
            "confidence_threshold".to_string(),
            self.policy.confidence_threshold.to_string(),
        );
        map.insert("decision_strategy".to_string(), self.policy.strategy.to_string());
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

fn parse_field<G, T>(get: &G, field: &str) -> Result<Option<T>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    get(field)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::ParseError {
                field: field.to_string(),
                error: e.to_string(),
            })
        })
        .transpose()
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(built-in)".to_string())
}

impl fmt::Display for SecdocConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Secdoc Configuration:")?;
        writeln!(f, "  Provider: {}", self.provider.as_str())?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(
            f,
            "  Endpoint: {}",
            self.api_base_url.as_deref().unwrap_or("(provider default)")
        )?;
        writeln!(
            f,
            "  API Key: {}",
            if self.api_key.is_some() { "(set)" } else { "(not set)" }
        )?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Max Tokens: {}", self.max_tokens)?;
        writeln!(f, "  Keywords: {}", display_path(&self.keywords_file))?;
        writeln!(f, "  Phrases: {}", display_path(&self.phrases_file))?;
        writeln!(f, "  Prompts: {}", display_path(&self.prompts_dir))?;
        writeln!(
            f,
            "  Weights: forward={} reverse={} lexical={}",
            self.policy.forward_weight, self.policy.reverse_weight, self.policy.lexical_weight
        )?;
        writeln!(f, "  Confidence Threshold: {}", self.policy.confidence_threshold)?;
        writeln!(f, "  Decision Strategy: {}", self.policy.strategy)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

impl fmt::Debug for SecdocConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecdocConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .field("policy", &self.policy)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}
