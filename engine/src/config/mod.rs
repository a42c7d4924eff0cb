//! Configuration management
//!
//! This module handles loading, validation, and management of the
//! finchat configuration. Configuration is stored in TOML format at
//! ~/.finchat/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Data directory and log level
//! - **server**: HTTP bind address for the API surface
//! - **search**: Search provider endpoint and credentials
//! - **llm**: Chat model provider settings and preferences
//!
//! # API keys
//!
//! Keys can be placed in the config file or supplied through the
//! environment (`FINCHAT_SEARCH_API_KEY`, `FINCHAT_LLM_API_KEY`);
//! the environment wins when both are present.
//!
//! # Examples
//!
//! ```no_run
//! use finchat_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Data dir: {:?}", config.core.data_dir);
//! println!("Provider: {}", config.llm.provider);
//! # Ok(())
//! # }
//! ```

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Search provider configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Chat model provider configuration
    #[serde(default)]
    pub llm: LLMConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Search provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL for the search API
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// API key (environment variable FINCHAT_SEARCH_API_KEY overrides)
    #[serde(default)]
    pub api_key: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key: String::new(),
        }
    }
}

impl SearchConfig {
    /// Resolve the API key, preferring the environment.
    pub fn resolved_api_key(&self) -> String {
        std::env::var("FINCHAT_SEARCH_API_KEY").unwrap_or_else(|_| self.api_key.clone())
    }
}

/// Chat model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Active provider ("openai" for any OpenAI-compatible endpoint,
    /// or "gemini" for the native Gemini API)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// OpenAI-compatible provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Gemini provider settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// API key (environment variable FINCHAT_LLM_API_KEY overrides)
    #[serde(default)]
    pub api_key: String,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            openai: OpenAIConfig::default(),
            gemini: GeminiConfig::default(),
            api_key: String::new(),
        }
    }
}

impl LLMConfig {
    /// Resolve the API key, preferring the environment.
    pub fn resolved_api_key(&self) -> String {
        std::env::var("FINCHAT_LLM_API_KEY").unwrap_or_else(|_| self.api_key.clone())
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for the OpenAI-compatible API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for the Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
        }
    }
}

impl Config {
    /// Default config file path: ~/.finchat/config.toml
    pub fn default_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;
        Ok(home.join(".finchat").join("config.toml"))
    }

    /// Load the configuration from the default location, writing a
    /// default file first if none exists.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let path = Self::default_path()?;

        if !path.exists() {
            let config = Config::default();
            config.save_to_path(&path)?;
            tracing::info!("Created default configuration at {}", path.display());
            return Ok(config);
        }

        Self::load_from_path(&path)
    }

    /// Load the configuration from an explicit path.
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let config: Config = toml::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize and write the configuration.
    pub fn save_to_path(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| EngineError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let raw = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, raw)
            .map_err(|e| EngineError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), EngineError> {
        const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
        if !LEVELS.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level: {}",
                self.core.log_level
            )));
        }

        if self.llm.provider != "openai" && self.llm.provider != "gemini" {
            return Err(EngineError::Config(format!(
                "Unknown LLM provider: {} (expected \"openai\" or \"gemini\")",
                self.llm.provider
            )));
        }

        if self.search.base_url.is_empty() {
            return Err(EngineError::Config("search.base_url must not be empty".to_string()));
        }

        Ok(())
    }

    /// Path of the SQLite database file, under the data directory
    /// with ~ expanded.
    pub fn db_path(&self) -> PathBuf {
        let dir = expand_home(&self.core.data_dir);
        dir.join("finchat.db")
    }
}

/// Expand a leading ~/ to the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    let raw = path.to_str().unwrap_or("");
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.finchat")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_search_base_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_openai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_openai_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}
