//! Configuration management
//!
//! This module handles loading, validation, and management of the Ensemble
//! configuration. Configuration is stored in TOML format at
//! ~/.ensemble/config.toml and created with defaults on first use.
//!
//! # Configuration Sections
//!
//! - **core**: log level
//! - **llm**: plan-generation provider settings
//! - **orchestrator**: per-request limits
//! - **workers**: retrieval, analysis, and visualization settings
//!
//! API keys never live in the file. The OpenAI-compatible provider reads its
//! key from the environment variable named by `llm.openai.api_key_env`.
//!
//! # Examples
//!
//! ```no_run
//! use ensemble_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Default provider: {}", config.llm.default_provider);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    pub llm: LLMConfig,

    /// Request handling limits
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Worker settings
    #[serde(default)]
    pub workers: WorkersConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default LLM provider (openai, ollama)
    pub default_provider: String,

    /// OpenAI-compatible provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for the chat completions API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Per-request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Deadline for a whole request in seconds (0 disables it)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Worker settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkersConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub visualization: VisualizationConfig,
}

/// Retrieval worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// HTTP timeout in seconds
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with page requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_retrieval_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Analysis worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Table name the dataset is registered under for generated queries
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            table_name: default_table_name(),
        }
    }
}

/// Visualization worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    /// Chart width in pixels
    #[serde(default = "default_chart_width")]
    pub width: u32,

    /// Chart height in pixels
    #[serde(default = "default_chart_height")]
    pub height: u32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_request_timeout() -> u64 {
    180
}

fn default_retrieval_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

fn default_table_name() -> String {
    "data_table".to_string()
}

fn default_chart_width() -> u32 {
    800
}

fn default_chart_height() -> u32 {
    600
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_openai_api_key_env(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.ensemble/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, TOML parsing
    /// fails, or validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default_config();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.ensemble/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".ensemble").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig {
                default_provider: "openai".to_string(),
                openai: OpenAIConfig::default(),
                ollama: OllamaConfig::default(),
            },
            orchestrator: OrchestratorConfig::default(),
            workers: WorkersConfig::default(),
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["openai", "ollama"];
        if !valid_providers.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                valid_providers.join(", ")
            )));
        }

        if self.workers.retrieval.timeout_secs == 0 {
            return Err(EngineError::Config(
                "workers.retrieval.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.workers.visualization.width == 0 || self.workers.visualization.height == 0 {
            return Err(EngineError::Config(
                "workers.visualization width and height must be greater than 0".to_string(),
            ));
        }

        if self.workers.analysis.table_name.trim().is_empty() {
            return Err(EngineError::Config(
                "workers.analysis.table_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.default_provider, "openai");
        assert_eq!(config.orchestrator.request_timeout_secs, 180);
        assert_eq!(config.workers.retrieval.timeout_secs, 15);
        assert_eq!(config.workers.analysis.table_name, "data_table");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
[llm]
default_provider = "ollama"
"#,
        )
        .unwrap();

        assert_eq!(config.llm.ollama.model, "llama3.1:8b");
        assert_eq!(config.workers.visualization.width, 800);
        assert_eq!(config.llm.openai.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_invalid_provider_rejected() {
        let err = Config::from_toml_str(
            r#"
[llm]
default_provider = "gemini"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::Config(msg) if msg.contains("gemini")));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Config::from_toml_str(
            r#"
[core]
log_level = "verbose"

[llm]
default_provider = "openai"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_zero_retrieval_timeout_rejected() {
        let err = Config::from_toml_str(
            r#"
[llm]
default_provider = "openai"

[workers.retrieval]
timeout_secs = 0
"#,
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::Config(msg) if msg.contains("timeout_secs")));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(
            config.llm.default_provider,
            deserialized.llm.default_provider
        );
        assert_eq!(
            config.workers.retrieval.user_agent,
            deserialized.workers.retrieval.user_agent
        );
    }
}
