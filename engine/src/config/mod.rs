//! Configuration management
//!
//! This module handles loading, validation, and management of the rinterp configuration.
//! Configuration is stored in TOML format at ~/.rinterp/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level and deployment environment name
//! - **server**: HTTP bind address
//! - **llm**: Anthropic endpoint, model and sampling settings
//! - **sandbox**: Remote execution endpoint, template and timeouts
//!
//! API keys never live in this file. They are read from the environment by
//! [`crate::secrets::Credentials`].
//!
//! # Examples
//!
//! ```no_run
//! use rinterp_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Model: {}", config.llm.model);
//! println!("Default timeout: {} ms", config.sandbox.timeout_ms);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Model endpoint configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Remote execution configuration
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deployment environment reported by the health endpoint
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Anthropic model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL for the Anthropic API
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_anthropic_model")]
    pub model: String,

    /// Maximum number of output tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Whole-request timeout for one completion (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    // Note: API key read from ANTHROPIC_API_KEY, not from config
}

/// Remote execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Control plane URL used to create and kill sandboxes
    #[serde(default = "default_sandbox_api_url")]
    pub api_url: String,

    /// Domain under which sandbox hosts are exposed
    #[serde(default = "default_sandbox_domain")]
    pub domain: String,

    /// Sandbox template providing the R kernel
    #[serde(default = "default_sandbox_template")]
    pub template: String,

    /// Default execution timeout in milliseconds
    #[serde(default = "default_sandbox_timeout_ms")]
    pub timeout_ms: u64,

    /// How long the remote sandbox may live before it is reclaimed (seconds)
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime_secs: u64,

    /// Directory inside the sandbox that receives uploads
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,

    /// Overrides the per-sandbox execution URL (self-hosted kernels, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_url: Option<String>,
    // Note: API key read from E2B_API_KEY, not from config
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-sonnet-20240229".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f64 {
    0.3
}

fn default_request_timeout() -> u64 {
    120
}

fn default_sandbox_api_url() -> String {
    "https://api.e2b.dev".to_string()
}

fn default_sandbox_domain() -> String {
    "e2b.app".to_string()
}

fn default_sandbox_template() -> String {
    "code-interpreter-v1".to_string()
}

fn default_sandbox_timeout_ms() -> u64 {
    300_000
}

fn default_session_lifetime() -> u64 {
    3600
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            environment: default_environment(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            api_url: default_sandbox_api_url(),
            domain: default_sandbox_domain(),
            template: default_sandbox_template(),
            timeout_ms: default_sandbox_timeout_ms(),
            session_lifetime_secs: default_session_lifetime(),
            uploads_dir: default_uploads_dir(),
            exec_url: None,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load configuration from the default location (~/.rinterp/config.toml)
    ///
    /// If the configuration file doesn't exist, writes a default configuration.
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
        let path = expand_path(path)?;
        let contents = fs::read_to_string(&path)
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

        let config = Self::default();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!(path = %path.display(), "Wrote default configuration");
        Ok(config)
    }

    /// Get the default configuration file path (~/.rinterp/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".rinterp").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(EngineError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.sandbox.timeout_ms == 0 {
            return Err(EngineError::Config(
                "sandbox timeout_ms must be greater than 0".to_string(),
            ));
        }

        let uploads = self.sandbox.uploads_dir.trim_matches('/');
        if uploads.is_empty() || uploads.split('/').any(|seg| seg == "..") {
            return Err(EngineError::Config(format!(
                "Invalid uploads_dir '{}'",
                self.sandbox.uploads_dir
            )));
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
