//! Error types and handling
//!
//! This module provides the error types shared by the engine and its HTTP shim.
//! All errors implement the `EngineErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Hints never echo the wrapped detail, so API keys that end up inside a
//! provider error message are not shown to end users.

use thiserror::Error;

/// Trait for engine error extensions
///
/// Provides additional context for errors: a user-facing hint and whether
/// retrying the same request can reasonably succeed.
pub trait EngineErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &'static str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors require a configuration change or a restart.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: invalid or missing configuration and credentials
/// - **LLM Provider**: model endpoint failures (fatal to the turn)
/// - **Sandbox**: remote execution session failures
/// - **Upload**: remote write or verification failures (fatal to the upload)
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, EngineErrorExt};
///
/// let error = EngineError::InvalidFilename("..".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::MissingCredential("ANTHROPIC_API_KEY".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Sandbox errors
    #[error("Sandbox unavailable: {0}")]
    SandboxUnavailable(String),

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    // Upload errors
    #[error("Failed to upload file to sandbox: {filename}: {reason}")]
    UploadFailed { filename: String, reason: String },

    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("Invalid base64 content: {0}")]
    InvalidEncoding(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineErrorExt for EngineError {
    fn user_hint(&self) -> &'static str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::MissingCredential(_) => "Set the required API key in the environment",
            Self::LLMProvider(_) => "Model endpoint unavailable. Check your API key and network",
            Self::SandboxUnavailable(_) => "Could not start the R sandbox. Try again shortly",
            Self::Sandbox(_) => "The R sandbox reported a problem",
            Self::UploadFailed { .. } => "The file could not be written to the sandbox",
            Self::InvalidFilename(_) => "Use a plain file name without directories",
            Self::InvalidEncoding(_) => "File content must be valid base64",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::MissingCredential(_))
    }
}
