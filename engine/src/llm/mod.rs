//! LLM Provider Abstraction Layer
//!
//! The [`LLMProvider`] trait is the seam between the conversation pipeline and
//! a concrete model endpoint. [`client::ModelClient`] wraps a provider with the
//! fixed R instruction and hands the reply to the code block [`extract`]or.

use async_trait::async_trait;
use sdk::Message;

pub mod anthropic;
pub mod client;
pub mod extract;
pub mod prompt;

pub use client::{ModelClient, ModelReply};

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for sdk::EngineError {
    fn from(err: LLMError) -> Self {
        sdk::EngineError::LLMProvider(err.to_string())
    }
}

/// LLM Provider trait that all model endpoints implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "anthropic")
    fn name(&self) -> &str;

    /// Perform one completion round trip.
    ///
    /// # Arguments
    /// * `messages` - System instruction followed by the ordered user/assistant history
    ///
    /// # Returns
    /// * `Ok(String)` - The text of the top response
    /// * `Err(LLMError)` - If the request fails; callers do not retry
    async fn generate(&self, messages: &[Message]) -> Result<String>;
}
