//! Remote R Execution
//!
//! [`SandboxBackend`] creates remote sessions and [`RemoteSession`] runs code in
//! one. [`manager::SandboxManager`] owns the single shared session and exposes
//! run, upload and introspection on top of it. [`script`] holds the R snippets
//! those operations send.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub mod e2b;
pub mod manager;
pub mod script;

pub use manager::{sanitize_filename, SandboxManager};

/// Result type for sandbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Errors raised while talking to the remote execution service
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Failed to create sandbox session: {0}")]
    SessionCreation(String),

    #[error("Sandbox transport error: {0}")]
    Transport(String),

    #[error("Sandbox request timed out after {0} ms")]
    Timeout(u64),

    #[error("Unexpected sandbox response: {0}")]
    Protocol(String),

    #[error("Operation not supported by this sandbox: {0}")]
    Unsupported(&'static str),
}

impl From<SandboxError> for sdk::EngineError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::SessionCreation(msg) => sdk::EngineError::SandboxUnavailable(msg),
            other => sdk::EngineError::Sandbox(other.to_string()),
        }
    }
}

/// Raw outcome of one remote run, before plots are attached
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteExecution {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub error: Option<String>,
    pub execution_count: u64,
}

impl RemoteExecution {
    pub fn stdout_text(&self) -> String {
        self.stdout.concat()
    }
}

/// Factory for remote sessions
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    /// Returns the name of the backend (e.g., "e2b")
    fn name(&self) -> &str;

    /// Start a new remote R environment
    async fn create_session(&self) -> Result<Arc<dyn RemoteSession>>;
}

/// One live remote environment. State persists between `run_code` calls.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    fn id(&self) -> &str;

    /// Run R code, bounded by `timeout`.
    ///
    /// An error raised by the user's code is reported in
    /// [`RemoteExecution::error`]; `Err` means the round trip itself failed.
    async fn run_code(&self, code: &str, timeout: Duration) -> Result<RemoteExecution>;

    /// Tear the environment down. Backends that cannot do this keep the default.
    async fn close(&self) -> Result<()> {
        Err(SandboxError::Unsupported("close"))
    }
}
