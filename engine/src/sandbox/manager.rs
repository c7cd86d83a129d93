//! Sandbox Session Manager
//!
//! Owns the one remote session shared by every conversation. The session is
//! created on first use and reused afterwards; creation is single-flight, so
//! concurrent first callers wait for the same session instead of racing to
//! create their own.

use super::script;
use super::{RemoteExecution, RemoteSession, SandboxBackend, SandboxError};
use crate::config::SandboxConfig;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sdk::{EngineError, ExecutionResult, SandboxInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const SETUP_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);
const INFO_TIMEOUT: Duration = Duration::from_secs(30);

/// Reduce a client supplied name to its final path component.
///
/// Both `/` and `\` count as separators. Names that reduce to nothing, `.`
/// or `..` are rejected.
pub fn sanitize_filename(filename: &str) -> Result<String, EngineError> {
    let name = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or("")
        .trim();

    match name {
        "" | "." | ".." => Err(EngineError::InvalidFilename(filename.to_string())),
        name => Ok(name.to_string()),
    }
}

pub struct SandboxManager {
    backend: Arc<dyn SandboxBackend>,
    session: Mutex<Option<Arc<dyn RemoteSession>>>,
    default_timeout_ms: u64,
    uploads_dir: String,
}

impl SandboxManager {
    pub fn new(backend: Arc<dyn SandboxBackend>, config: &SandboxConfig) -> Self {
        Self {
            backend,
            session: Mutex::new(None),
            default_timeout_ms: config.timeout_ms,
            uploads_dir: config.uploads_dir.clone(),
        }
    }

    pub fn uploads_dir(&self) -> &str {
        &self.uploads_dir
    }

    pub fn default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
    }

    pub async fn is_ready(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Return the live session, creating it on first use.
    ///
    /// The lock is held across creation. Once a session exists callers only
    /// clone the handle, so runs do not serialize against each other.
    pub async fn ensure_ready(&self) -> Result<Arc<dyn RemoteSession>, SandboxError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(Arc::clone(session));
        }

        let session = self.backend.create_session().await.map_err(|e| {
            error!(backend = %self.backend.name(), error = %e, "Error initializing sandbox");
            e
        })?;
        info!(backend = %self.backend.name(), session_id = %session.id(), "Sandbox initialized");

        let mkdir = script::create_dir_command(&self.uploads_dir);
        match session.run_code(&mkdir, SETUP_TIMEOUT).await {
            Ok(exec) if exec.error.is_none() => {
                info!(dir = %self.uploads_dir, "Created uploads directory")
            }
            Ok(exec) => {
                warn!(dir = %self.uploads_dir, error = ?exec.error, "Error creating uploads directory")
            }
            Err(e) => warn!(dir = %self.uploads_dir, error = %e, "Error creating uploads directory"),
        }

        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Run a command in the session and return the raw outcome
    pub async fn run_command(
        &self,
        code: &str,
        timeout: Duration,
    ) -> Result<RemoteExecution, SandboxError> {
        let session = self.ensure_ready().await?;
        session.run_code(code, timeout).await
    }

    /// Execute user R code. Never fails: transport problems become the
    /// result's `error`.
    pub async fn run(&self, code: &str, timeout_ms: Option<u64>) -> ExecutionResult {
        let timeout_ms = timeout_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(self.default_timeout_ms);

        match self
            .run_command(code, Duration::from_millis(timeout_ms))
            .await
        {
            Ok(exec) => {
                debug!(
                    execution_count = exec.execution_count,
                    failed = exec.error.is_some(),
                    "Code executed"
                );
                ExecutionResult {
                    stdout: exec.stdout,
                    stderr: exec.stderr,
                    error: exec.error,
                    execution_count: exec.execution_count,
                    plots: Vec::new(),
                }
            }
            Err(e) => {
                error!(error = %e, "Error executing code in sandbox");
                ExecutionResult::failed(format!("Execution error: {}", e))
            }
        }
    }

    /// Write a base64 encoded file into the uploads directory.
    ///
    /// Returns the path inside the sandbox, `<uploads_dir>/<name>`.
    pub async fn upload(
        &self,
        filename: &str,
        content_base64: &str,
        content_type: &str,
    ) -> Result<String, EngineError> {
        let name = sanitize_filename(filename)?;
        let path = format!("{}/{}", self.uploads_dir, name);
        let content_base64 = content_base64.trim();

        let bytes = BASE64
            .decode(content_base64)
            .map_err(|e| EngineError::InvalidEncoding(e.to_string()))?;

        let command = if content_type.starts_with("text/") {
            let text =
                String::from_utf8(bytes).map_err(|e| EngineError::InvalidEncoding(e.to_string()))?;
            script::write_text_command(&path, &text)
        } else {
            script::write_binary_command(&path, content_base64)
        };

        let upload_failed = |reason: String| {
            error!(filename = %name, %reason, "Failed to upload file to sandbox");
            EngineError::UploadFailed {
                filename: name.clone(),
                reason,
            }
        };

        let exec = self
            .run_command(&command, WRITE_TIMEOUT)
            .await
            .map_err(|e| upload_failed(e.to_string()))?;
        if let Some(err) = exec.error {
            return Err(upload_failed(err));
        }
        if !script::upload_succeeded(&exec.stdout_text()) {
            return Err(upload_failed("file was not confirmed on the sandbox".to_string()));
        }

        match self
            .run_command(&script::file_info_command(&path), SETUP_TIMEOUT)
            .await
        {
            Ok(exec) => info!(%path, details = %exec.stdout_text().trim(), "File uploaded"),
            Err(e) => warn!(%path, error = %e, "Could not read uploaded file info"),
        }

        Ok(path)
    }

    /// Upload raw bytes, encoding them first
    pub async fn upload_bytes(
        &self,
        filename: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, EngineError> {
        self.upload(filename, &BASE64.encode(bytes), content_type)
            .await
    }

    /// Describe the sandbox's R installation
    pub async fn info(&self) -> SandboxInfo {
        match self.run_command(script::INFO_COMMAND, INFO_TIMEOUT).await {
            Ok(exec) => match exec.error {
                Some(err) => SandboxInfo {
                    error: Some(err),
                    ..SandboxInfo::default()
                },
                None => script::parse_info(&exec.stdout_text()),
            },
            Err(e) => {
                error!(error = %e, "Error getting sandbox info");
                SandboxInfo {
                    error: Some(e.to_string()),
                    ..SandboxInfo::default()
                }
            }
        }
    }

    /// Tear down the session if there is one. Always leaves the manager
    /// uninitialized.
    pub async fn close(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };

        match session.close().await {
            Ok(()) => info!(session_id = %session.id(), "Sandbox closed"),
            Err(SandboxError::Unsupported(_)) => info!(
                session_id = %session.id(),
                "Sandbox has no close capability, leaving it to expire"
            ),
            Err(e) => warn!(session_id = %session.id(), error = %e, "Error closing sandbox"),
        }
    }
}
