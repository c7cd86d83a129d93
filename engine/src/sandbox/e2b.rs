//! E2B code interpreter backend.
//!
//! Sessions are created through the control API and code runs against the
//! in-sandbox execution endpoint, which streams newline-delimited JSON events.

use super::{RemoteExecution, RemoteSession, Result, SandboxBackend, SandboxError};
use crate::config::SandboxConfig;
use crate::secrets::{scrub_secrets, SecretString};
use async_trait::async_trait;
use sdk::R_LANGUAGE;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const EXEC_PORT: u16 = 49999;
const CONTROL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct CreateSandboxResponse {
    #[serde(rename = "sandboxID")]
    sandbox_id: String,
    #[serde(rename = "envdAccessToken", default)]
    access_token: Option<String>,
}

/// One line of the execution stream
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ExecutionEvent {
    Stdout {
        text: String,
    },
    Stderr {
        text: String,
    },
    Error {
        name: String,
        value: String,
        #[serde(default)]
        traceback: String,
    },
    NumberOfExecutions {
        execution_count: u64,
    },
    EndOfExecution,
    #[serde(other)]
    Other,
}

/// Fold an NDJSON execution stream into a [`RemoteExecution`]
pub fn parse_execution_stream(body: &str) -> Result<RemoteExecution> {
    let mut execution = RemoteExecution::default();
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let event: ExecutionEvent = serde_json::from_str(line)
            .map_err(|e| SandboxError::Protocol(format!("{}: {}", e, line)))?;
        match event {
            ExecutionEvent::Stdout { text } => execution.stdout.push(text),
            ExecutionEvent::Stderr { text } => execution.stderr.push(text),
            ExecutionEvent::Error {
                name,
                value,
                traceback,
            } => {
                debug!(%traceback, "Remote execution raised an error");
                execution.error = Some(format!("{}: {}", name, value));
            }
            ExecutionEvent::NumberOfExecutions { execution_count } => {
                execution.execution_count = execution_count
            }
            ExecutionEvent::EndOfExecution | ExecutionEvent::Other => {}
        }
    }
    Ok(execution)
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> SandboxError {
    if err.is_timeout() {
        SandboxError::Timeout(timeout.as_millis() as u64)
    } else {
        SandboxError::Transport(scrub_secrets(&err.to_string()))
    }
}

pub struct E2bBackend {
    config: SandboxConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl E2bBackend {
    pub fn new(config: SandboxConfig, api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SandboxError::Transport(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn exec_base(&self, sandbox_id: &str) -> String {
        match &self.config.exec_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}-{}.{}", EXEC_PORT, sandbox_id, self.config.domain),
        }
    }
}

#[async_trait]
impl SandboxBackend for E2bBackend {
    fn name(&self) -> &str {
        "e2b"
    }

    async fn create_session(&self) -> Result<Arc<dyn RemoteSession>> {
        let api_url = self.config.api_url.trim_end_matches('/').to_string();
        let payload = json!({
            "templateID": self.config.template,
            "timeout": self.config.session_lifetime_secs,
        });

        let response = self
            .client
            .post(format!("{}/sandboxes", api_url))
            .header("X-API-Key", self.api_key.expose())
            .timeout(CONTROL_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SandboxError::SessionCreation(transport_error(e, CONTROL_TIMEOUT).to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = scrub_secrets(&response.text().await.unwrap_or_default());
            return Err(SandboxError::SessionCreation(format!("{}: {}", status, text)));
        }

        let created: CreateSandboxResponse = response
            .json()
            .await
            .map_err(|e| SandboxError::SessionCreation(format!("invalid response: {}", e)))?;

        info!(sandbox_id = %created.sandbox_id, template = %self.config.template, "E2B sandbox created");

        Ok(Arc::new(E2bSession {
            exec_base: self.exec_base(&created.sandbox_id),
            id: created.sandbox_id,
            api_url,
            api_key: self.api_key.clone(),
            access_token: created.access_token.map(SecretString::from),
            client: self.client.clone(),
        }))
    }
}

pub struct E2bSession {
    id: String,
    exec_base: String,
    api_url: String,
    api_key: SecretString,
    access_token: Option<SecretString>,
    client: reqwest::Client,
}

#[async_trait]
impl RemoteSession for E2bSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run_code(&self, code: &str, timeout: Duration) -> Result<RemoteExecution> {
        let mut request = self
            .client
            .post(format!("{}/execute", self.exec_base))
            .timeout(timeout)
            .json(&json!({ "code": code, "language": R_LANGUAGE }));
        if let Some(token) = &self.access_token {
            request = request.header("X-Access-Token", token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = scrub_secrets(&response.text().await.unwrap_or_default());
            return Err(SandboxError::Transport(format!("{}: {}", status, text)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        parse_execution_stream(&body)
    }

    async fn close(&self) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/sandboxes/{}", self.api_url, self.id))
            .header("X-API-Key", self.api_key.expose())
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport_error(e, CONTROL_TIMEOUT))?;

        match response.status().as_u16() {
            200..=299 => Ok(()),
            404 => {
                warn!(sandbox_id = %self.id, "Sandbox already gone");
                Ok(())
            }
            _ => Err(SandboxError::Transport(format!(
                "kill returned {}",
                response.status()
            ))),
        }
    }
}
