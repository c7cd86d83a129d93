//! In-process fakes shared by the integration tests.
//!
//! `FakeBackend` hands out sessions that understand the handful of R
//! snippets the engine sends (file writes, plot encoding, info) and keep
//! "files" in a shared map so uploads and harvests can be checked end to end.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;
use rinterp_engine::config::Config;
use rinterp_engine::llm::{LLMError, LLMProvider};
use rinterp_engine::sandbox::{
    script, RemoteExecution, RemoteSession, SandboxBackend, SandboxError,
};
use rinterp_engine::services::Services;
use sdk::Message;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// State shared by every session a [`FakeBackend`] creates
#[derive(Default)]
pub struct FakeState {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub commands: Mutex<Vec<String>>,
    pub fail_runs: AtomicBool,
    pub reject_writes: AtomicBool,
    pub closed: AtomicUsize,
    pub execution_count: AtomicU64,
}

impl FakeState {
    pub fn put_file(&self, name: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

pub struct FakeBackend {
    pub state: Arc<FakeState>,
    pub sessions_created: AtomicUsize,
    pub create_delay: Duration,
    pub fail_create: bool,
    pub supports_close: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(FakeState::default()),
            sessions_created: AtomicUsize::new(0),
            create_delay: Duration::ZERO,
            fail_create: false,
            supports_close: true,
        }
    }

    pub fn created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SandboxBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn create_session(&self) -> Result<Arc<dyn RemoteSession>, SandboxError> {
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        if self.fail_create {
            return Err(SandboxError::SessionCreation("quota exceeded".to_string()));
        }
        let n = self.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeSession {
            id: format!("fake-{}", n),
            state: Arc::clone(&self.state),
            supports_close: self.supports_close,
        }))
    }
}

pub struct FakeSession {
    id: String,
    state: Arc<FakeState>,
    supports_close: bool,
}

fn capture(pattern: &str, text: &str) -> Option<String> {
    Regex::new(pattern)
        .unwrap()
        .captures(text)
        .map(|c| c[1].to_string())
}

fn unescape_r(s: &str) -> String {
    s.replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
}

fn stdout(text: impl Into<String>) -> RemoteExecution {
    RemoteExecution {
        stdout: vec![text.into()],
        ..RemoteExecution::default()
    }
}

impl FakeSession {
    fn write(&self, path: String, bytes: Vec<u8>) -> RemoteExecution {
        if self.state.reject_writes.load(Ordering::SeqCst) {
            return stdout("ERROR: Failed to save file");
        }
        self.state.files.lock().unwrap().insert(path.clone(), bytes);
        stdout(format!("{} {}", script::UPLOAD_SUCCESS_MARKER, path))
    }
}

#[async_trait]
impl RemoteSession for FakeSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run_code(&self, code: &str, _timeout: Duration) -> Result<RemoteExecution, SandboxError> {
        self.state.commands.lock().unwrap().push(code.to_string());
        if self.state.fail_runs.load(Ordering::SeqCst) {
            return Err(SandboxError::Transport("connection reset".to_string()));
        }

        if code.contains("base64enc::base64decode(") {
            let path = capture(r#"file\("([^"]+)", "wb"\)"#, code).unwrap();
            let b64 = capture(r#"base64decode\(what = "([^"]*)""#, code).unwrap();
            let bytes = BASE64.decode(b64).unwrap();
            return Ok(self.write(path, bytes));
        }

        if code.contains("writeLines(") {
            let path = capture(r#"file\("([^"]+)", "w""#, code).unwrap();
            let text = capture(r#"writeLines\("((?:[^"\\]|\\.)*)", con"#, code).unwrap();
            return Ok(self.write(path, unescape_r(&text).into_bytes()));
        }

        if code.contains("base64enc::base64encode(") {
            let name = capture(r#"file\.exists\("([^"]+)"\)"#, code).unwrap();
            let exec = match self.state.file(&name) {
                Some(bytes) => RemoteExecution {
                    stdout: vec![
                        "\n<<<PLOT_BEGIN>>>".to_string(),
                        BASE64.encode(bytes),
                        format!("{}\n", script::encoded_marker(&name)),
                    ],
                    ..RemoteExecution::default()
                },
                None => stdout(format!("\n{}\n", script::not_found_marker(&name))),
            };
            return Ok(exec);
        }

        if code.contains("installed.packages()") {
            return Ok(stdout(
                "R Version: 4.3.2 \nSystem Info: sysname: Linux, machine: x86_64 \nInstalled Packages: base (4.3.2), ggplot2 (3.4.4), dplyr (1.1.4) \n",
            ));
        }

        if code.contains("dir.create(") {
            return Ok(RemoteExecution::default());
        }

        if code.contains("file.info(") {
            return Ok(stdout("File exists: TRUE \nFile size: 3 bytes\n"));
        }

        let count = self.state.execution_count.fetch_add(1, Ordering::SeqCst) + 1;
        if code.contains("stop(") {
            return Ok(RemoteExecution {
                stderr: vec!["Error: boom\n".to_string()],
                error: Some("simpleError: boom".to_string()),
                execution_count: count,
                ..RemoteExecution::default()
            });
        }

        Ok(RemoteExecution {
            stdout: vec!["[1] 42\n".to_string()],
            execution_count: count,
            ..RemoteExecution::default()
        })
    }

    async fn close(&self) -> Result<(), SandboxError> {
        if !self.supports_close {
            return Err(SandboxError::Unsupported("close"));
        }
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Model stand-in that replays queued replies, then a default
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    default_reply: String,
    pub calls: Mutex<Vec<Vec<Message>>>,
    pub delay: Duration,
}

impl ScriptedProvider {
    pub fn new(default_reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: default_reply.to_string(),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(reply.to_string()));
    }

    pub fn push_failure(&self, error: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(error.to_string()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, messages: &[Message]) -> Result<String, LLMError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(error)) => Err(LLMError::ProviderUnavailable(error)),
            None => Ok(self.default_reply.clone()),
        }
    }
}

/// Services wired to fakes
pub fn fake_services(
    provider: Arc<ScriptedProvider>,
    backend: Arc<FakeBackend>,
) -> Services {
    Services::from_parts(
        Config::default(),
        provider as Arc<dyn LLMProvider>,
        backend as Arc<dyn SandboxBackend>,
    )
}
