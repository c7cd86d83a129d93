//! Conversation and execution data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Language tag assigned to every extracted code block.
pub const R_LANGUAGE: &str = "r";

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Message in a conversation history. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,

    /// When the message was created
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message with the given role, stamped now
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

/// A conversation: an append-only list of messages keyed by an opaque id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation with the given id
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and bump `updated_at`
    pub fn push(&mut self, message: Message) {
        self.updated_at = message.timestamp.max(self.updated_at);
        self.messages.push(message);
    }
}

/// Lightweight view of a conversation for listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSummary {
    pub id: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            message_count: conversation.messages.len(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

/// One fenced code fragment taken from model output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeBlock {
    pub code: String,
    pub language: String,
}

impl CodeBlock {
    /// Create an R code block
    pub fn r(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: R_LANGUAGE.to_string(),
        }
    }
}

/// An artifact retrieved from the sandbox, base64 encoded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Plot {
    /// File name as referenced in the submitted code
    pub filename: String,

    /// Standard base64 of the file bytes
    pub content: String,

    /// Follows the file extension: `image/png` or `application/pdf`
    pub mime_type: String,
}

/// Outcome of running code in the sandbox.
///
/// `error` with empty output streams is a valid total failure. A missing
/// `error` does not imply an empty `stderr`, since R writes warnings there.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    #[serde(default)]
    pub stdout: Vec<String>,

    #[serde(default)]
    pub stderr: Vec<String>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub execution_count: u64,

    #[serde(default)]
    pub plots: Vec<Plot>,
}

impl ExecutionResult {
    /// A result carrying only an error message
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Concatenated stdout, in the order the chunks arrived
    pub fn stdout_text(&self) -> String {
        self.stdout.concat()
    }
}

/// The assistant side of one turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantResponse {
    /// Full text reply from the model
    pub message: String,

    pub code_blocks: Vec<CodeBlock>,

    /// Result of running the first code block, if it could be run
    pub execution_results: Option<ExecutionResult>,
}

/// Facts about the sandbox's R installation. Absent lines leave fields empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SandboxInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_info: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_packages: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
