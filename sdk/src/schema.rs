//! Request and response bodies of the HTTP API

use serde::{Deserialize, Serialize};

use crate::types::{AssistantResponse, Conversation};

/// Body of `POST /api/conversation/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub message: String,
}

/// Reply to `POST /api/conversation/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation: Conversation,
    pub response: AssistantResponse,
}

/// Body of `POST /api/sandbox/execute`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExecutionRequest {
    pub code: String,
    /// Falls back to the configured default when absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Body of `POST /api/sandbox/upload-file-base64`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUploadRequest {
    pub filename: String,
    /// Base64 encoded file content
    pub content: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

/// Reply to both upload endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub filename: String,
    pub path: String,
}

/// Reply to `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub env: String,
}
