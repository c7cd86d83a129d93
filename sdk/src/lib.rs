//! rinterp SDK
//!
//! Shared data model and error types for rinterp components.
//! This crate is used by the engine and by HTTP clients of the service.

/// Error types and handling
pub mod errors;

/// Conversation and execution data model
pub mod types;

/// HTTP request/response bodies
pub mod schema;

// Re-export commonly used types
pub use errors::{EngineError, EngineErrorExt};
pub use schema::{
    CodeExecutionRequest, ConversationRequest, ConversationResponse, FileUploadRequest,
    HealthResponse, UploadResponse,
};
pub use types::{
    AssistantResponse, CodeBlock, Conversation, ConversationSummary, ExecutionResult, Message,
    MessageRole, Plot, SandboxInfo, R_LANGUAGE,
};
