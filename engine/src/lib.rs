//! rinterp Engine Library
//!
//! Natural language in, R code out, executed in a remote sandbox.
//! This library is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Telemetry and Observability
pub mod telemetry;

/// In-memory conversation storage
pub mod store;

/// LLM provider abstraction layer
pub mod llm;

/// Remote R execution sessions
pub mod sandbox;

/// Plot file retrieval
pub mod plots;

/// Conversation turn pipeline
pub mod orchestrator;

/// Service wiring
pub mod services;

/// HTTP API
pub mod server;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
