//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be loaded from disk,
//! validated, and filled with defaults for missing sections.

use rinterp_engine::config::Config;
use sdk::EngineError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config_from_file() {
    let file = write_config(
        r#"
[core]
log_level = "debug"
environment = "production"

[server]
host = "0.0.0.0"
port = 9000

[llm]
model = "claude-3-5-sonnet-20241022"
max_tokens = 2048
temperature = 0.1

[sandbox]
timeout_ms = 60000
uploads_dir = "data/uploads"
exec_url = "http://localhost:49999"
"#,
    );

    let config = Config::load_from_path(file.path()).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.core.environment, "production");
    assert_eq!(config.server.bind_address(), "0.0.0.0:9000");
    assert_eq!(config.llm.model, "claude-3-5-sonnet-20241022");
    assert_eq!(config.llm.max_tokens, 2048);
    assert_eq!(config.llm.base_url, "https://api.anthropic.com/v1");
    assert_eq!(config.sandbox.timeout_ms, 60000);
    assert_eq!(config.sandbox.uploads_dir, "data/uploads");
    assert_eq!(
        config.sandbox.exec_url.as_deref(),
        Some("http://localhost:49999")
    );
    assert_eq!(config.sandbox.template, "code-interpreter-v1");
}

#[test]
fn test_empty_file_uses_defaults() {
    let file = write_config("");
    let config = Config::load_from_path(file.path()).unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.llm.model, "claude-3-sonnet-20240229");
    assert_eq!(config.llm.max_tokens, 4096);
    assert_eq!(config.sandbox.timeout_ms, 300000);
    assert_eq!(config.sandbox.uploads_dir, "uploads");
    assert!(config.sandbox.exec_url.is_none());
}

#[test]
fn test_invalid_values_rejected() {
    for contents in [
        "[core]\nlog_level = \"verbose\"\n",
        "[llm]\ntemperature = 1.5\n",
        "[llm]\nmax_tokens = 0\n",
        "[sandbox]\ntimeout_ms = 0\n",
        "[sandbox]\nuploads_dir = \"../outside\"\n",
    ] {
        let file = write_config(contents);
        assert!(
            matches!(Config::load_from_path(file.path()), Err(EngineError::Config(_))),
            "{contents:?} should be rejected"
        );
    }
}

#[test]
fn test_malformed_toml_rejected() {
    let file = write_config("[llm\nmodel = ");
    assert!(matches!(
        Config::load_from_path(file.path()),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load_from_path(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[test]
fn test_serialized_config_reloads() {
    let config = Config::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let file = write_config(&rendered);

    let reloaded = Config::load_from_path(file.path()).unwrap();
    assert_eq!(reloaded.llm.model, config.llm.model);
    assert_eq!(reloaded.sandbox.api_url, config.sandbox.api_url);
}
