//! Command handlers for CLI operations
//!
//! - ask: run one conversation turn
//! - exec: run an R script directly
//! - info: describe the sandbox
//! - config show: print the effective configuration

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

use crate::config::Config;
use crate::secrets::{ANTHROPIC_API_KEY_ENV, E2B_API_KEY_ENV};
use crate::services::Services;
use sdk::{EngineError, EngineErrorExt, ExecutionResult};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// User hint for a failed command, when the failure came from the engine
pub fn error_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<EngineError>())
        .map(EngineError::user_hint)
}

/// Send one message and print the assistant's turn
pub async fn handle_ask(
    services: &Services,
    message: &str,
    conversation: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let result = services
        .orchestrator
        .process_turn(conversation, message)
        .await;
    services.shutdown().await;
    let (conversation, response) = result.context("Conversation turn failed")?;

    match format {
        OutputFormat::Text => {
            println!("{}", response.message);
            if let Some(execution) = &response.execution_results {
                println!();
                print_execution(execution);
            }
            println!();
            println!("Conversation: {}", conversation.id);
        }
        OutputFormat::Json => {
            let output = json!({
                "conversation_id": conversation.id,
                "response": response,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Run an R script file in the sandbox and print the result
pub async fn handle_exec(
    services: &Services,
    file: &Path,
    timeout_ms: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let result = services.harvester.run_and_harvest(&code, timeout_ms).await;
    services.shutdown().await;

    match format {
        OutputFormat::Text => print_execution(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if let Some(error) = result.error {
        anyhow::bail!("Execution failed: {}", error);
    }
    Ok(())
}

/// Print the sandbox's R version and packages
pub async fn handle_info(services: &Services, format: OutputFormat) -> Result<()> {
    let info = services.sandbox.info().await;
    services.shutdown().await;

    match format {
        OutputFormat::Text => {
            if let Some(error) = &info.error {
                anyhow::bail!("Could not query sandbox: {}", error);
            }
            println!("R Version:   {}", info.r_version.as_deref().unwrap_or("unknown"));
            println!("System Info: {}", info.system_info.as_deref().unwrap_or("unknown"));
            let packages = info.installed_packages.unwrap_or_default();
            println!("Packages:    {} installed", packages.len());
            for package in packages {
                println!("  {}", package);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
    }
    Ok(())
}

/// Print the effective configuration. Credentials only show whether they are set.
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    let credential_status = |name: &str| {
        if std::env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false) {
            "set"
        } else {
            "missing"
        }
    };

    match format {
        OutputFormat::Text => {
            let rendered =
                toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            println!("{}", rendered);
            println!("# {}: {}", ANTHROPIC_API_KEY_ENV, credential_status(ANTHROPIC_API_KEY_ENV));
            println!("# {}: {}", E2B_API_KEY_ENV, credential_status(E2B_API_KEY_ENV));
        }
        OutputFormat::Json => {
            let output = json!({
                "config": config,
                "credentials": {
                    ANTHROPIC_API_KEY_ENV: credential_status(ANTHROPIC_API_KEY_ENV),
                    E2B_API_KEY_ENV: credential_status(E2B_API_KEY_ENV),
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_execution(result: &ExecutionResult) {
    let stdout = result.stdout_text();
    if !stdout.is_empty() {
        print!("{}", stdout);
        if !stdout.ends_with('\n') {
            println!();
        }
    }
    for line in &result.stderr {
        eprint!("{}", line);
    }
    if let Some(error) = &result.error {
        println!("✗ {}", error);
    }
    for plot in &result.plots {
        println!("Plot: {} ({}, {} base64 chars)", plot.filename, plot.mime_type, plot.content.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_hint_through_context() {
        let err = anyhow::Error::new(EngineError::MissingCredential("E2B_API_KEY".into()))
            .context("Credentials are not configured");
        assert_eq!(
            error_hint(&err),
            Some("Set the required API key in the environment")
        );
    }

    #[test]
    fn test_error_hint_absent_for_other_errors() {
        let err = anyhow::anyhow!("script file is empty");
        assert!(error_hint(&err).is_none());
    }
}
