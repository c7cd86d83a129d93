// rinterp
// Main entry point for the rinterp binary

use anyhow::Context;
use clap::Parser;
use rinterp_engine::cli::{Cli, Command, ConfigAction};
use rinterp_engine::config::Config;
use rinterp_engine::handlers::{
    error_hint, handle_ask, handle_config_show, handle_exec, handle_info, OutputFormat,
};
use rinterp_engine::secrets::Credentials;
use rinterp_engine::server::{serve, shutdown_signal};
use rinterp_engine::services::Services;
use rinterp_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    run(cli).await.inspect_err(|err| {
        if let Some(hint) = error_hint(err) {
            eprintln!("Hint: {}", hint);
        }
    })
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let mut config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    if let Some(level) = &cli.log {
        config.core.log_level = level.clone();
        config.validate()?;
    }

    // RUST_LOG still takes precedence over the configured level
    init_telemetry_with_level(&config.core.log_level);

    tracing::info!("rinterp v{}", env!("CARGO_PKG_VERSION"));

    if let Command::Config {
        action: ConfigAction::Show,
    } = &cli.command
    {
        return handle_config_show(&config, format);
    }

    if let Command::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    let credentials = Credentials::from_env().context("Credentials are not configured")?;
    let services = Services::build(config, credentials)?;

    match cli.command {
        Command::Serve { .. } => {
            serve(services, shutdown_signal()).await?;
            Ok(())
        }

        Command::Ask {
            message,
            conversation,
        } => handle_ask(&services, &message, conversation.as_deref(), format).await,

        Command::Exec { file, timeout_ms } => {
            handle_exec(&services, &file, timeout_ms, format).await
        }

        Command::Info => handle_info(&services, format).await,

        Command::Config { .. } => Ok(()),
    }
}
