//! CLI command implementations
//!
//! Boot sequence for `start`:
//! 1. Configuration load
//! 2. Logging
//! 3. Store connect (schema created if missing)
//! 4. HTTP serving until Ctrl-C

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::write_response;
use crate::http_server::HttpServer;
use crate::log_event;
use crate::observability::{init_logging, Event, ObservabilityError};
use crate::store::{SqliteStore, StoreHandle};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Start { config } => start(&config),
    }
}

/// A second initialization in the same process keeps the first subscriber.
fn install_logging(config: &Config) -> CliResult<()> {
    match init_logging(&config.logging) {
        Ok(()) | Err(ObservabilityError::AlreadyInitialized(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

/// Write a default configuration if none exists and create the schema.
///
/// Running it twice is harmless.
pub fn init(config_path: &Path) -> CliResult<()> {
    let written = Config::write_default(config_path)?;
    let config = Config::load(config_path)?;
    install_logging(&config)?;

    let path = config_path.display().to_string();
    if written {
        log_event!(Event::ConfigWritten, path = %path);
    }

    runtime()?.block_on(async {
        let store = SqliteStore::connect(&config.database).await?;
        store.pool().close().await;
        CliResult::Ok(())
    })?;
    log_event!(Event::StoreConnected, url = %config.database.url);

    write_response(json!({
        "initialized": true,
        "config": path,
        "config_written": written,
        "database": config.database.url,
    }))
}

/// Start the replica server and serve until Ctrl-C
pub fn start(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    install_logging(&config)?;

    log_event!(Event::BootStart);
    log_event!(Event::ConfigLoaded, path = %config_path.display());

    runtime()?.block_on(async move {
        let store = Arc::new(SqliteStore::connect(&config.database).await?);
        log_event!(Event::StoreConnected, url = %config.database.url);

        let handle = StoreHandle::new(store.clone());
        let server = HttpServer::with_config(config.server, &handle, config.object_storage);
        log_event!(Event::BootComplete);

        server
            .start_with_shutdown(shutdown_signal())
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))?;

        store.pool().close().await;
        log_event!(Event::ShutdownComplete);
        CliResult::Ok(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C, shutting down");
    }
    log_event!(Event::ShutdownStart);
}
