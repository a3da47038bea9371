//! Configuration file
//!
//! A single JSON document with one section per subsystem. Every field has a
//! default, so `{}` is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::http_server::HttpServerConfig;
use crate::object_storage::ObjectStorageConfig;
use crate::observability::LoggingConfig;
use crate::store::StoreConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub database: StoreConfig,

    #[serde(default)]
    pub object_storage: ObjectStorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {:?}: {}", path, e))
        })?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Write the default configuration unless a file already exists at `path`.
    ///
    /// Returns whether a file was written.
    pub fn write_default(path: &Path) -> CliResult<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&Config::default())?;
        fs::write(path, content + "\n")?;
        Ok(true)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.server.port == 0 {
            return Err(CliError::config_error("server.port must be > 0"));
        }

        if self.database.url.trim().is_empty() {
            return Err(CliError::config_error("database.url must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(CliError::config_error("database.max_connections must be > 0"));
        }

        match self.object_storage.protocol.as_str() {
            "http" | "https" => {}
            other => {
                return Err(CliError::config_error(format!(
                    "Invalid object_storage.protocol: '{}'. Must be 'http' or 'https'.",
                    other
                )))
            }
        }
        if self.object_storage.host.trim().is_empty() {
            return Err(CliError::config_error("object_storage.host must not be empty"));
        }
        if self.object_storage.port == 0 {
            return Err(CliError::config_error("object_storage.port must be > 0"));
        }

        Ok(())
    }
}
