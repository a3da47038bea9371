//! Observability for the replica service
//!
//! Structured logging through `tracing`:
//! - A typed [`Event`] vocabulary for lifecycle and replica write events
//! - [`ObservationScope`] for begin/complete/error logging around an operation
//! - [`init_logging`] to install the subscriber from configuration
//!
//! # Usage
//!
//! ```ignore
//! use replica_server::log_event;
//! use replica_server::observability::{Event, ObservationScope};
//!
//! log_event!(Event::ReplicaCreated, replica_id = %id, layer_id);
//!
//! let scope = ObservationScope::new("DELETE_REPLICAS");
//! // ... do work ...
//! scope.complete_with_count(deleted);
//! ```

mod events;
mod scope;

pub use events::Event;
pub use scope::ObservationScope;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Logging section of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `replica_server=debug,sqlx=warn`
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Observability error. Never fatal to request handling.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Invalid log filter {0:?}: {1}")]
    InvalidFilter(String, String),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

pub type ObservabilityResult<T> = Result<T, ObservabilityError>;

/// Install the global subscriber. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> ObservabilityResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| ObservabilityError::InvalidFilter(config.level.clone(), e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ObservabilityError::AlreadyInitialized(e.to_string()))
}

/// Log a lifecycle [`Event`] at info, or warn for warning events.
///
/// Trailing arguments are `tracing` fields and stay separate keys in the output:
/// `log_event!(Event::FileCreated, replica_id = %replica_id, file_id = %file_id)`.
#[macro_export]
macro_rules! log_event {
    ($event:expr) => {{
        let event: $crate::observability::Event = $event;
        if event.is_warning() {
            ::tracing::warn!(event = event.as_str());
        } else {
            ::tracing::info!(event = event.as_str());
        }
    }};
    ($event:expr, $($fields:tt)+) => {{
        let event: $crate::observability::Event = $event;
        if event.is_warning() {
            ::tracing::warn!(event = event.as_str(), $($fields)+);
        } else {
            ::tracing::info!(event = event.as_str(), $($fields)+);
        }
    }};
}
