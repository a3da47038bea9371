//! CLI module for replica-server
//!
//! Provides command-line interface for:
//! - init: Write a default configuration and create the schema
//! - start: Boot the store and serve HTTP

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{init, run, run_command, start};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_response, write_response_to};
