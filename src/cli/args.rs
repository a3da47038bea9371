//! CLI argument definitions using clap
//!
//! Commands:
//! - replica-server init --config <path>
//! - replica-server start --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// replica-server - tracks snapshot and delta replicas of geospatial layers
#[derive(Parser, Debug)]
#[command(name = "replica-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration if missing and create the database schema
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./replica-server.json")]
        config: PathBuf,
    },

    /// Start the HTTP server
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./replica-server.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
