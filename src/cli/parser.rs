//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Notification dispatch and store proximity service
#[derive(Parser, Debug)]
#[command(name = "basket-rs")]
#[command(about = "Notification dispatch and store proximity service")]
#[command(long_about = "
basket-rs runs the scheduled notification dispatcher behind a small HTTP API:
an external trigger (or the built-in cron schedule) moves due push and email
jobs through the channel senders, and the geo endpoints plan store routes and
check geofences.

EXAMPLES:
    # Start the server with default configuration
    basket-rs serve

    # Start server on all interfaces, port 8080
    basket-rs serve --host 0.0.0.0 --port 8080

    # Use a specific configuration file
    basket-rs --config /etc/basket/production.toml serve

    # Run one dispatch batch and exit (for an external scheduler)
    basket-rs --env production dispatch

    # Show which jobs are due without claiming them
    basket-rs dispatch --dry-run

    # Apply or preview database migrations
    basket-rs migrate
    basket-rs migrate --dry-run

    # Rollback the last migration
    basket-rs migrate --rollback 1
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Subcommand to execute (defaults to serve)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Load this TOML file instead of the config directory layers.
    /// Environment variables (BASKET_*) still apply on top.
    ///
    /// Example: --config /etc/basket/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection (BASKET_APP_ENV)
    ///
    /// Selects which `config/{env}.toml` layer is loaded.
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    ///
    /// Serves the trigger, scheduling and geo endpoints. When `dispatch.enabled`
    /// is set the cron trigger runs in-process as well.
    ///
    /// Examples:
    ///   basket-rs serve                            # Start with defaults
    ///   basket-rs serve --host 0.0.0.0 --port 80   # Bind to all interfaces on port 80
    ///   basket-rs serve --dry-run                  # Validate config without starting
    Serve {
        /// Host address to bind to
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        /// Port number to listen on
        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        /// Log level override; wins over --verbose/--quiet
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one dispatch batch and exit
    ///
    /// Uses the same claim and recovery rules as the HTTP trigger. Exits
    /// non-zero only when the batch could not run at all.
    ///
    /// Examples:
    ///   basket-rs dispatch                    # Process up to dispatch.batch_size due jobs
    ///   basket-rs dispatch --batch-size 50    # Larger batch for a backlog
    ///   basket-rs dispatch --dry-run          # List due jobs, change nothing
    Dispatch {
        /// List due jobs without claiming or sending them
        #[arg(long)]
        dry_run: bool,

        /// Override dispatch.batch_size for this run (1-100)
        #[arg(long, value_name = "N", value_parser = super::validation::validate_batch_size)]
        batch_size: Option<u32>,
    },
    /// Database migration operations
    ///
    /// Examples:
    ///   basket-rs migrate                    # Apply all pending migrations
    ///   basket-rs migrate --dry-run          # Show pending migrations without applying
    ///   basket-rs migrate --rollback 1       # Rollback the last migration
    Migrate {
        /// Show pending migrations without applying
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Number of migrations to rollback (1-100)
        #[arg(long, value_name = "STEPS", conflicts_with = "dry_run", value_parser = super::validation::validate_rollback_steps)]
        rollback: Option<u32>,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}
