//! CLI argument definitions for logpilot-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Logpilot config sync daemon.
///
/// Keeps per-container log-shipper configuration files synchronized with
/// the live set of containers on this host.
#[derive(Parser, Debug)]
#[command(name = "logpilot-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to logpilot.toml configuration file.
    #[arg(short, long, default_value = "/etc/logpilot/logpilot.toml")]
    pub config: PathBuf,

    /// Override the shipper config template path.
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and template, then exit without starting.
    #[arg(long)]
    pub validate: bool,
}
