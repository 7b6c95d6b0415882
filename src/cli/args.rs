//! Command-line argument parsing for HomeOps Doctor
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// HomeOps Doctor - find out what is broken in your Home Assistant, and where to start
#[derive(Parser, Debug)]
#[command(name = "homeops-doctor")]
#[command(version)]
#[command(about = "Read-only health doctor for Home Assistant", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch state from the hub once and print the report
    Report {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Registry export (devices/integrations JSON) for causal grouping
        #[arg(long)]
        registry: Option<PathBuf>,
    },

    /// Analyze a saved snapshot or /api/states dump without contacting the hub
    Analyze {
        /// Snapshot JSON file
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// Registry export (devices/integrations JSON) for causal grouping
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Analysis clock (RFC 3339), for reproducible output
        #[arg(long, value_name = "TIMESTAMP")]
        at: Option<String>,
    },

    /// Poll the hub and serve the report over HTTP
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Display current configuration
    Config {
        /// Write the default configuration to the standard location
        #[arg(long)]
        init: bool,
    },
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal summary
    Text,
    Json,
    Markdown,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default log filter for this verbosity
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn,homeops_doctor=info",
            Verbosity::Verbose => "info,homeops_doctor=debug",
            Verbosity::VeryVerbose => "debug,homeops_doctor=trace",
        }
    }
}
