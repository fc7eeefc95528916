//! Command-line argument parsing for ollamactl
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ollamactl - Inspect and provision models on a local Ollama daemon
#[derive(Parser, Debug)]
#[command(name = "ollamactl")]
#[command(version)]
#[command(about = "Health checks, model inventory and provisioning for a local Ollama daemon", long_about = None)]
pub struct Args {
    /// Ollama host (overrides config and OLLAMA_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Ollama port (overrides config and OLLAMA_HOST)
    #[arg(long, global = true)]
    pub port: Option<u16>,

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
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Check the daemon is up and report its version and models
    Health,

    /// List installed models
    #[command(alias = "ls")]
    List,

    /// Probe required and installed models
    Status,

    /// Download a model
    Pull {
        /// Model name (e.g. llama3.1:8b)
        name: String,

        /// Additional attempts on transient failure
        #[arg(long)]
        retries: Option<u32>,

        /// Skip the free-space check
        #[arg(long)]
        no_disk_check: bool,
    },

    /// Remove a model
    #[command(alias = "remove")]
    Rm {
        /// Model name
        name: String,

        /// Succeed when the model is already absent
        #[arg(long)]
        idempotent: bool,
    },

    /// Pull any required model that is not installed
    Ensure {
        /// Models to require (defaults to provision.required_models)
        models: Vec<String>,
    },

    /// Estimate a model's download size
    Estimate {
        /// Model name
        name: String,
    },

    /// Show free disk space for the model store
    Disk {
        /// Path to check (defaults to the Ollama models directory)
        path: Option<PathBuf>,
    },

    /// Display current configuration
    Config,
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
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default tracing filter for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}
