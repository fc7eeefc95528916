//! ollamactl - model inventory and provisioning for a local Ollama daemon
//!
//! # Architecture
//!
//! - **models**: `DaemonApi` seam, reqwest client, NDJSON progress decoding
//! - **inventory**: liveness, version, installed models, per-model health
//! - **provision**: retried pulls, removal, reconciliation, size and disk checks
//! - **config** / **cli**: TOML configuration, clap arguments, logging

pub mod errors;
pub mod models;
pub mod inventory;
pub mod provision;
pub mod config;
pub mod cli;

// Re-export commonly used types
pub use errors::{ModelFailure, ProvisionError, Result};
pub use inventory::InventoryReporter;
pub use provision::{ModelProvisioner, ProvisionReport, PullOptions, RemovePolicy, RetryPolicy};

/// Exit code when the daemon is not reachable
pub const EXIT_CODE_SETUP_NEEDED: i32 = 2;
