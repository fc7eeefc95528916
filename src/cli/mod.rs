//! CLI module for ollamactl
//!
//! Handles command-line argument parsing and logging setup.

pub mod args;
pub mod logging;
pub mod report;

pub use args::{Args, Commands, Verbosity};
