//! Ollama daemon access
//!
//! This module provides the pieces every higher layer builds on:
//! - The `DaemonApi` seam
//! - The reqwest-backed `OllamaModelClient`
//! - NDJSON decoding for pull progress
//! - Model and progress types

pub mod api;
pub mod client;
pub mod stream;
pub mod types;

// Re-export key types for convenience
pub use api::{DaemonApi, ProgressSink};
pub use client::OllamaModelClient;
pub use types::{DaemonInfo, HealthMap, ModelDescriptor, ModelInfo, ProgressEvent};
