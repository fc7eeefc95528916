//! Type definitions for Ollama model management
//!
//! This module defines the core data structures for interacting with
//! the Ollama API and reporting model state to callers.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Per-model liveness, keyed by model name
pub type HealthMap = HashMap<String, bool>;

/// Raw model record as returned by `/api/tags`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name (e.g., "llama3.1:8b")
    pub name: String,

    /// Model size in bytes
    #[serde(default)]
    pub size: u64,

    /// Last modification time, RFC 3339
    #[serde(default)]
    pub modified_at: String,

    /// Model digest/hash
    #[serde(default)]
    pub digest: String,

    /// Model details (optional, from API)
    #[serde(default)]
    pub details: Option<ModelDetails>,
}

/// Detailed model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub family: Option<String>,

    /// Parameter size (e.g., "7B", "13B")
    #[serde(default)]
    pub parameter_size: Option<String>,

    /// Quantization level (e.g., "Q4_0", "Q4_K_M")
    #[serde(default)]
    pub quantization_level: Option<String>,
}

/// Response from Ollama /api/tags endpoint
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Response from Ollama /api/version endpoint
#[derive(Debug, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Snapshot of one installed model, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    pub name: String,
    /// Human-readable size (e.g., "4.36 GB")
    pub size: String,
    pub modified: String,
}

/// Daemon self-reported state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DaemonInfo {
    /// Installed model names, in daemon order
    pub models: Vec<String>,
    /// None when the daemon does not expose a version
    pub version: Option<String>,
}

/// One progress update streamed by the daemon during a pull.
///
/// The payload is daemon-defined and passed through untouched; the accessors
/// only read the fields Ollama is known to send.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressEvent(pub Map<String, Value>);

impl ProgressEvent {
    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(Value::as_str)
    }

    pub fn digest(&self) -> Option<&str> {
        self.0.get("digest").and_then(Value::as_str)
    }

    pub fn total(&self) -> Option<u64> {
        self.0.get("total").and_then(Value::as_u64)
    }

    pub fn completed(&self) -> Option<u64> {
        self.0.get("completed").and_then(Value::as_u64)
    }

    /// Error message the daemon embedded in the stream, if any
    pub fn error(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }

    /// True for the terminal `{"status":"success"}` event
    pub fn is_success(&self) -> bool {
        self.status() == Some("success")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Map<String, Value>> for ProgressEvent {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl ModelInfo {
    /// Format the model size in human-readable format
    pub fn formatted_size(&self) -> String {
        format_size(self.size)
    }

    /// Modification time as `YYYY-MM-DD HH:MM`, or the raw value if unparseable
    pub fn formatted_modified(&self) -> String {
        match DateTime::parse_from_rfc3339(&self.modified_at) {
            Ok(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
            Err(_) => self.modified_at.clone(),
        }
    }

    /// Get a short description of the model
    pub fn description(&self) -> String {
        if let Some(ref details) = self.details {
            let parts: Vec<&str> = [&details.parameter_size, &details.quantization_level]
                .into_iter()
                .filter_map(|p| p.as_deref())
                .collect();

            if !parts.is_empty() {
                return parts.join(" ");
            }
        }

        self.formatted_size()
    }
}

impl From<&ModelInfo> for ModelDescriptor {
    fn from(info: &ModelInfo) -> Self {
        Self {
            name: info.name.clone(),
            size: info.formatted_size(),
            modified: info.formatted_modified(),
        }
    }
}

impl fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.size)
    }
}

/// Format bytes into human-readable size
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base: f64 = 1024.0;
    let exponent = (bytes as f64).log(base).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let size = bytes as f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(size: u64, modified_at: &str) -> ModelInfo {
        ModelInfo {
            name: "test:latest".to_string(),
            size,
            modified_at: modified_at.to_string(),
            digest: "abc123".to_string(),
            details: None,
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5242880), "5.00 MB");
        assert_eq!(format_size(4683087332), "4.36 GB");
    }

    #[test]
    fn test_descriptor_from_info() {
        let descriptor = ModelDescriptor::from(&info(1073741824, "2024-05-01T10:30:00.123456789-07:00"));
        assert_eq!(descriptor.name, "test:latest");
        assert_eq!(descriptor.size, "1.00 GB");
        assert_eq!(descriptor.modified, "2024-05-01 10:30");
    }

    #[test]
    fn test_unparseable_modified_passes_through() {
        assert_eq!(info(0, "yesterday").formatted_modified(), "yesterday");
    }

    #[test]
    fn test_description_with_details() {
        let mut model = info(1073741824, "");
        model.details = Some(ModelDetails {
            format: Some("gguf".to_string()),
            family: Some("llama".to_string()),
            parameter_size: Some("7B".to_string()),
            quantization_level: Some("Q4_K_M".to_string()),
        });
        assert_eq!(model.description(), "7B Q4_K_M");
        assert_eq!(info(1073741824, "").description(), "1.00 GB");
    }

    #[test]
    fn test_tags_response_tolerates_missing_fields() {
        let body = r#"{"models":[{"name":"qwen2.5:7b"}]}"#;
        let parsed: ModelsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.models.len(), 1);
        assert_eq!(parsed.models[0].size, 0);
    }

    #[test]
    fn test_progress_event_accessors() {
        let event: ProgressEvent = serde_json::from_value(json!({
            "status": "pulling 6a0746a1ec1a",
            "digest": "sha256:6a0746a1ec1a",
            "total": 4683087332u64,
            "completed": 1024,
            "extra": true
        }))
        .unwrap();

        assert_eq!(event.status(), Some("pulling 6a0746a1ec1a"));
        assert_eq!(event.digest(), Some("sha256:6a0746a1ec1a"));
        assert_eq!(event.total(), Some(4683087332));
        assert_eq!(event.completed(), Some(1024));
        assert_eq!(event.get("extra"), Some(&json!(true)));
        assert!(!event.is_success());
        assert!(event.error().is_none());
    }
}
