//! Error types for ollamactl
//!
//! One taxonomy covers every daemon and filesystem failure so callers can
//! decide between retrying, reporting, and giving up.

use std::fmt;
use thiserror::Error;

/// A single model that could not be provisioned
#[derive(Debug)]
pub struct ModelFailure {
    pub model: String,
    pub error: ProvisionError,
}

impl fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.model, self.error)
    }
}

/// Main error type for daemon and provisioning operations
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Daemon unreachable or transport-level failure
    #[error("Cannot reach Ollama: {0}")]
    Connection(String),

    /// Malformed or unexpected response shape
    #[error("Unexpected response from Ollama: {0}")]
    Protocol(String),

    /// Referenced model does not exist
    #[error("Model '{0}' not found")]
    NotFound(String),

    /// Transport failure during a pull, or retries exhausted
    #[error("Download failed after {attempts} attempt(s): {reason}")]
    Download { attempts: u32, reason: String },

    /// Disk-space query failed
    #[error("Filesystem error: {0}")]
    Filesystem(String),

    /// Not enough room for the model
    #[error("Insufficient disk space: need ~{required} bytes, {available} available")]
    InsufficientDiskSpace { required: u64, available: u64 },

    /// Operation timed out
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more required models could not be provisioned
    #[error("{} required model(s) could not be provisioned: {}", .0.len(), format_failures(.0))]
    Aggregate(Vec<ModelFailure>),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Whether a retry might succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProvisionError::Connection(_)
                | ProvisionError::Download { .. }
                | ProvisionError::Timeout { .. }
        )
    }

    /// Model names carried by an aggregate error
    pub fn failed_models(&self) -> Vec<&str> {
        match self {
            ProvisionError::Aggregate(failures) => {
                failures.iter().map(|f| f.model.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn format_failures(failures: &[ModelFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProvisionError::Download {
            attempts: 4,
            reason: "connection reset".to_string(),
        };
        assert!(err.to_string().contains("4 attempt"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProvisionError::Connection("refused".into()).is_transient());
        assert!(ProvisionError::Timeout { duration_ms: 10 }.is_transient());
        assert!(ProvisionError::Download { attempts: 1, reason: "x".into() }.is_transient());
        assert!(!ProvisionError::NotFound("m".into()).is_transient());
        assert!(!ProvisionError::Protocol("bad".into()).is_transient());
        assert!(!ProvisionError::InsufficientDiskSpace { required: 2, available: 1 }.is_transient());
    }

    #[test]
    fn test_aggregate_names_every_model() {
        let err = ProvisionError::Aggregate(vec![
            ModelFailure {
                model: "llama3.2:3b".to_string(),
                error: ProvisionError::NotFound("llama3.2:3b".to_string()),
            },
            ModelFailure {
                model: "nomic-embed-text".to_string(),
                error: ProvisionError::Connection("refused".to_string()),
            },
        ]);

        let message = err.to_string();
        assert!(message.starts_with("2 required model(s)"));
        assert!(message.contains("llama3.2:3b"));
        assert!(message.contains("nomic-embed-text"));
        assert_eq!(err.failed_models(), vec!["llama3.2:3b", "nomic-embed-text"]);
    }
}
