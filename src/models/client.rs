//! Ollama API client for model management operations
//!
//! This module provides a low-level HTTP client for interacting with
//! the Ollama API endpoints for model management.

use crate::errors::{ProvisionError, Result};
use crate::models::api::{DaemonApi, ProgressSink};
use crate::models::stream::NdjsonDecoder;
use crate::models::types::{ModelInfo, ModelsResponse, ProgressEvent, VersionResponse};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Timeout for non-streaming requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a liveness probe (model load can be slow)
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for Ollama API
#[derive(Debug, Clone)]
pub struct OllamaModelClient {
    client: Client,
    base_url: String,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl OllamaModelClient {
    /// Create a new Ollama model client
    ///
    /// # Arguments
    /// * `base_url` - Base URL for Ollama API (default: http://127.0.0.1:11434)
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_timeouts(base_url, DEFAULT_REQUEST_TIMEOUT, DEFAULT_PROBE_TIMEOUT)
    }

    /// Create a client with explicit request and probe timeouts.
    ///
    /// Pulls are never bounded by `request_timeout`; a large model can
    /// stream for far longer than any sensible request deadline.
    pub fn with_timeouts(
        base_url: Option<String>,
        request_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProvisionError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url
            .map(|url| normalize_base_url(&url))
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client,
            base_url,
            request_timeout,
            probe_timeout,
        })
    }

    /// Check if Ollama server is available
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn probe(&self, path: &str, name: &str, body: serde_json::Value) -> Result<Response> {
        let url = self.url(path);
        debug!(%url, model = name, "probing model");

        self.client
            .post(&url)
            .timeout(self.probe_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| connection_error(e, self.probe_timeout))
    }
}

#[async_trait]
impl DaemonApi for OllamaModelClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn version(&self) -> Result<String> {
        let url = self.url("/api/version");
        debug!(%url, "querying daemon version");

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| connection_error(e, self.request_timeout))?;

        if !response.status().is_success() {
            return Err(ProvisionError::Protocol(format!(
                "GET /api/version returned {}",
                response.status()
            )));
        }

        let version: VersionResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::Protocol(format!("Failed to parse version: {}", e)))?;

        Ok(version.version)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.url("/api/tags");
        debug!(%url, "listing installed models");

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| connection_error(e, self.request_timeout))?;

        if !response.status().is_success() {
            return Err(ProvisionError::Protocol(format!(
                "GET /api/tags returned {}",
                response.status()
            )));
        }

        let models_response: ModelsResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::Protocol(format!("Failed to parse model list: {}", e)))?;

        Ok(models_response.models)
    }

    async fn pull_model(&self, name: &str, on_progress: ProgressSink<'_>) -> Result<()> {
        let url = self.url("/api/pull");
        info!(model = name, "pulling model");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "name": name, "stream": true }))
            .send()
            .await
            .map_err(|e| connection_error(e, CONNECT_TIMEOUT))?;

        if !response.status().is_success() {
            return Err(pull_status_error(name, response).await);
        }

        let mut stream = response.bytes_stream();
        let mut decoder = NdjsonDecoder::new();
        let mut succeeded = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProvisionError::Download {
                attempts: 1,
                reason: format!("stream interrupted: {}", e),
            })?;

            for event in decoder.push(&chunk)? {
                succeeded |= deliver(name, &event, &mut *on_progress)?;
            }
        }

        if let Some(event) = decoder.finish()? {
            succeeded |= deliver(name, &event, &mut *on_progress)?;
        }

        if !succeeded {
            return Err(ProvisionError::Download {
                attempts: 1,
                reason: "stream ended before the daemon reported success".to_string(),
            });
        }

        info!(model = name, "pull complete");
        Ok(())
    }

    async fn delete_model(&self, name: &str) -> Result<()> {
        let url = self.url("/api/delete");
        debug!(%url, model = name, "deleting model");

        let response = self
            .client
            .delete(&url)
            .timeout(self.request_timeout)
            .json(&json!({ "name": name }))
            .send()
            .await
            .map_err(|e| connection_error(e, self.request_timeout))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(ProvisionError::NotFound(name.to_string())),
            s => Err(ProvisionError::Protocol(format!(
                "DELETE /api/delete returned {}",
                s
            ))),
        }
    }

    async fn probe_model(&self, name: &str) -> Result<()> {
        let response = self
            .probe("/api/generate", name, json!({ "model": name, "prompt": "", "stream": false }))
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(ProvisionError::NotFound(name.to_string())),
            StatusCode::BAD_REQUEST => {
                let message = error_message(response).await;
                if !is_generate_unsupported(&message) {
                    return Err(ProvisionError::Protocol(format!(
                        "POST /api/generate rejected {}: {}",
                        name, message
                    )));
                }

                // Embedding-only models can't generate; load them through embed instead
                debug!(model = name, "model does not generate, probing via embed");
                let response = self
                    .probe("/api/embed", name, json!({ "model": name, "input": "" }))
                    .await?;
                match response.status() {
                    s if s.is_success() => Ok(()),
                    StatusCode::NOT_FOUND => Err(ProvisionError::NotFound(name.to_string())),
                    s => Err(ProvisionError::Protocol(format!("POST /api/embed returned {}", s))),
                }
            }
            s => Err(ProvisionError::Protocol(format!(
                "POST /api/generate returned {}",
                s
            ))),
        }
    }
}

/// Ollama answers generate requests for embedding models with
/// `"<model>" does not support generate`
fn is_generate_unsupported(message: &str) -> bool {
    message.to_lowercase().contains("does not support generate")
}

/// The `error` field of a JSON error body, or the raw body
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| if body.is_empty() { format!("HTTP {}", status) } else { body })
}

/// Hand one event to the caller. Returns true for the terminal success event.
fn deliver<F>(name: &str, event: &ProgressEvent, on_progress: &mut F) -> Result<bool>
where
    F: FnMut(&ProgressEvent) + ?Sized,
{
    if let Some(message) = event.error() {
        return Err(classify_pull_error(name, message));
    }
    on_progress(event);
    Ok(event.is_success())
}

/// Map a daemon-reported pull error onto the taxonomy
pub fn classify_pull_error(name: &str, message: &str) -> ProvisionError {
    let lower = message.to_lowercase();
    if lower.contains("not found") || lower.contains("does not exist") {
        ProvisionError::NotFound(name.to_string())
    } else {
        ProvisionError::Download {
            attempts: 1,
            reason: message.to_string(),
        }
    }
}

async fn pull_status_error(name: &str, response: Response) -> ProvisionError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return ProvisionError::NotFound(name.to_string());
    }

    let message = error_message(response).await;
    classify_pull_error(name, &message)
}

fn connection_error(err: reqwest::Error, timeout: Duration) -> ProvisionError {
    if err.is_timeout() {
        ProvisionError::Timeout {
            duration_ms: timeout.as_millis() as u64,
        }
    } else {
        ProvisionError::Connection(err.to_string())
    }
}

/// Accept `host:port`, `http://host:port`, with or without a trailing slash
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaModelClient::new(None).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_client_custom_url() {
        let client = OllamaModelClient::new(Some("http://localhost:8080/".to_string())).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("0.0.0.0:11434"), "http://0.0.0.0:11434");
        assert_eq!(normalize_base_url("https://gpu-box:443/"), "https://gpu-box:443");
        assert_eq!(normalize_base_url(" http://127.0.0.1:11434 "), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_classify_pull_error() {
        assert!(matches!(
            classify_pull_error("nope", "pull model manifest: file does not exist"),
            ProvisionError::NotFound(name) if name == "nope"
        ));
        assert!(matches!(
            classify_pull_error("m", "model 'm' not found"),
            ProvisionError::NotFound(_)
        ));
        assert!(matches!(
            classify_pull_error("m", "unexpected EOF"),
            ProvisionError::Download { attempts: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_connection_error() {
        // Port 9 (discard) is essentially never bound locally
        let client = OllamaModelClient::new(Some("http://127.0.0.1:9".to_string())).unwrap();
        assert!(!client.is_available().await);

        let err = client.list_models().await.unwrap_err();
        assert!(matches!(err, ProvisionError::Connection(_)), "got {:?}", err);
    }

    #[tokio::test]
    #[ignore] // Requires Ollama running
    async fn test_list_models_integration() {
        let client = OllamaModelClient::new(None).unwrap();
        assert!(client.list_models().await.is_ok());
    }
}
