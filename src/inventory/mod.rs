//! Inventory reporting for the Ollama daemon
//!
//! Read-only views of daemon state: liveness and version, installed models,
//! and per-model health. Nothing here mutates the daemon.

use crate::errors::Result;
use crate::models::client::{DEFAULT_PROBE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
use crate::models::{DaemonApi, DaemonInfo, HealthMap, ModelDescriptor, OllamaModelClient};
use crate::provision::normalize_model_name;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Reports what the daemon is running and whether its models respond
#[derive(Clone)]
pub struct InventoryReporter {
    daemon: Arc<dyn DaemonApi>,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl InventoryReporter {
    pub fn new(daemon: Arc<dyn DaemonApi>) -> Self {
        Self {
            daemon,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Timeouts for clients built against an explicit `check_health` host
    pub fn with_timeouts(mut self, request_timeout: Duration, probe_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self.probe_timeout = probe_timeout;
        self
    }

    /// Check daemon liveness and collect its version and model names.
    ///
    /// `host` targets a different daemon than the one this reporter wraps.
    /// An unreachable daemon is a `Connection` error; a missing version is not.
    pub async fn check_health(&self, host: Option<&str>) -> Result<DaemonInfo> {
        let daemon: Arc<dyn DaemonApi> = match host {
            Some(host) => Arc::new(self.client_for(host)?),
            None => Arc::clone(&self.daemon),
        };

        let models = daemon.list_models().await?;
        let version = match daemon.version().await {
            Ok(version) => Some(version),
            Err(e) => {
                debug!(error = %e, "daemon did not report a version");
                None
            }
        };

        Ok(DaemonInfo {
            models: models.into_iter().map(|m| m.name).collect(),
            version,
        })
    }

    /// Models currently installed, re-fetched on every call
    pub async fn list_installed_models(&self) -> Result<Vec<ModelDescriptor>> {
        let models = self.daemon.list_models().await?;
        Ok(models.iter().map(ModelDescriptor::from).collect())
    }

    /// Probe each named model. Never fails: anything absent, unreachable or
    /// erroring maps to `false`.
    pub async fn get_model_health(&self, models: &[String]) -> HealthMap {
        let installed: HashSet<String> = match self.daemon.list_models().await {
            Ok(list) => list.into_iter().map(|m| normalize_model_name(&m.name)).collect(),
            Err(e) => {
                warn!(error = %e, "cannot list models; marking all unhealthy");
                return models.iter().map(|m| (m.clone(), false)).collect();
            }
        };

        let probes = models.iter().map(|name| {
            let daemon = Arc::clone(&self.daemon);
            let present = installed.contains(&normalize_model_name(name));
            async move {
                if !present {
                    return (name.clone(), false);
                }
                match daemon.probe_model(name).await {
                    Ok(()) => (name.clone(), true),
                    Err(e) => {
                        warn!(model = %name, error = %e, "health probe failed");
                        (name.clone(), false)
                    }
                }
            }
        });

        join_all(probes).await.into_iter().collect()
    }

    fn client_for(&self, host: &str) -> Result<OllamaModelClient> {
        OllamaModelClient::with_timeouts(
            Some(host.to_string()),
            self.request_timeout,
            self.probe_timeout,
        )
    }

    /// Quick reachability check
    pub async fn is_available(&self) -> bool {
        self.daemon.version().await.is_ok()
    }
}
