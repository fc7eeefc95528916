//! Daemon API seam
//!
//! Everything above the HTTP layer talks to the daemon through this trait,
//! so the reporter and provisioner can run against any implementation.

use crate::errors::Result;
use crate::models::types::{ModelInfo, ProgressEvent};
use async_trait::async_trait;

/// Synchronous progress sink invoked once per daemon event, in receipt order
pub type ProgressSink<'a> = &'a mut (dyn FnMut(&ProgressEvent) + Send);

/// Operations exposed by a model-serving daemon
#[async_trait]
pub trait DaemonApi: Send + Sync {
    /// Base URL this daemon is reached at
    fn base_url(&self) -> &str;

    /// Daemon version string
    async fn version(&self) -> Result<String>;

    /// All installed models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Download a model, streaming every progress event to `on_progress`.
    /// Returns once the daemon reports success.
    async fn pull_model(&self, name: &str, on_progress: ProgressSink<'_>) -> Result<()>;

    /// Delete an installed model
    async fn delete_model(&self, name: &str) -> Result<()>;

    /// Trivial liveness probe: load the model without generating anything
    async fn probe_model(&self, name: &str) -> Result<()>;
}
