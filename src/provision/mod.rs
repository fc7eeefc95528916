//! Model provisioning
//!
//! Pulls, removes and reconciles models against a required set:
//! - Retried pulls with exponential backoff
//! - Disk-space feasibility check before downloading
//! - Aggregated failures when reconciling many models

pub mod disk;
pub mod estimate;
pub mod retry;

pub use disk::{default_models_dir, get_available_disk_space};
pub use estimate::{estimate_model_size, DEFAULT_MODEL_SIZE};
pub use retry::RetryPolicy;

use crate::errors::{ModelFailure, ProvisionError, Result};
use crate::models::{DaemonApi, ProgressEvent, ProgressSink};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};

/// How `remove_model` treats a model that is already gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovePolicy {
    /// Removing an absent model is a `NotFound` error
    #[default]
    Strict,
    /// Removing an absent model succeeds silently
    Idempotent,
}

/// Settings for a single (possibly retried) pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullOptions {
    pub retry: RetryPolicy,
    /// Compare the size estimate with free space before the first attempt
    pub check_disk_space: bool,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            check_disk_space: true,
        }
    }
}

impl PullOptions {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn without_disk_check(mut self) -> Self {
        self.check_disk_space = false;
        self
    }
}

/// Outcome of a successful reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub already_installed: Vec<String>,
    pub pulled: Vec<String>,
}

/// Progress sink for reconciliation: receives the model name with each event
pub type ModelProgressSink<'a> = &'a mut (dyn FnMut(&str, &ProgressEvent) + Send);

/// Free-space lookup used by the pre-pull disk check
pub type SpaceQuery = Arc<dyn Fn(&Path) -> Result<u64> + Send + Sync>;

/// Ensures models are present on the daemon
pub struct ModelProvisioner {
    daemon: Arc<dyn DaemonApi>,
    models_dir: PathBuf,
    remove_policy: RemovePolicy,
    space_query: SpaceQuery,
}

impl ModelProvisioner {
    pub fn new(daemon: Arc<dyn DaemonApi>) -> Self {
        Self {
            daemon,
            models_dir: default_models_dir(),
            remove_policy: RemovePolicy::default(),
            space_query: Arc::new(get_available_disk_space),
        }
    }

    /// Directory whose volume is checked for free space
    pub fn with_models_dir(mut self, models_dir: PathBuf) -> Self {
        self.models_dir = models_dir;
        self
    }

    pub fn with_remove_policy(mut self, policy: RemovePolicy) -> Self {
        self.remove_policy = policy;
        self
    }

    /// Replace the volume free-space lookup
    pub fn with_space_query(mut self, query: SpaceQuery) -> Self {
        self.space_query = query;
        self
    }

    /// Single pull attempt. Events reach `on_progress` in receipt order.
    pub async fn pull_model(&self, name: &str, on_progress: Option<ProgressSink<'_>>) -> Result<()> {
        let mut noop = |_: &ProgressEvent| {};
        let sink: ProgressSink<'_> = match on_progress {
            Some(sink) => sink,
            None => &mut noop,
        };
        self.daemon.pull_model(name, sink).await
    }

    /// Pull with bounded retry on transient failures.
    ///
    /// Every attempt restarts from zero and replays progress from the start.
    /// `NotFound` and other permanent errors return immediately; exhausting
    /// retries yields `Download` carrying the attempt count.
    pub async fn pull_model_with_retry(
        &self,
        name: &str,
        on_progress: Option<ProgressSink<'_>>,
        options: &PullOptions,
    ) -> Result<()> {
        if options.check_disk_space {
            self.ensure_disk_space(name)?;
        }

        let mut noop = |_: &ProgressEvent| {};
        let sink: ProgressSink<'_> = match on_progress {
            Some(sink) => sink,
            None => &mut noop,
        };

        let max_attempts = options.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match self.daemon.pull_model(name, &mut *sink).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if !err.is_transient() {
                return Err(err);
            }

            if attempt >= max_attempts {
                let reason = match err {
                    ProvisionError::Download { reason, .. } => reason,
                    other => other.to_string(),
                };
                return Err(ProvisionError::Download {
                    attempts: attempt,
                    reason,
                });
            }

            let delay = options.retry.delay_for(attempt);
            warn!(
                model = name,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "pull failed, retrying"
            );
            sleep(delay).await;
        }
    }

    /// Delete a model, honouring the configured `RemovePolicy`
    pub async fn remove_model(&self, name: &str) -> Result<()> {
        match self.daemon.delete_model(name).await {
            Err(ProvisionError::NotFound(_)) if self.remove_policy == RemovePolicy::Idempotent => {
                info!(model = name, "model already absent");
                Ok(())
            }
            Err(e) => Err(e),
            Ok(()) => {
                info!(model = name, "model removed");
                Ok(())
            }
        }
    }

    /// Pull every model in `required` that is not installed.
    ///
    /// Each missing model gets one independent retry sequence; a failure on
    /// one never stops the others. Any failures come back together as
    /// `Aggregate`.
    pub async fn ensure_required_models(
        &self,
        required: &[String],
        options: &PullOptions,
        mut on_progress: Option<ModelProgressSink<'_>>,
    ) -> Result<ProvisionReport> {
        let installed: Vec<String> = self
            .daemon
            .list_models()
            .await?
            .into_iter()
            .map(|m| m.name)
            .collect();

        let missing = missing_models(required, &installed);
        let missing_keys: HashSet<String> = missing.iter().map(|m| normalize_model_name(m)).collect();

        let mut report = ProvisionReport::default();
        let mut seen = HashSet::new();
        for name in required {
            let key = normalize_model_name(name);
            if !missing_keys.contains(&key) && seen.insert(key) {
                report.already_installed.push(name.clone());
            }
        }

        let mut failures = Vec::new();
        for name in missing {
            info!(model = %name, "provisioning missing model");

            let result = match on_progress.as_mut() {
                Some(outer) => {
                    let mut forward = |event: &ProgressEvent| outer(&name, event);
                    self.pull_model_with_retry(&name, Some(&mut forward), options).await
                }
                None => self.pull_model_with_retry(&name, None, options).await,
            };

            match result {
                Ok(()) => report.pulled.push(name),
                Err(error) => {
                    warn!(model = %name, error = %error, "could not provision model");
                    failures.push(ModelFailure { model: name, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(ProvisionError::Aggregate(failures))
        }
    }

    fn ensure_disk_space(&self, name: &str) -> Result<()> {
        let required = estimate_model_size(name);
        let probe = match disk::nearest_existing(&self.models_dir) {
            Some(path) => path.to_path_buf(),
            None => {
                warn!(dir = %self.models_dir.display(), "no existing ancestor; skipping disk check");
                return Ok(());
            }
        };

        match (self.space_query)(&probe) {
            Ok(available) if available < required => {
                Err(ProvisionError::InsufficientDiskSpace { required, available })
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "disk space unknown; pulling anyway");
                Ok(())
            }
        }
    }
}

/// Canonical form used for comparing names: bare names get `:latest`
pub fn normalize_model_name(name: &str) -> String {
    let last_segment = name.rsplit('/').next().unwrap_or(name);
    if last_segment.contains(':') || name.is_empty() {
        name.to_string()
    } else {
        format!("{}:latest", name)
    }
}

/// Models in `required` but not in `installed`, deduplicated, in the order
/// they first appear in `required`
pub fn missing_models(required: &[String], installed: &[String]) -> Vec<String> {
    let installed: HashSet<String> = installed.iter().map(|m| normalize_model_name(m)).collect();
    let mut seen = HashSet::new();

    required
        .iter()
        .filter(|name| {
            let key = normalize_model_name(name);
            !installed.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_model_name() {
        assert_eq!(normalize_model_name("mistral"), "mistral:latest");
        assert_eq!(normalize_model_name("llama3.1:8b"), "llama3.1:8b");
        assert_eq!(normalize_model_name("hf.co/org/model"), "hf.co/org/model:latest");
        assert_eq!(normalize_model_name("localhost:5000/org/model"), "localhost:5000/org/model:latest");
    }

    #[test]
    fn test_missing_models() {
        let required = names(&["llama3.1:8b", "nomic-embed-text", "mistral", "llama3.1:8b"]);
        let installed = names(&["nomic-embed-text:latest", "qwen2.5:7b"]);

        assert_eq!(missing_models(&required, &installed), names(&["llama3.1:8b", "mistral"]));
    }

    #[test]
    fn test_missing_models_all_installed() {
        let required = names(&["mistral:latest"]);
        let installed = names(&["mistral"]);
        assert!(missing_models(&required, &installed).is_empty());
    }

    #[test]
    fn test_pull_options_builders() {
        let options = PullOptions::default().with_max_retries(7).without_disk_check();
        assert_eq!(options.retry.max_retries, 7);
        assert!(!options.check_disk_space);
        assert!(PullOptions::default().check_disk_space);
    }

    #[quickcheck]
    fn prop_missing_is_disjoint_from_installed(required: Vec<String>, installed: Vec<String>) -> bool {
        let missing = missing_models(&required, &installed);
        let installed: HashSet<String> = installed.iter().map(|m| normalize_model_name(m)).collect();

        missing.iter().all(|m| required.contains(m))
            && missing.iter().all(|m| !installed.contains(&normalize_model_name(m)))
    }

    #[quickcheck]
    fn prop_every_required_model_is_missing_or_installed(required: Vec<String>, installed: Vec<String>) -> bool {
        let missing: HashSet<String> = missing_models(&required, &installed)
            .iter()
            .map(|m| normalize_model_name(m))
            .collect();
        let installed: HashSet<String> = installed.iter().map(|m| normalize_model_name(m)).collect();

        required.iter().all(|r| {
            let key = normalize_model_name(r);
            missing.contains(&key) ^ installed.contains(&key)
        })
    }
}
