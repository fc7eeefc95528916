//! In-memory daemon used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ollamactl::models::{DaemonApi, ModelInfo, ProgressEvent, ProgressSink};
use ollamactl::{ProvisionError, Result};
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

/// Scripted result of one pull attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    Succeed,
    /// Emit one partial event, then drop the connection
    DropMidStream,
    Refused,
    NotFound,
}

#[derive(Default)]
pub struct FakeDaemon {
    installed: Mutex<Vec<String>>,
    scripts: Mutex<HashMap<String, VecDeque<PullOutcome>>>,
    pull_calls: Mutex<HashMap<String, u32>>,
    failing_probes: HashSet<String>,
    version: Option<String>,
    list_fails: bool,
}

impl FakeDaemon {
    pub fn with_models(models: &[&str]) -> Self {
        Self {
            installed: Mutex::new(models.iter().map(|m| m.to_string()).collect()),
            version: Some("0.5.7".to_string()),
            ..Default::default()
        }
    }

    pub fn without_version(mut self) -> Self {
        self.version = None;
        self
    }

    pub fn unreachable() -> Self {
        Self {
            list_fails: true,
            ..Default::default()
        }
    }

    pub fn with_failing_probe(mut self, model: &str) -> Self {
        self.failing_probes.insert(model.to_string());
        self
    }

    /// Queue outcomes for successive pulls of `model`; once exhausted, pulls succeed
    pub fn script(self, model: &str, outcomes: &[PullOutcome]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(model.to_string(), outcomes.iter().copied().collect());
        self
    }

    pub fn pull_calls(&self, model: &str) -> u32 {
        self.pull_calls.lock().unwrap().get(model).copied().unwrap_or(0)
    }

    pub fn total_pull_calls(&self) -> u32 {
        self.pull_calls.lock().unwrap().values().sum()
    }

    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().unwrap().clone()
    }
}

fn event(value: serde_json::Value) -> ProgressEvent {
    serde_json::from_value(value).unwrap()
}

#[async_trait]
impl DaemonApi for FakeDaemon {
    fn base_url(&self) -> &str {
        "http://fake-daemon"
    }

    async fn version(&self) -> Result<String> {
        if self.list_fails {
            return Err(ProvisionError::Connection("connection refused".to_string()));
        }
        self.version
            .clone()
            .ok_or_else(|| ProvisionError::Protocol("404 Not Found".to_string()))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        if self.list_fails {
            return Err(ProvisionError::Connection("connection refused".to_string()));
        }
        Ok(self
            .installed()
            .into_iter()
            .map(|name| ModelInfo {
                name,
                size: 2_019_393_189,
                modified_at: "2024-10-01T12:00:00Z".to_string(),
                digest: "sha256:a80c4f17acd5".to_string(),
                details: None,
            })
            .collect())
    }

    async fn pull_model(&self, name: &str, on_progress: ProgressSink<'_>) -> Result<()> {
        *self.pull_calls.lock().unwrap().entry(name.to_string()).or_insert(0) += 1;

        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(PullOutcome::Succeed);

        match outcome {
            PullOutcome::NotFound => Err(ProvisionError::NotFound(name.to_string())),
            PullOutcome::Refused => Err(ProvisionError::Connection("connection refused".to_string())),
            PullOutcome::DropMidStream => {
                on_progress(&event(json!({ "status": "pulling manifest" })));
                Err(ProvisionError::Download {
                    attempts: 1,
                    reason: "unexpected EOF".to_string(),
                })
            }
            PullOutcome::Succeed => {
                on_progress(&event(json!({ "status": "pulling manifest" })));
                on_progress(&event(json!({
                    "status": "downloading",
                    "digest": "sha256:a80c4f17acd5",
                    "total": 100,
                    "completed": 50
                })));
                on_progress(&event(json!({
                    "status": "downloading",
                    "digest": "sha256:a80c4f17acd5",
                    "total": 100,
                    "completed": 100
                })));
                on_progress(&event(json!({ "status": "success" })));
                self.installed.lock().unwrap().push(name.to_string());
                Ok(())
            }
        }
    }

    async fn delete_model(&self, name: &str) -> Result<()> {
        let mut installed = self.installed.lock().unwrap();
        match installed.iter().position(|m| m == name) {
            Some(index) => {
                installed.remove(index);
                Ok(())
            }
            None => Err(ProvisionError::NotFound(name.to_string())),
        }
    }

    async fn probe_model(&self, name: &str) -> Result<()> {
        if self.failing_probes.contains(name) {
            Err(ProvisionError::Protocol("model runner crashed".to_string()))
        } else {
            Ok(())
        }
    }
}
