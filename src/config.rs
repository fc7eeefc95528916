//! Configuration management for ollamactl
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.ollamactl/config.toml

use crate::errors::{ProvisionError, Result};
use crate::models::client::normalize_base_url;
use crate::provision::retry::{BASE_DELAY_MS, DEFAULT_MAX_RETRIES, MAX_DELAY_MS};
use crate::provision::{default_models_dir, PullOptions, RemovePolicy, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on configured retries
pub const MAX_CONFIGURED_RETRIES: u32 = 10;

/// Complete configuration for ollamactl
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub daemon: DaemonConfig,
    pub provision: ProvisionConfig,
}

/// Ollama connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

/// Provisioning behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Models `ensure` keeps installed
    pub required_models: Vec<String>,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub idempotent_remove: bool,
    pub check_disk_space: bool,
    /// Overrides $OLLAMA_MODELS / ~/.ollama/models for disk checks
    pub models_dir: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            request_timeout_secs: 30,
            probe_timeout_secs: 60,
        }
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            required_models: vec![
                "qwen2.5:7b-instruct".to_string(),
                "nomic-embed-text".to_string(),
            ],
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: BASE_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
            idempotent_remove: false,
            check_disk_space: true,
            models_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults, then apply `OLLAMA_HOST`
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(config_path) = path {
            Self::load_from_file(&config_path)?
        } else {
            Self::load_default()?
        };

        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config.apply_ollama_host(&host)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProvisionError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ProvisionError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// ~/.ollamactl/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ollamactl").join("config.toml"))
    }

    /// Override host and port from an `OLLAMA_HOST` value such as
    /// `0.0.0.0:11435`, `http://gpu-box:11434` or `gpu-box`
    pub fn apply_ollama_host(&mut self, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(());
        }

        let url = normalize_base_url(value);
        let authority = url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&url)
            .split('/')
            .next()
            .unwrap_or_default();

        match authority.rsplit_once(':') {
            Some((host, port)) => {
                self.daemon.port = port.parse().map_err(|_| {
                    ProvisionError::Config(format!("Invalid port in OLLAMA_HOST: {}", value))
                })?;
                self.daemon.host = host.to_string();
            }
            None => self.daemon.host = authority.to_string(),
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.daemon.host.is_empty() {
            return Err(ProvisionError::Config("daemon.host must not be empty".to_string()));
        }

        if self.daemon.port == 0 {
            return Err(ProvisionError::Config("daemon.port must be greater than 0".to_string()));
        }

        if self.daemon.request_timeout_secs == 0 || self.daemon.probe_timeout_secs == 0 {
            return Err(ProvisionError::Config(
                "daemon timeouts must be greater than 0".to_string(),
            ));
        }

        if self.provision.max_retries > MAX_CONFIGURED_RETRIES {
            return Err(ProvisionError::Config(format!(
                "provision.max_retries must be at most {}",
                MAX_CONFIGURED_RETRIES
            )));
        }

        if self.provision.max_delay_ms < self.provision.base_delay_ms {
            return Err(ProvisionError::Config(
                "provision.max_delay_ms must be at least base_delay_ms".to_string(),
            ));
        }

        if self.provision.required_models.iter().any(|m| m.trim().is_empty()) {
            return Err(ProvisionError::Config(
                "provision.required_models contains an empty name".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ProvisionError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ProvisionError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ProvisionError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        normalize_base_url(&format!("{}:{}", self.daemon.host, self.daemon.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.daemon.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.daemon.probe_timeout_secs)
    }

    pub fn pull_options(&self) -> PullOptions {
        PullOptions {
            retry: RetryPolicy::new(
                self.provision.max_retries,
                self.provision.base_delay_ms,
                self.provision.max_delay_ms,
            ),
            check_disk_space: self.provision.check_disk_space,
        }
    }

    pub fn remove_policy(&self) -> RemovePolicy {
        if self.provision.idempotent_remove {
            RemovePolicy::Idempotent
        } else {
            RemovePolicy::Strict
        }
    }

    /// Model store directory used for disk-space checks
    pub fn models_dir(&self) -> PathBuf {
        match &self.provision.models_dir {
            Some(dir) => Self::expand_path(dir),
            None => default_models_dir(),
        }
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.daemon.host, "127.0.0.1");
        assert_eq!(config.daemon.port, 11434);
        assert_eq!(config.provision.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ollama_url() {
        assert_eq!(Config::default().ollama_url(), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_validation_zero_port() {
        let mut config = Config::default();
        config.daemon.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_delay_ordering() {
        let mut config = Config::default();
        config.provision.max_delay_ms = 10;
        config.provision.base_delay_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_too_many_retries() {
        let mut config = Config::default();
        config.provision.max_retries = MAX_CONFIGURED_RETRIES + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[provision]\nrequired_models = [\"llama3.2:3b\"]\nidempotent_remove = true\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.provision.required_models, vec!["llama3.2:3b"]);
        assert_eq!(config.remove_policy(), RemovePolicy::Idempotent);
        assert_eq!(config.daemon.port, 11434);
        assert_eq!(config.provision.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.daemon.port = 11500;
        config.save(&path).unwrap();

        let reloaded = Config::load_from_file(&path).unwrap();
        assert_eq!(reloaded.daemon.port, 11500);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[daemon]\nport = \"not a number\"\n").unwrap();

        assert!(matches!(
            Config::load_from_file(&path),
            Err(ProvisionError::Config(_))
        ));
    }

    #[test]
    fn test_apply_ollama_host() {
        let mut config = Config::default();
        config.apply_ollama_host("0.0.0.0:11435").unwrap();
        assert_eq!(config.daemon.host, "0.0.0.0");
        assert_eq!(config.daemon.port, 11435);

        config.apply_ollama_host("http://gpu-box").unwrap();
        assert_eq!(config.daemon.host, "gpu-box");
        assert_eq!(config.daemon.port, 11435);

        assert!(config.apply_ollama_host("gpu-box:notaport").is_err());
    }

    #[test]
    fn test_pull_options_from_config() {
        let mut config = Config::default();
        config.provision.max_retries = 5;
        config.provision.check_disk_space = false;

        let options = config.pull_options();
        assert_eq!(options.retry.max_retries, 5);
        assert!(!options.check_disk_space);
    }

    #[test]
    fn test_expand_path() {
        assert!(!Config::expand_path("~/.ollama/models").to_string_lossy().contains('~'));
        assert_eq!(Config::expand_path("/absolute/path"), PathBuf::from("/absolute/path"));
    }
}
