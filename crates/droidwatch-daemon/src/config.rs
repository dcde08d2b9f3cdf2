//! Configuration loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub check: CheckConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Host the HTTP endpoint binds to when `--listen` is given
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// How long a check result is served from memory
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout_secs: u64,
    /// Upper bound for each external command
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            cache_timeout_secs: default_cache_timeout(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl CheckConfig {
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn default_cache_timeout() -> u64 {
    5
}

fn default_command_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Where the USB ID registry is downloaded from
    #[serde(default = "default_registry_url")]
    pub url: String,
    /// Local copy; defaults to `usb.ids` in the temp directory
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            path: None,
            download_timeout_secs: default_download_timeout(),
        }
    }
}

impl RegistryConfig {
    pub fn local_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("usb.ids"))
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn default_registry_url() -> String {
    "http://www.linux-usb.org/usb.ids".to_string()
}

fn default_download_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Command printing the USB topology dump
    #[serde(default = "default_topology_program")]
    pub program: String,
    #[serde(default = "default_topology_args")]
    pub args: Vec<String>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            program: default_topology_program(),
            args: default_topology_args(),
        }
    }
}

fn default_topology_program() -> String {
    "/usr/sbin/system_profiler".to_string()
}

fn default_topology_args() -> Vec<String> {
    vec!["SPUSBDataType".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Environment variable holding the Android SDK root
    #[serde(default = "default_sdk_env")]
    pub sdk_env: String,
    /// adb location relative to the SDK root
    #[serde(default = "default_relative_path")]
    pub relative_path: PathBuf,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sdk_env: default_sdk_env(),
            relative_path: default_relative_path(),
        }
    }
}

fn default_sdk_env() -> String {
    "ANDROID_HOME".to_string()
}

fn default_relative_path() -> PathBuf {
    Path::new("platform-tools").join("adb")
}

/// Load configuration from file, falling back to defaults when absent
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
