//! adb invocation

use droidwatch_core::adb::{self, OS_VERSION_PROPERTY, PRODUCT_MODEL_PROPERTY};
use droidwatch_core::DeviceProperties;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::command::{self, CommandError};
use crate::config::BridgeConfig;
use crate::error::ConfigError;

/// Find the adb executable.
///
/// An explicit path wins; otherwise adb is looked up under the SDK root named
/// by the configured environment variable.
pub fn locate(explicit: Option<&Path>, config: &BridgeConfig) -> Result<PathBuf, ConfigError> {
    locate_with(explicit, std::env::var_os(&config.sdk_env), config)
}

fn locate_with(
    explicit: Option<&Path>,
    sdk_root: Option<OsString>,
    config: &BridgeConfig,
) -> Result<PathBuf, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let root = sdk_root
                .filter(|root| !root.is_empty())
                .ok_or_else(|| ConfigError::SdkRootUnset(config.sdk_env.clone()))?;
            PathBuf::from(root).join(&config.relative_path)
        }
    };

    if !path.exists() {
        return Err(ConfigError::BridgeToolNotFound(path));
    }

    debug!(path = %path.display(), "Using adb");
    Ok(path)
}

/// Runs adb subcommands
#[derive(Debug, Clone)]
pub struct AdbBridge {
    path: PathBuf,
    timeout: Duration,
}

impl AdbBridge {
    pub fn new(path: PathBuf, timeout: Duration) -> Self {
        Self { path, timeout }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw `adb devices` output
    pub async fn devices(&self) -> Result<String, CommandError> {
        command::run(&self.path, ["devices"], self.timeout).await
    }

    /// Read one system property from a device
    pub async fn getprop(
        &self,
        serial: &str,
        property: &str,
    ) -> Result<Option<String>, CommandError> {
        let output = command::run(
            &self.path,
            ["-s", serial, "shell", "getprop", property],
            self.timeout,
        )
        .await?;
        Ok(adb::parse_property(&output))
    }

    /// OS version and model of a device. Any failed or empty lookup marks
    /// both as errors.
    pub async fn properties(&self, serial: &str) -> DeviceProperties {
        let os_version = self.getprop(serial, OS_VERSION_PROPERTY).await;
        let product_model = match os_version {
            Ok(Some(_)) => self.getprop(serial, PRODUCT_MODEL_PROPERTY).await,
            _ => Ok(None),
        };

        match (os_version, product_model) {
            (Ok(Some(os_version)), Ok(Some(product_model))) => DeviceProperties {
                os_version,
                product_model,
            },
            (Err(e), _) | (_, Err(e)) => {
                warn!(serial = %serial, error = %e, "Device property lookup failed");
                DeviceProperties::error()
            }
            _ => {
                warn!(serial = %serial, "Device returned empty properties");
                DeviceProperties::error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sdk_with_adb() -> TempDir {
        let sdk = TempDir::new().unwrap();
        let tools = sdk.path().join("platform-tools");
        std::fs::create_dir_all(&tools).unwrap();
        std::fs::write(tools.join("adb"), "").unwrap();
        sdk
    }

    #[test]
    fn test_locate_from_sdk_root() {
        let sdk = sdk_with_adb();
        let path = locate_with(None, Some(sdk.path().into()), &BridgeConfig::default()).unwrap();
        assert_eq!(path, sdk.path().join("platform-tools").join("adb"));
    }

    #[test]
    fn test_explicit_path_wins() {
        let sdk = sdk_with_adb();
        let adb = sdk.path().join("platform-tools").join("adb");
        let path = locate_with(Some(&adb), None, &BridgeConfig::default()).unwrap();
        assert_eq!(path, adb);
    }

    #[test]
    fn test_sdk_root_unset() {
        let err = locate_with(None, None, &BridgeConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::SdkRootUnset(ref var) if var == "ANDROID_HOME"));

        let err = locate_with(None, Some(OsString::new()), &BridgeConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::SdkRootUnset(_)));
    }

    #[test]
    fn test_adb_not_found() {
        let sdk = TempDir::new().unwrap();
        let err = locate_with(None, Some(sdk.path().into()), &BridgeConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::BridgeToolNotFound(_)));

        let err = locate_with(Some(Path::new("/nonexistent/adb")), None, &BridgeConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::BridgeToolNotFound(_)));
    }

    #[cfg(unix)]
    fn fake_adb(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("adb");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_properties() {
        let dir = TempDir::new().unwrap();
        let adb = fake_adb(
            dir.path(),
            r#"case "$5" in
  ro.build.version.release) echo 14 ;;
  ro.product.model) echo "Pixel 7" ;;
esac"#,
        );
        let bridge = AdbBridge::new(adb, Duration::from_secs(10));

        let props = bridge.properties("ABC123").await;
        assert_eq!(props.os_version, "14");
        assert_eq!(props.product_model, "Pixel 7");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_properties_failure() {
        let dir = TempDir::new().unwrap();
        let adb = fake_adb(dir.path(), "echo 'error: device offline' >&2; exit 1");
        let bridge = AdbBridge::new(adb, Duration::from_secs(10));

        assert_eq!(bridge.properties("ABC123").await, DeviceProperties::error());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_properties_empty() {
        let dir = TempDir::new().unwrap();
        let adb = fake_adb(dir.path(), r#"[ "$5" = ro.product.model ] || echo 14"#);
        let bridge = AdbBridge::new(adb, Duration::from_secs(10));

        assert_eq!(bridge.properties("ABC123").await, DeviceProperties::error());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_devices() {
        let dir = TempDir::new().unwrap();
        let adb = fake_adb(dir.path(), r#"printf 'List of devices attached\nABC123\tdevice\n'"#);
        let bridge = AdbBridge::new(adb, Duration::from_secs(10));

        let listing = bridge.devices().await.unwrap();
        assert_eq!(adb::parse_devices(&listing), vec!["ABC123"]);
    }
}
