//! USB ID registry download and local caching
//!
//! The registry is downloaded once into a local file and reused by every
//! later check. A copy that fails validation is deleted by the loader so the
//! next check downloads it again.

use droidwatch_core::VendorRegistry;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::CheckError;

/// Registry fetcher with a file cache
pub struct RegistryFetcher {
    /// HTTP client
    client: reqwest::Client,
    url: String,
    path: PathBuf,
}

impl RegistryFetcher {
    pub fn new(url: String, path: PathBuf, timeout: Duration) -> Result<Self, CheckError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CheckError::RegistryUnavailable {
                url: url.clone(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, url, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, downloading it first if there is no local copy
    pub async fn load(&self) -> Result<VendorRegistry, CheckError> {
        if !self.path.exists() {
            self.download().await?;
        }

        let registry = VendorRegistry::load_validated(&self.path)?;
        debug!(path = %self.path.display(), entries = registry.len(), "Loaded USB ID registry");
        Ok(registry)
    }

    /// Download the registry into the local path.
    ///
    /// The body is written to a per-process file next to the target and
    /// renamed into place, so a concurrent reader never sees a partial file
    /// and the last writer wins.
    async fn download(&self) -> Result<(), CheckError> {
        info!(url = %self.url, path = %self.path.display(), "Downloading USB ID registry");

        let unavailable = |reason: String| CheckError::RegistryUnavailable {
            url: self.url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("server returned {}", response.status())));
        }

        let content = response
            .bytes()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let partial = partial_path(&self.path);
        tokio::fs::write(&partial, &content)
            .await
            .map_err(|e| unavailable(format!("failed to write {}: {}", partial.display(), e)))?;
        tokio::fs::rename(&partial, &self.path)
            .await
            .map_err(|e| unavailable(format!("failed to move {}: {}", partial.display(), e)))?;

        info!(bytes = content.len(), path = %self.path.display(), "Cached USB ID registry");
        Ok(())
    }
}

/// Per-process download target next to `path`, so concurrent first runs
/// never rename each other's partial files.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{}.part", std::process::id()));
    PathBuf::from(name)
}
