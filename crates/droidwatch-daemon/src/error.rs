//! Error types for the check pipeline

use droidwatch_core::{RegistryError, TopologyError};
use std::path::PathBuf;
use thiserror::Error;

use crate::command::CommandError;

/// Setup problems detected before any check runs
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    SdkRootUnset(String),
    #[error("Could not find adb at {}", .0.display())]
    BridgeToolNotFound(PathBuf),
}

#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("Error downloading USB IDs from {url}: {reason}")]
    RegistryUnavailable { url: String, reason: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Malformed USB topology: {0}")]
    MalformedTopology(#[from] TopologyError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl CheckError {
    /// Process exit status for this error in one-shot mode
    pub fn exit_code(&self) -> u8 {
        2
    }

    pub fn is_registry_corrupt(&self) -> bool {
        matches!(self, Self::Registry(RegistryError::Corrupt { .. }))
    }
}
