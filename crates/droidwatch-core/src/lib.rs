//! droidwatch core - parsing and resolution for the USB/adb consistency check
//!
//! This crate holds the pure part of the pipeline:
//! - USB topology dump parsing into phone candidates
//! - `usb.ids` registry parsing and validation
//! - `adb devices` listing parsing
//! - Identity resolution and the missing-device diff

pub mod adb;
pub mod check;
pub mod diff;
pub mod registry;
pub mod resolve;
pub mod topology;

pub use adb::DeviceProperties;
pub use check::CheckResult;
pub use diff::find_missing;
pub use registry::{RegistryError, VendorRegistry};
pub use resolve::{resolve_devices, ResolvedDevice, ResolvedDevices};
pub use topology::{CandidatePhone, TopologyBlock, TopologyError};
