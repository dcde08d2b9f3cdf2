//! Check result assembly

use serde::Serialize;

use crate::diff::find_missing;
use crate::resolve::{ResolvedDevice, ResolvedDevices};

/// Outcome of one check run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// USB devices adb does not list
    pub missing: Vec<ResolvedDevice>,
    /// Serials adb lists as attached and authorized
    pub adb: Vec<String>,
    /// Every USB device found, keyed by serial
    pub usb: ResolvedDevices,
}

impl CheckResult {
    /// Assemble a result from the resolved devices (properties already
    /// attached) and the adb listing.
    pub fn new(usb: ResolvedDevices, attached: Vec<String>) -> Self {
        Self {
            missing: find_missing(&usb, &attached),
            adb: attached,
            usb,
        }
    }

    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }
}
