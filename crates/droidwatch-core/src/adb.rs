//! Parsing of `adb devices` output and device property types

use serde::Serialize;
use tracing::{debug, trace};

/// Placeholder recorded when a property lookup fails
pub const PROPERTY_ERROR: &str = "Error";

/// `getprop` key for the Android release, e.g. "14"
pub const OS_VERSION_PROPERTY: &str = "ro.build.version.release";

/// `getprop` key for the marketing model, e.g. "Pixel 7"
pub const PRODUCT_MODEL_PROPERTY: &str = "ro.product.model";

/// Parse `adb devices` output into the serials adb can talk to.
///
/// ```text
/// List of devices attached
/// 2A111FDH200BXY	device
/// R58M42ABCDE	unauthorized
/// ```
///
/// Unauthorized devices are physically present but not trusted, so they are
/// left out.
pub fn parse_devices(listing: &str) -> Vec<String> {
    let mut serials = Vec::new();

    // Daemon start notices ("* daemon started successfully") precede the header
    let lines = listing.lines().skip_while(|l| l.starts_with("* ")).skip(1);

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.contains("unauthorized") {
            trace!(line, "Skipping unauthorized device");
            continue;
        }

        let serial = line.split_once('\t').map_or(line, |(serial, _)| serial);
        serials.push(serial.trim().to_string());
    }

    debug!(devices = serials.len(), "Parsed adb device list");
    serials
}

/// Extract a property value from `adb shell getprop` output (first line)
pub fn parse_property(output: &str) -> Option<String> {
    let value = output.lines().next()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Live properties read from an attached device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceProperties {
    pub os_version: String,
    pub product_model: String,
}

impl DeviceProperties {
    /// Both properties set to the error placeholder
    pub fn error() -> Self {
        Self {
            os_version: PROPERTY_ERROR.to_string(),
            product_model: PROPERTY_ERROR.to_string(),
        }
    }
}
