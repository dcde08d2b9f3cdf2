//! Missing device computation

use std::collections::HashSet;

use crate::resolve::{ResolvedDevice, ResolvedDevices};

/// Devices seen on USB that adb does not list, ordered by serial
pub fn find_missing(resolved: &ResolvedDevices, attached: &[String]) -> Vec<ResolvedDevice> {
    let attached: HashSet<&str> = attached.iter().map(|s| s.as_str()).collect();

    resolved
        .values()
        .filter(|device| !attached.contains(device.serial.as_str()))
        .cloned()
        .collect()
}
