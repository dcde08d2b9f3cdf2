//! Device identity resolution
//!
//! Joins topology candidates with the USB ID registry, keyed by serial, and
//! carries the live properties of devices adb can reach.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::adb::DeviceProperties;
use crate::registry::VendorRegistry;
use crate::topology::CandidatePhone;

/// A USB device with a human readable description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDevice {
    /// Serial number, the identifier adb uses for the device
    #[serde(rename = "adb")]
    pub serial: String,
    #[serde(rename = "vendorID")]
    pub vendor_id: String,
    #[serde(rename = "productID")]
    pub product_id: String,
    pub description: String,
    pub name: Option<String>,
    /// Only set for devices adb lists
    #[serde(rename = "osVersion", skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(rename = "productModel", skip_serializing_if = "Option::is_none")]
    pub product_model: Option<String>,
}

impl ResolvedDevice {
    pub fn new(phone: &CandidatePhone, registry: &VendorRegistry) -> Self {
        Self {
            serial: phone.serial.clone(),
            vendor_id: phone.vendor_id.clone(),
            product_id: phone.product_id.clone(),
            description: registry.describe(&phone.vendor_id, &phone.product_id),
            name: phone.name.clone(),
            os_version: None,
            product_model: None,
        }
    }

    pub fn set_properties(&mut self, properties: DeviceProperties) {
        self.os_version = Some(properties.os_version);
        self.product_model = Some(properties.product_model);
    }
}

/// Resolved devices keyed by serial
pub type ResolvedDevices = BTreeMap<String, ResolvedDevice>;

/// Describe every candidate. A serial seen twice keeps its last occurrence.
pub fn resolve_devices(phones: &[CandidatePhone], registry: &VendorRegistry) -> ResolvedDevices {
    let resolved: ResolvedDevices = phones
        .iter()
        .map(|phone| (phone.serial.clone(), ResolvedDevice::new(phone, registry)))
        .collect();

    debug!(devices = resolved.len(), "Resolved USB devices");
    resolved
}

/// Serials that are both resolved and listed by adb, in adb order
pub fn attached_serials<'a>(
    resolved: &'a ResolvedDevices,
    attached: &'a [String],
) -> impl Iterator<Item = &'a str> + 'a {
    attached
        .iter()
        .filter(move |serial| resolved.contains_key(serial.as_str()))
        .map(|serial| serial.as_str())
}
