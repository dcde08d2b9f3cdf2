//! Check orchestration
//!
//! Runs the whole pipeline (topology dump, registry, adb listing, device
//! properties) and memoizes the result for a short time.

use droidwatch_core::resolve::attached_serials;
use droidwatch_core::{
    adb, resolve_devices, topology, CheckResult, DeviceProperties, VendorRegistry,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bridge::AdbBridge;
use crate::command;
use crate::config::TopologyConfig;
use crate::error::CheckError;
use crate::memo::TimedCache;
use crate::registry_fetch::RegistryFetcher;

/// Producers of the raw pipeline inputs
pub trait Sources: Send + Sync + 'static {
    /// Raw USB topology dump
    fn usb_topology(&self) -> impl Future<Output = Result<String, CheckError>> + Send;

    /// Parsed and validated USB ID registry
    fn registry(&self) -> impl Future<Output = Result<VendorRegistry, CheckError>> + Send;

    /// Raw `adb devices` output
    fn adb_devices(&self) -> impl Future<Output = Result<String, CheckError>> + Send;

    /// Live properties of an attached device; never fails
    fn device_properties(&self, serial: &str) -> impl Future<Output = DeviceProperties> + Send;
}

/// The real system: external commands and the registry download
pub struct SystemSources {
    topology: TopologyConfig,
    command_timeout: Duration,
    bridge: AdbBridge,
    registry: RegistryFetcher,
}

impl SystemSources {
    pub fn new(
        topology: TopologyConfig,
        command_timeout: Duration,
        bridge: AdbBridge,
        registry: RegistryFetcher,
    ) -> Self {
        Self {
            topology,
            command_timeout,
            bridge,
            registry,
        }
    }
}

impl Sources for SystemSources {
    async fn usb_topology(&self) -> Result<String, CheckError> {
        let dump = command::run(
            &self.topology.program,
            &self.topology.args,
            self.command_timeout,
        )
        .await?;
        Ok(dump)
    }

    async fn registry(&self) -> Result<VendorRegistry, CheckError> {
        self.registry.load().await
    }

    async fn adb_devices(&self) -> Result<String, CheckError> {
        Ok(self.bridge.devices().await?)
    }

    async fn device_properties(&self, serial: &str) -> DeviceProperties {
        self.bridge.properties(serial).await
    }
}

/// Memoized check runner
pub struct Checker<S> {
    sources: S,
    cache: TimedCache<CheckResult>,
}

impl<S: Sources> Checker<S> {
    pub fn new(sources: S, cache_timeout: Duration) -> Self {
        Self {
            sources,
            cache: TimedCache::new(cache_timeout),
        }
    }

    pub fn cache_timeout(&self) -> Duration {
        self.cache.timeout()
    }

    /// Latest check result, at most `cache_timeout` old
    pub async fn do_check(&self) -> Result<Arc<CheckResult>, CheckError> {
        self.cache.get_or_compute(|| self.run()).await
    }

    async fn run(&self) -> Result<CheckResult, CheckError> {
        let dump = self.sources.usb_topology().await?;
        let phones = topology::parse_phones(&dump)?;

        let registry = self.sources.registry().await?;
        let mut usb = resolve_devices(&phones, &registry);

        let attached = adb::parse_devices(&self.sources.adb_devices().await?);

        let reachable: Vec<String> = attached_serials(&usb, &attached).map(String::from).collect();
        for serial in reachable {
            let properties = self.sources.device_properties(&serial).await;
            if let Some(device) = usb.get_mut(&serial) {
                device.set_properties(properties);
            }
        }

        let result = CheckResult::new(usb, attached);
        for device in &result.missing {
            warn!(
                serial = %device.serial,
                description = %device.description,
                "USB device not listed by adb"
            );
        }
        info!(
            usb = result.usb.len(),
            adb = result.adb.len(),
            missing = result.missing.len(),
            "Check completed"
        );
        debug!(?result, "Check result");

        Ok(result)
    }
}
