//! Run options and prerequisite inventories passed to corrective operations.

use super::inventory::Inventory;

/// Options shared by every step of a run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Report differences without applying them
    pub dry_run: bool,
    /// Maximum corrective operations in flight per batch
    pub max_concurrency: usize,
    /// Replace a device primary IP even when one is already set
    pub force_primary_ip: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            dry_run: false,
            max_concurrency: crate::config::DEFAULT_MAX_CONCURRENCY,
            force_primary_ip: false,
        }
    }
}

/// Typed view of the inventories already resolved earlier in the pipeline.
///
/// Netbox corrective operations look up remote ids here (device id for a new
/// interface, interface id for a new address) before falling back to a
/// remote lookup.
#[derive(Debug, Clone, Copy)]
pub struct SyncContext<'a> {
    pub options: &'a SyncOptions,
    pub devices: Option<&'a Inventory>,
    pub interfaces: Option<&'a Inventory>,
    pub ipaddrs: Option<&'a Inventory>,
}

impl<'a> SyncContext<'a> {
    pub fn new(options: &'a SyncOptions) -> Self {
        SyncContext {
            options,
            devices: None,
            interfaces: None,
            ipaddrs: None,
        }
    }

    pub fn with_devices(mut self, devices: &'a Inventory) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn with_interfaces(mut self, interfaces: &'a Inventory) -> Self {
        self.interfaces = Some(interfaces);
        self
    }

    pub fn with_ipaddrs(mut self, ipaddrs: &'a Inventory) -> Self {
        self.ipaddrs = Some(ipaddrs);
        self
    }

    pub fn limit(&self) -> usize {
        self.options.max_concurrency.max(1)
    }
}
