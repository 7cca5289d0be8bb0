//! Configuration constants.
//!
//! Defaults for concurrency, timeouts, paging, and environment variable names.

/// Maximum corrective operations in flight per executor batch.
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;

/// Maximum concurrent requests per remote client.
///
/// Each client owns its own permit pool, so two collectors sharing a client
/// share this limit.
pub const DEFAULT_API_CONCURRENCY: usize = 100;

/// Per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Netbox page size (`limit` query parameter)
pub const NETBOX_PAGE_SIZE: usize = 100;

/// IP Fabric table page size
pub const IPFABRIC_PAGE_SIZE: usize = 1000;

/// IP Fabric snapshot selector used for every table fetch
pub const IPFABRIC_SNAPSHOT: &str = "$last";

/// Default mappings file, relative to the working directory
pub const DEFAULT_MAPPINGS_FILE: &str = "inventory_sync.toml";

/// Status given to devices created in Netbox
pub const NETBOX_DEVICE_STATUS: &str = "active";

// Environment variables
pub const ENV_NETBOX_ADDR: &str = "NETBOX_ADDR";
pub const ENV_NETBOX_TOKEN: &str = "NETBOX_TOKEN";
pub const ENV_IPFABRIC_ADDR: &str = "IPF_ADDR";
pub const ENV_IPFABRIC_TOKEN: &str = "IPF_TOKEN";
pub const ENV_MAPPINGS_FILE: &str = "INVENTORY_SYNC_CONFIG";

/// User-Agent sent to both APIs
pub const DEFAULT_USER_AGENT: &str = concat!("inventory_sync/", env!("CARGO_PKG_VERSION"));
