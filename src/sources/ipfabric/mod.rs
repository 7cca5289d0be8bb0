//! IP Fabric collectors. All are read-only; corrective operations use the
//! skip-everything defaults of [`crate::collector::Collector`].

mod devices;
mod interfaces;
mod ipaddrs;
mod portchans;
mod sites;

pub use devices::IpfDevices;
pub use interfaces::IpfInterfaces;
pub use ipaddrs::IpfIpAddrs;
pub use portchans::IpfPortChannels;
pub use sites::IpfSites;
