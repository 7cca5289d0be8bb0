//! Collection and source identities.

use std::fmt;

use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;

/// Entity kind held by a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIterMacro)]
pub enum CollectionKind {
    Sites,
    Devices,
    Interfaces,
    IpAddrs,
    PortChannels,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Sites => "sites",
            CollectionKind::Devices => "devices",
            CollectionKind::Interfaces => "interfaces",
            CollectionKind::IpAddrs => "ipaddrs",
            CollectionKind::PortChannels => "portchans",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter().find(|kind| kind.as_str() == name)
    }

    /// Fields every fingerprint of this kind carries, and that the diff compares.
    pub fn fingerprint_fields(&self) -> &'static [&'static str] {
        match self {
            CollectionKind::Sites => &["name"],
            CollectionKind::Devices => &[
                "sn", "hostname", "ipaddr", "site", "os_name", "vendor", "model",
            ],
            CollectionKind::Interfaces => &["hostname", "interface", "description"],
            CollectionKind::IpAddrs => &["ipaddr", "interface", "hostname"],
            CollectionKind::PortChannels => &["hostname", "interface", "portchan"],
        }
    }

    /// Fields forming the key, in order.
    pub fn key_fields(&self) -> &'static [&'static str] {
        match self {
            CollectionKind::Sites => &["name"],
            CollectionKind::Devices => &["sn"],
            CollectionKind::Interfaces => &["hostname", "interface"],
            CollectionKind::IpAddrs => &["hostname", "ipaddr"],
            CollectionKind::PortChannels => &["hostname", "interface"],
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which remote system a collector reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIterMacro)]
pub enum SourceKind {
    /// Source of truth
    IpFabric,
    /// Sync target
    Netbox,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::IpFabric => "ipfabric",
            SourceKind::Netbox => "netbox",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_fields_are_fingerprint_fields() {
        for kind in CollectionKind::iter() {
            for key in kind.key_fields() {
                assert!(
                    kind.fingerprint_fields().contains(key),
                    "{kind}: key field {key} not fingerprinted"
                );
            }
        }
    }

    #[test]
    fn test_names_round_trip() {
        for kind in CollectionKind::iter() {
            assert_eq!(CollectionKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(SourceKind::from_name("netbox"), Some(SourceKind::Netbox));
        assert_eq!(CollectionKind::from_name("vlans"), None);
    }
}
