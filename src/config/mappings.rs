//! Name mappings and normalization.
//!
//! The mappings file is read once at startup and threaded explicitly to every
//! collector through [`Normalizer`].
//!
//! ```toml
//! [defaults]
//! domain_names = ["example.com"]
//! device_role = "network"
//!
//! [maps.interfaces]
//! Gi = "GigabitEthernet"
//!
//! [maps.models]
//! "WS-C3850-48P" = "cisco-ws-c3850-48p"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error_handling::ConfigError;

/// `[defaults]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Domain suffixes stripped from hostnames
    #[serde(default)]
    pub domain_names: Vec<String>,

    /// Device role slug assigned to devices created in Netbox
    #[serde(default)]
    pub device_role: Option<String>,
}

/// `[maps]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Maps {
    /// Interface abbreviation → full name prefix
    #[serde(default)]
    pub interfaces: BTreeMap<String, String>,

    /// IP Fabric model → Netbox device-type slug
    #[serde(default)]
    pub models: BTreeMap<String, String>,
}

/// Contents of the mappings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mappings {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub maps: Maps,
}

impl Mappings {
    pub fn from_toml(text: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_toml(&text, &display)
    }
}

/// Compiled normalization rules.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    domains: Option<Regex>,
    interfaces: Option<Regex>,
    interface_map: BTreeMap<String, String>,
    models: BTreeMap<String, String>,
    device_role: Option<String>,
}

impl Normalizer {
    pub fn new(mappings: &Mappings) -> Result<Self, ConfigError> {
        let domains = if mappings.defaults.domain_names.is_empty() {
            None
        } else {
            let any_domain = mappings
                .defaults
                .domain_names
                .iter()
                .map(|d| regex::escape(&format!(".{}", d.to_lowercase())))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!("(?:{any_domain})$"))?)
        };

        let interfaces = if mappings.maps.interfaces.is_empty() {
            None
        } else {
            // Longest abbreviation first so "Te" never shadows "TenGig".
            let mut abbrs: Vec<&String> = mappings.maps.interfaces.keys().collect();
            abbrs.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
            let alternation = abbrs
                .iter()
                .map(|a| regex::escape(a))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(
                "^(?P<abbr>{alternation})(?P<rest>[^A-Za-z].*)?$"
            ))?)
        };

        Ok(Normalizer {
            domains,
            interfaces,
            interface_map: mappings.maps.interfaces.clone(),
            models: mappings.maps.models.clone(),
            device_role: mappings.defaults.device_role.clone(),
        })
    }

    /// Lower-cases a hostname and strips any configured domain suffix.
    pub fn normalize_hostname(&self, hostname: &str) -> String {
        let lower = hostname.to_lowercase();
        match &self.domains {
            Some(re) => re.replace(&lower, "").into_owned(),
            None => lower,
        }
    }

    /// Expands an abbreviated interface name (`Gi0/1` → `GigabitEthernet0/1`).
    ///
    /// Names already in long form are returned unchanged.
    pub fn expand_interface(&self, ifname: &str) -> String {
        let Some(re) = &self.interfaces else {
            return ifname.to_string();
        };
        match re.captures(ifname) {
            Some(caps) => {
                let abbr = caps.name("abbr").map_or("", |m| m.as_str());
                let rest = caps.name("rest").map_or("", |m| m.as_str());
                match self.interface_map.get(abbr) {
                    Some(full) => format!("{full}{rest}"),
                    None => ifname.to_string(),
                }
            }
            None => ifname.to_string(),
        }
    }

    /// Netbox device-type slug for an IP Fabric model name.
    pub fn device_type_slug(&self, model: &str) -> String {
        self.models
            .get(model)
            .cloned()
            .unwrap_or_else(|| slugify(model))
    }

    pub fn device_role(&self) -> Option<&str> {
        self.device_role.as_deref()
    }
}

/// Netbox-style slug: lower-case alphanumerics, `_` and `-`, other runs collapsed to `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for ch in value.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[defaults]
domain_names = ["corp.example.com", "example.net"]
device_role = "network"

[maps.interfaces]
Gi = "GigabitEthernet"
Te = "TenGigabitEthernet"
Po = "Port-channel"

[maps.models]
"WS-C3850-48P" = "cisco-ws-c3850-48p"
"#;

    fn normalizer() -> Normalizer {
        Normalizer::new(&Mappings::from_toml(SAMPLE, "sample").unwrap()).unwrap()
    }

    #[test]
    fn test_normalize_hostname_strips_domain() {
        let n = normalizer();
        assert_eq!(n.normalize_hostname("SW1.corp.example.com"), "sw1");
        assert_eq!(n.normalize_hostname("rtr2.EXAMPLE.NET"), "rtr2");
        assert_eq!(n.normalize_hostname("core1.other.org"), "core1.other.org");
    }

    #[test]
    fn test_expand_interface() {
        let n = normalizer();
        assert_eq!(n.expand_interface("Gi0/1"), "GigabitEthernet0/1");
        assert_eq!(n.expand_interface("Te1/0/1"), "TenGigabitEthernet1/0/1");
        assert_eq!(n.expand_interface("Po10"), "Port-channel10");
        assert_eq!(
            n.expand_interface("GigabitEthernet0/1"),
            "GigabitEthernet0/1"
        );
        assert_eq!(n.expand_interface("Ethernet1"), "Ethernet1");
    }

    #[test]
    fn test_device_type_slug() {
        let n = normalizer();
        assert_eq!(n.device_type_slug("WS-C3850-48P"), "cisco-ws-c3850-48p");
        assert_eq!(n.device_type_slug("DCS-7050SX3 48YC8"), "dcs-7050sx3-48yc8");
        assert_eq!(n.device_role(), Some("network"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("ATL 1"), "atl-1");
        assert_eq!(slugify("  New York / DC2 "), "new-york-dc2");
        assert_eq!(slugify("lab_east"), "lab_east");
    }

    #[test]
    fn test_default_normalizer_is_passthrough_except_case() {
        let n = Normalizer::default();
        assert_eq!(n.normalize_hostname("SW1.example.com"), "sw1.example.com");
        assert_eq!(n.expand_interface("Gi0/1"), "Gi0/1");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let mappings = Mappings::load(file.path()).unwrap();
        assert_eq!(mappings.defaults.domain_names.len(), 2);
        assert_eq!(mappings.maps.interfaces.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Mappings::load(Path::new("/nonexistent/inventory_sync.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_defaults_table_is_optional() {
        let mappings =
            Mappings::from_toml("[maps.interfaces]\nGi = \"GigabitEthernet\"\n", "x").unwrap();
        assert!(mappings.defaults.domain_names.is_empty());
        assert_eq!(mappings.defaults.device_role, None);
        let n = Normalizer::new(&mappings).unwrap();
        assert_eq!(n.expand_interface("Gi0/1"), "GigabitEthernet0/1");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Mappings::from_toml("[defaults]\nbogus = 1\n", "x").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
