//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::constants::{
    DEFAULT_API_CONCURRENCY, DEFAULT_MAPPINGS_FILE, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, ENV_IPFABRIC_ADDR, ENV_IPFABRIC_TOKEN,
    ENV_MAPPINGS_FILE, ENV_NETBOX_ADDR, ENV_NETBOX_TOKEN, NETBOX_PAGE_SIZE,
};
use crate::error_handling::ConfigError;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Which reconciliation to run.
#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Ensure every IP Fabric site exists in Netbox
    Sites,
    /// Ensure devices exist in Netbox and are up to date
    Devices,
    /// Ensure device interfaces and their descriptions
    Interfaces,
    /// Ensure interface IP addresses
    Ipaddrs,
    /// Ensure port-channel (LAG) memberships
    Lags,
    /// Onboard devices: devices, then interfaces, ipaddrs, and lags
    Onboard,
}

/// Library configuration (no CLI dependencies).
///
/// This is the core configuration struct used by the library. It can be
/// constructed programmatically without any CLI dependencies.
///
/// # Examples
///
/// ```no_run
/// use inventory_sync::Config;
///
/// let config = Config {
///     netbox_addr: "https://netbox.example.com".into(),
///     netbox_token: "secret".into(),
///     dry_run: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Mappings file (TOML)
    pub mappings: PathBuf,

    /// Netbox base address, e.g. `https://netbox.example.com`
    pub netbox_addr: String,

    /// Netbox API token
    pub netbox_token: String,

    /// IP Fabric base address
    pub ipfabric_addr: String,

    /// IP Fabric API token
    pub ipfabric_token: String,

    /// Maximum corrective operations in flight
    pub max_concurrency: usize,

    /// Maximum concurrent requests per remote client
    pub api_concurrency: usize,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Netbox page size
    pub page_size: usize,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Accept invalid TLS certificates (lab appliances with self-signed certs)
    pub insecure: bool,

    /// Compute and report differences without changing Netbox
    pub dry_run: bool,

    /// Replace a device's primary IP even when one is already set
    pub force_primary_ip: bool,

    /// IP Fabric device inventory filter expression
    pub filter: Option<String>,

    /// IP Fabric hostnames to scope the run to, when no filter is given
    pub devices: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            mappings: PathBuf::from(DEFAULT_MAPPINGS_FILE),
            netbox_addr: String::new(),
            netbox_token: String::new(),
            ipfabric_addr: String::new(),
            ipfabric_token: String::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            api_concurrency: DEFAULT_API_CONCURRENCY,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            page_size: NETBOX_PAGE_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            insecure: false,
            dry_run: false,
            force_primary_ip: false,
            filter: None,
            devices: Vec::new(),
        }
    }
}

impl Config {
    /// Checks the settings the remote clients cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            (&self.netbox_addr, "Netbox address (NETBOX_ADDR)"),
            (&self.netbox_token, "Netbox token (NETBOX_TOKEN)"),
            (&self.ipfabric_addr, "IP Fabric address (IPF_ADDR)"),
            (&self.ipfabric_token, "IP Fabric token (IPF_TOKEN)"),
        ];
        for (value, name) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingValue(name));
            }
        }
        Ok(())
    }
}

/// Command-line options.
///
/// # Examples
///
/// ```bash
/// # Show what would change for devices in one site
/// inventory_sync --dry-run --filter "siteName = atl1" devices
///
/// # Onboard two switches, replacing existing primary IPs
/// inventory_sync --force-primary-ip --device sw1 --device sw2 onboard
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "inventory_sync",
    version,
    about = "Reconciles IP Fabric inventory into Netbox."
)]
pub struct Opt {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Mappings file (TOML)
    #[arg(
        short = 'C',
        long = "config",
        env = ENV_MAPPINGS_FILE,
        default_value = DEFAULT_MAPPINGS_FILE
    )]
    pub mappings: PathBuf,

    /// Netbox base address
    #[arg(long, env = ENV_NETBOX_ADDR)]
    pub netbox_addr: String,

    /// Netbox API token
    #[arg(long, env = ENV_NETBOX_TOKEN, hide_env_values = true)]
    pub netbox_token: String,

    /// IP Fabric base address
    #[arg(long, env = ENV_IPFABRIC_ADDR)]
    pub ipfabric_addr: String,

    /// IP Fabric API token
    #[arg(long, env = ENV_IPFABRIC_TOKEN, hide_env_values = true)]
    pub ipfabric_token: String,

    /// Maximum corrective operations in flight
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Maximum concurrent requests per API
    #[arg(long, default_value_t = DEFAULT_API_CONCURRENCY)]
    pub api_concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Dry-run mode
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// When IP is already set, update IP if different
    #[arg(long, global = true)]
    pub force_primary_ip: bool,

    /// IPF device inventory filter expression
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// Device hostname to act on (repeatable); used when no filter is given
    #[arg(long = "device", global = true)]
    pub devices: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Opt {
    /// Splits the parsed options into library configuration and the command to run.
    pub fn into_parts(self) -> (Config, Command) {
        let config = Config {
            log_level: self.log_level,
            log_format: self.log_format,
            mappings: self.mappings,
            netbox_addr: self.netbox_addr,
            netbox_token: self.netbox_token,
            ipfabric_addr: self.ipfabric_addr,
            ipfabric_token: self.ipfabric_token,
            max_concurrency: self.max_concurrency,
            api_concurrency: self.api_concurrency,
            timeout_seconds: self.timeout_seconds,
            insecure: self.insecure,
            dry_run: self.dry_run,
            force_primary_ip: self.force_primary_ip,
            filter: self.filter,
            devices: self.devices,
            ..Config::default()
        };
        (config, self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Opt {
        let mut argv = vec![
            "inventory_sync",
            "--netbox-addr",
            "https://nb",
            "--netbox-token",
            "nbtok",
            "--ipfabric-addr",
            "https://ipf",
            "--ipfabric-token",
            "ipftok",
        ];
        argv.extend_from_slice(args);
        Opt::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_concurrency, 100);
        assert_eq!(config.api_concurrency, 100);
        assert_eq!(config.timeout_seconds, 120);
        assert_eq!(config.page_size, 100);
        assert!(!config.dry_run);
        assert!(!config.force_primary_ip);
        assert_eq!(config.mappings, PathBuf::from("inventory_sync.toml"));
    }

    #[test]
    fn test_opt_subcommand_and_global_flags() {
        let opt = parse(&["onboard", "--dry-run", "--filter", "siteName = atl1"]);
        let (config, command) = opt.into_parts();
        assert_eq!(command, Command::Onboard);
        assert!(config.dry_run);
        assert_eq!(config.filter.as_deref(), Some("siteName = atl1"));
        assert_eq!(config.netbox_addr, "https://nb");
    }

    #[test]
    fn test_opt_requires_subcommand() {
        let argv = [
            "inventory_sync",
            "--netbox-addr",
            "a",
            "--netbox-token",
            "b",
            "--ipfabric-addr",
            "c",
            "--ipfabric-token",
            "d",
        ];
        assert!(Opt::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_opt_repeated_device() {
        let (config, _) = parse(&["interfaces", "--device", "sw1", "--device", "sw2"]).into_parts();
        assert_eq!(config.devices, vec!["sw1".to_string(), "sw2".to_string()]);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_validate_reports_first_missing_setting() {
        let config = Config {
            netbox_addr: "https://nb".into(),
            netbox_token: "  ".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingValue("Netbox token (NETBOX_TOKEN)")
        ));

        let (config, _) = parse(&["sites"]).into_parts();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_opt_timeout_flag() {
        let (config, command) = parse(&["--timeout", "5", "sites"]).into_parts();
        assert_eq!(command, Command::Sites);
        assert_eq!(config.timeout_seconds, 5);
    }
}
