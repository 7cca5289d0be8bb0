//! inventory_sync library: reconciles IP Fabric inventory into Netbox
//!
//! IP Fabric is the source of truth. For each collection (sites, devices,
//! interfaces, IP addresses, LAG memberships) the library fetches records
//! from both sides, reduces them to comparable fingerprints, computes the
//! difference and applies the corrective Netbox calls through a bounded
//! concurrent executor.
//!
//! # Example
//!
//! ```no_run
//! use inventory_sync::{run_sync, Command, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     netbox_addr: "https://netbox.example.com".into(),
//!     netbox_token: "secret".into(),
//!     ipfabric_addr: "https://ipfabric.example.com".into(),
//!     ipfabric_token: "secret".into(),
//!     dry_run: true,
//!     ..Default::default()
//! };
//!
//! let report = run_sync(config, Command::Sites).await?;
//! println!("{} corrective operations failed", report.stats().total_failures());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod collector;
pub mod config;
pub mod diff;
pub mod error_handling;
pub mod executor;
pub mod initialization;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod remote;
pub mod sources;

// Re-export public API
pub use config::{Command, Config, LogFormat, LogLevel, Opt};
pub use reconcile::{RunReport, SyncReport};

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::collector::SyncOptions;
use crate::config::{Mappings, Normalizer};
use crate::initialization::{init_ipfabric_client, init_netbox_client};
use crate::reconcile::tasks::{self, Scope};
use crate::sources::Sources;

/// Runs one reconciliation command.
///
/// Loads the mappings file, connects both API clients and dispatches
/// `command`. Per-item failures are collected into the returned report; an
/// error means a step could not run at all (bad configuration, failed fetch,
/// malformed records).
///
/// # Errors
///
/// Returns an error if the configuration is incomplete, the mappings file
/// cannot be loaded, a client cannot be built, or a reconciliation step aborts.
pub async fn run_sync(config: Config, command: Command) -> Result<RunReport> {
    config.validate().context("Incomplete configuration")?;

    let mappings = Mappings::load(&config.mappings).context("Failed to load mappings file")?;
    let normalizer = Normalizer::new(&mappings).context("Failed to compile mappings")?;

    let sources = Sources {
        netbox: init_netbox_client(&config).context("Failed to initialize Netbox client")?,
        ipfabric: init_ipfabric_client(&config)
            .context("Failed to initialize IP Fabric client")?,
        normalizer: Arc::new(normalizer),
    };

    let options = SyncOptions {
        dry_run: config.dry_run,
        max_concurrency: config.max_concurrency,
        force_primary_ip: config.force_primary_ip,
    };
    let scope = Scope::new(config.filter.clone(), config.devices.clone());

    if options.dry_run {
        info!("Dry-run mode: differences are reported, Netbox is not changed");
    }

    let start = std::time::Instant::now();
    let mut report = RunReport::new(options.dry_run);
    match command {
        Command::Sites => {
            report.push(tasks::ensure_sites(&sources, &options).await?);
        }
        Command::Devices => {
            let (devices, _) = tasks::ensure_devices(&sources, &options, &scope).await?;
            report.push(devices);
        }
        Command::Interfaces => {
            report.push(tasks::ensure_interfaces(&sources, &options, &scope).await?);
        }
        Command::Ipaddrs => {
            report.push(tasks::ensure_ipaddrs(&sources, &options, &scope).await?);
        }
        Command::Lags => {
            report.push(tasks::ensure_lags(&sources, &options, &scope).await?);
        }
        Command::Onboard => {
            for step in tasks::onboard(&sources, &options, &scope).await? {
                report.push(step);
            }
        }
    }

    report.log_summary();
    info!("Finished in {:.1}s", start.elapsed().as_secs_f64());
    Ok(report)
}
