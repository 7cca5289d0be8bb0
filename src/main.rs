//! Main application entry point (CLI binary).
//!
//! A thin wrapper around the `inventory_sync` library that handles argument
//! parsing, `.env` loading, logger setup and the exit status.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use inventory_sync::error_handling::OutcomeKind;
use inventory_sync::initialization::init_logger_with;
use inventory_sync::{run_sync, Opt};

#[tokio::main]
async fn main() -> Result<()> {
    // Tokens usually live in .env next to the working directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let (config, command) = Opt::parse().into_parts();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    match run_sync(config, command).await {
        Ok(report) => {
            let stats = report.stats();
            println!(
                "{} step{}: {} created, {} updated, {} removed, {} skipped, {} failed{}",
                report.steps.len(),
                if report.steps.len() == 1 { "" } else { "s" },
                stats.get(OutcomeKind::Created),
                stats.get(OutcomeKind::Updated),
                stats.get(OutcomeKind::Removed),
                stats.get(OutcomeKind::Skipped),
                stats.get(OutcomeKind::Failed),
                if report.dry_run { " (dry-run)" } else { "" },
            );
            if report.has_failures() {
                process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("inventory_sync error: {:#}", e);
            process::exit(1);
        }
    }
}
