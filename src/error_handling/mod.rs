//! Error handling and outcome statistics.
//!
//! This module provides:
//! - Error type definitions for every layer (initialization, config, remote, executor, reconcile)
//! - Categorization of per-item remote failures
//! - Outcome statistics tracking (created, updated, removed, skipped, failed)

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{categorize_remote_error, categorize_status};
pub use stats::OutcomeStats;
pub use types::{
    ConfigError, ExecutorError, FailureType, FilterError, FingerprintError, InitializationError,
    OutcomeKind, ReconcileError, RemoteError,
};
