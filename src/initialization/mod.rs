//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - Logger
//! - Remote API clients (authentication, timeouts, TLS settings)
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

// Re-export public API
pub use client::{init_ipfabric_client, init_netbox_client};
pub use logger::init_logger_with;
