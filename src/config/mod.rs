//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, environment variable names)
//! - CLI option types and parsing
//! - The mappings file and the normalization rules compiled from it

mod constants;
mod mappings;
mod types;

// Re-export all constants
pub use constants::*;
pub use mappings::{slugify, Defaults, Mappings, Maps, Normalizer};
pub use types::{Command, Config, LogFormat, LogLevel, Opt};
