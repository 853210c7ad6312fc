//! Configuration module for Storefront-Probe
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use storefront_probe::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("probe.toml")).unwrap();
//! println!("Probing with concurrency: {}", config.probe.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FieldMapping, InputConfig, OutputConfig, PlatformSignatures, ProbeConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
