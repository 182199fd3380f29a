//! Configuration module for Biblio-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use biblio_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("API queries: {}", config.api.queries.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, CatalogConfig, Config, HttpConfig, OutputConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
