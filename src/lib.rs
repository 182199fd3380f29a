//! Biblio-Harvest: a resumable bibliographic record collector
//!
//! This crate collects book records from a paginated JSON API and an HTML
//! catalog site, deduplicates them per source, checkpoints the accumulated
//! records to CSV so long crawls survive interruption, and finally merges and
//! cleans the two collections into one dataset.

pub mod collector;
pub mod config;
pub mod output;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for Biblio-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Missing input file: {0}")]
    MissingInput(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Biblio-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use collector::{CollectionReport, Driver, Source};
pub use config::Config;
pub use record::{Field, Record, Value};
