//! Storage traits and error types
//!
//! This module defines the checkpoint store interface and the errors raised
//! while reading or writing tabular record files.

use crate::record::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing key column '{column}' in {path}")]
    MissingKeyColumn { column: String, path: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable snapshot store for an accumulated record collection
///
/// A checkpoint is always the complete collection, never a delta: every
/// `persist` replaces whatever was stored before.
pub trait CheckpointStore {
    /// Loads the previously persisted collection
    ///
    /// Loading is best-effort. A missing, unreadable or malformed checkpoint
    /// yields an empty collection after logging a warning.
    fn load(&self) -> Vec<Record>;

    /// Replaces the stored collection with `records`
    fn persist(&self, records: &[Record]) -> StorageResult<()>;

    /// Human-readable location of the checkpoint, used in log messages
    fn location(&self) -> String;
}
