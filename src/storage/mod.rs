//! Storage module for persisting collected records
//!
//! This module handles the tabular files the collector reads and writes:
//! - Loading a previous checkpoint at startup
//! - Wholesale, rename-into-place persistence of the accumulated collection
//! - Plain table reads and writes for the merge and clean stages

mod csv_store;
mod traits;

pub use csv_store::{
    read_table, read_table_with_columns, write_table, write_table_with_columns, CsvCheckpoint,
};
pub use traits::{CheckpointStore, StorageError, StorageResult};
