//! CSV checkpoint implementation
//!
//! Records are written with a header row holding the union of all populated
//! columns. Empty cells are absent values.

use crate::record::{column_union, Field, FieldKind, Record, Value};
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Checkpoint store backed by a single CSV file
#[derive(Debug, Clone)]
pub struct CsvCheckpoint {
    path: PathBuf,
    key_column: String,
}

impl CsvCheckpoint {
    /// Creates a checkpoint store
    ///
    /// # Arguments
    ///
    /// * `path` - The CSV file holding the collection
    /// * `key_column` - Column that must be present for a checkpoint to be usable
    pub fn new(path: impl Into<PathBuf>, key_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key_column: key_column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict load used by [`CheckpointStore::load`]
    fn try_load(&self) -> StorageResult<Vec<Record>> {
        let (headers, records) = read_table_with_columns(&self.path)?;

        if !headers.iter().any(|h| *h == self.key_column) {
            return Err(StorageError::MissingKeyColumn {
                column: self.key_column.clone(),
                path: self.path.display().to_string(),
            });
        }

        Ok(records)
    }
}

impl CheckpointStore for CsvCheckpoint {
    fn load(&self) -> Vec<Record> {
        if !self.path.exists() {
            tracing::info!("No checkpoint at {}, starting empty", self.path.display());
            return Vec::new();
        }

        tracing::info!("Loading existing records from {}", self.path.display());
        match self.try_load() {
            Ok(records) => {
                tracing::info!("Loaded {} existing records", records.len());
                records
            }
            Err(e) => {
                tracing::warn!(
                    "Could not load checkpoint {}: {}; starting empty",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn persist(&self, records: &[Record]) -> StorageResult<()> {
        write_table(&self.path, records)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Reads every row of a CSV file into records
///
/// Known numeric columns are typed; every other cell is kept as text.
pub fn read_table(path: &Path) -> StorageResult<Vec<Record>> {
    read_table_with_columns(path).map(|(_, records)| records)
}

/// Like [`read_table`], but also returns the header row
///
/// A column is listed even when every cell under it is empty.
pub fn read_table_with_columns(path: &Path) -> StorageResult<(Vec<String>, Vec<Record>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let kinds: Vec<FieldKind> = headers
        .iter()
        .map(|h| Field::from_name(h).map_or(FieldKind::Text, |f| f.kind()))
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Record::new();
        for ((name, kind), cell) in headers.iter().zip(&kinds).zip(row.iter()) {
            if let Some(value) = Value::from_cell(cell, *kind) {
                record.set(name.as_str(), value);
            }
        }
        records.push(record);
    }

    Ok((headers, records))
}

/// Writes records to a CSV file, replacing it wholesale
///
/// The table is first written to a sibling temporary file which is then
/// renamed over the destination, so a failed write never truncates the
/// previous checkpoint.
pub fn write_table(path: &Path, records: &[Record]) -> StorageResult<()> {
    write_table_with_columns(path, &column_union(records), records)
}

/// Writes records under an explicit header row
///
/// Columns with no values still appear in the header. Values under names
/// missing from `columns` are not written.
pub fn write_table_with_columns(
    path: &Path,
    columns: &[String],
    records: &[Record],
) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temporary_path(path);
    if let Err(e) = write_csv(&tmp_path, columns, records) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn write_csv(path: &Path, columns: &[String], records: &[Record]) -> StorageResult<()> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);

    if !columns.is_empty() {
        writer.write_record(columns)?;
    }

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|c| record.get(c).map(Value::to_string).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
