//! Merging the per-source collections into one dataset

use crate::collector::{API_SOURCE_TAG, CATALOG_SOURCE_TAG};
use crate::record::{Field, Record};
use crate::storage::{read_table_with_columns, write_table_with_columns};
use crate::{HarvestError, Result};
use std::path::Path;

/// Row counts of a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub api_records: usize,
    pub catalog_records: usize,
    /// Columns present in both inputs
    pub common_columns: Vec<String>,
    /// Columns of the merged file
    pub columns: Vec<String>,
}

impl MergeSummary {
    pub fn total(&self) -> usize {
        self.api_records + self.catalog_records
    }
}

/// One input file: its header row and its rows
struct Input {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Input {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HarvestError::MissingInput(path.display().to_string()));
        }
        let (columns, records) = read_table_with_columns(path)?;
        tracing::info!("Loaded {} records from {}", records.len(), path.display());
        Ok(Self { columns, records })
    }

    /// Adds a `source` column holding `tag`, unless the header already has one
    fn tag_source(&mut self, tag: &str) {
        let column = Field::Source.as_str();
        if self.columns.iter().any(|c| c == column) {
            return;
        }
        self.columns.push(column.to_string());
        for record in &mut self.records {
            record.set(column, tag);
        }
    }
}

/// Concatenates the API and catalog collections into `out_path`
///
/// Each input gets a `source` column naming its origin unless it already has
/// one. API rows come first, each input keeps its row order, and the merged
/// header is the union of both inputs' columns.
///
/// # Errors
///
/// Returns `HarvestError::MissingInput` if either input file does not exist.
pub fn merge_datasets(
    api_path: &Path,
    catalog_path: &Path,
    out_path: &Path,
) -> Result<MergeSummary> {
    let mut api = Input::load(api_path)?;
    let mut catalog = Input::load(catalog_path)?;

    api.tag_source(API_SOURCE_TAG);
    catalog.tag_source(CATALOG_SOURCE_TAG);

    let common_columns: Vec<String> = api
        .columns
        .iter()
        .filter(|c| catalog.columns.contains(c))
        .cloned()
        .collect();
    tracing::info!("Common columns: {}", common_columns.join(", "));

    let mut columns = api.columns;
    for column in catalog.columns {
        if !columns.contains(&column) {
            columns.push(column);
        }
    }

    let summary = MergeSummary {
        api_records: api.records.len(),
        catalog_records: catalog.records.len(),
        common_columns,
        columns,
    };

    let mut merged = api.records;
    merged.extend(catalog.records);
    write_table_with_columns(out_path, &summary.columns, &merged)?;

    tracing::info!(
        "Merged {} records into {}",
        summary.total(),
        out_path.display()
    );
    Ok(summary)
}
