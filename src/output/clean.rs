//! Cleaning of the merged dataset
//!
//! Text columns are normalized, a `year` column is derived from
//! `published_date`, prices are parsed, and implausible numeric values are
//! nulled. Rows are never dropped.

use crate::record::{clean_text, column_union, extract_year, strip_markup, Field, Record, Value};
use crate::storage::{read_table, write_table};
use crate::{HarvestError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Descriptions shorter than this after cleaning are dropped
const MIN_DESCRIPTION_CHARS: usize = 10;

/// Multiplier of the interquartile range beyond which values are outliers
const IQR_FACTOR: f64 = 3.0;

/// Numeric columns checked for negatives and outliers
const OUTLIER_FIELDS: [Field; 4] = [
    Field::Price,
    Field::AverageRating,
    Field::RatingsCount,
    Field::PageCount,
];

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d.]+").unwrap());

/// Missing values of one column
#[derive(Debug, Clone, PartialEq)]
pub struct MissingStat {
    pub column: String,
    pub missing: usize,
    pub percent: f64,
}

/// What cleaning changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub rows: usize,
    pub columns: usize,
    /// Outliers nulled per numeric column
    pub outliers: Vec<(String, usize)>,
    /// Negative values nulled per numeric column
    pub negatives: Vec<(String, usize)>,
    /// Columns with at least one missing value, in column order
    pub missing: Vec<MissingStat>,
}

/// Reads `in_path`, cleans it and writes the result to `out_path`
pub fn clean_dataset(in_path: &Path, out_path: &Path) -> Result<CleanReport> {
    if !in_path.exists() {
        return Err(HarvestError::MissingInput(in_path.display().to_string()));
    }

    let mut records = read_table(in_path)?;
    tracing::info!(
        "Cleaning {} records from {}",
        records.len(),
        in_path.display()
    );

    let report = clean_records(&mut records);
    write_table(out_path, &records)?;

    tracing::info!("Cleaned data saved to {}", out_path.display());
    Ok(report)
}

/// Cleans records in place
pub fn clean_records(records: &mut [Record]) -> CleanReport {
    let has_published_date = records
        .iter()
        .any(|r| r.field(Field::PublishedDate).is_some());

    for record in records.iter_mut() {
        clean_text_field(record, Field::Title, |s| non_empty(clean_text(s)));
        clean_text_field(record, Field::Author, |s| non_empty(clean_text(s)));
        clean_text_field(record, Field::Description, clean_description);

        if has_published_date {
            let year = record
                .field(Field::PublishedDate)
                .and_then(|v| extract_year(&v.to_string()));
            replace_or_remove(record, Field::Year, year);
        }

        if let Some(price) = record.field(Field::Price) {
            let price = parse_price(price);
            replace_or_remove(record, Field::Price, price);
        }
    }

    let mut report = CleanReport::default();
    for field in OUTLIER_FIELDS {
        if !is_numeric_column(records, field) {
            continue;
        }

        let negatives = null_where(records, field, |v| v < 0.0);
        if negatives > 0 {
            tracing::info!("{}: nulled {} negative values", field, negatives);
            report.negatives.push((field.to_string(), negatives));
        }

        let values: Vec<f64> = records
            .iter()
            .filter_map(|r| r.field(field).and_then(Value::as_f64))
            .collect();
        let Some((lower, upper)) = iqr_bounds(values) else {
            continue;
        };

        let outliers = null_where(records, field, |v| v < lower || v > upper);
        if outliers > 0 {
            tracing::info!("{}: nulled {} outliers", field, outliers);
            report.outliers.push((field.to_string(), outliers));
        }
    }

    let columns = column_union(records.iter());
    report.rows = records.len();
    report.columns = columns.len();
    report.missing = missing_values(records, &columns);

    for stat in &report.missing {
        tracing::info!(
            "Missing {}: {} ({:.2}%)",
            stat.column,
            stat.missing,
            stat.percent
        );
    }

    report
}

/// Applies `clean` to a text field, removing it when the result is `None`
fn clean_text_field(record: &mut Record, field: Field, clean: impl Fn(&str) -> Option<String>) {
    let Some(text) = record.text(field) else {
        return;
    };
    let cleaned = clean(text);
    replace_or_remove(record, field, cleaned);
}

/// Sets a field in place, or removes it when there is no value
fn replace_or_remove<V: Into<Value>>(record: &mut Record, field: Field, value: Option<V>) {
    match value {
        Some(value) => record.set(field.as_str(), value),
        None => {
            record.remove(field.as_str());
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn clean_description(text: &str) -> Option<String> {
    let cleaned = clean_text(&strip_markup(text));
    (cleaned.chars().count() >= MIN_DESCRIPTION_CHARS).then_some(cleaned)
}

/// A positive price, from a number or the first number-like run in text
fn parse_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Integer(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Text(s) => PRICE_RE.find(s)?.as_str().parse().ok()?,
    };
    (price > 0.0).then_some(price)
}

/// True if the column is present and every value in it is a number
fn is_numeric_column(records: &[Record], field: Field) -> bool {
    let mut present = records.iter().filter_map(|r| r.field(field)).peekable();
    present.peek().is_some()
        && present.all(|v| matches!(v, Value::Integer(_) | Value::Float(_)))
}

/// Removes values of `field` matching `predicate`, returning how many
fn null_where(records: &mut [Record], field: Field, predicate: impl Fn(f64) -> bool) -> usize {
    let mut nulled = 0;
    for record in records.iter_mut() {
        if record
            .field(field)
            .and_then(Value::as_f64)
            .is_some_and(&predicate)
        {
            record.remove(field.as_str());
            nulled += 1;
        }
    }
    nulled
}

/// `[Q1 - k*IQR, Q3 + k*IQR]` of the values, `None` when there are none
fn iqr_bounds(mut values: Vec<f64>) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let q1 = quantile(&values, 0.25);
    let q3 = quantile(&values, 0.75);
    let iqr = q3 - q1;
    Some((q1 - IQR_FACTOR * iqr, q3 + IQR_FACTOR * iqr))
}

/// Quantile of sorted values with linear interpolation between ranks
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn missing_values(records: &[Record], columns: &[String]) -> Vec<MissingStat> {
    if records.is_empty() {
        return Vec::new();
    }

    columns
        .iter()
        .filter_map(|column| {
            let missing = records.iter().filter(|r| r.get(column).is_none()).count();
            (missing > 0).then(|| MissingStat {
                column: column.clone(),
                missing,
                percent: missing as f64 * 100.0 / records.len() as f64,
            })
        })
        .collect()
}
