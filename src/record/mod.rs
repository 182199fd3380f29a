//! Record module for bibliographic entries
//!
//! A [`Record`] is an ordered mapping from column name to scalar [`Value`].
//! Sources only set the fields they actually provide; a missing field is
//! absent, never an empty placeholder.
//!
//! # Components
//!
//! - `Field`: the known column names shared by the collection, merge and clean stages
//! - `Value`: a text, integer or float cell
//! - `Record`: one bibliographic entry
//! - text helpers for title normalization, year extraction and cleaning

mod field;
mod normalize;
mod value;

pub use field::{Field, FieldKind};
pub use normalize::{clean_text, extract_year, normalize_title, strip_markup, truncate_chars};
pub use value::Value;

/// One bibliographic entry
///
/// Fields keep their insertion order so that written files list columns in
/// the order the source produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under a column name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Returns the value of a known field
    pub fn field(&self, field: Field) -> Option<&Value> {
        self.get(field.as_str())
    }

    /// Returns a known field as text, if it holds text
    pub fn text(&self, field: Field) -> Option<&str> {
        self.field(field).and_then(Value::as_text)
    }

    /// Sets a column, replacing any existing value in place
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Sets a known field when a value is present, leaves it absent otherwise
    pub fn set_opt<V: Into<Value>>(&mut self, field: Field, value: Option<V>) {
        if let Some(value) = value {
            self.set(field.as_str(), value);
        }
    }

    /// Sets a column only if it is not already present
    ///
    /// Returns true if the value was stored.
    pub fn fill(&mut self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let name = name.into();
        if self.get(&name).is_some() {
            return false;
        }
        self.entries.push((name, value.into()));
        true
    }

    /// Copies every column of `other` that this record does not have yet
    pub fn fill_from(&mut self, other: Record) {
        for (name, value) in other.entries {
            self.fill(name, value);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(idx).1)
    }

    /// Column names present in this record, in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Union of all columns populated in any record, in first-seen order
pub fn column_union<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for name in record.columns() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }
    columns
}
