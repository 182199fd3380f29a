//! Page parsers for both sources
//!
//! This module turns one raw response into candidate records:
//! - Volumes API JSON payloads (`items` array)
//! - Catalog search listings (`li.booklink` elements)
//! - Catalog detail pages, used to enrich a listing record
//!
//! Each field is read by a small accessor that returns `None` when the
//! structure is missing, so a malformed page yields a partial or empty
//! result, never an error.

use crate::record::{extract_year, truncate_chars, Field, Record};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value as Json;
use url::Url;

/// Source tag of volumes API records
pub const API_SOURCE_TAG: &str = "google_books_api";

/// Source tag of catalog records
pub const CATALOG_SOURCE_TAG: &str = "project_gutenberg";

/// Separator for multi-valued fields (authors, categories, subjects)
const LIST_SEPARATOR: &str = ", ";

/// Detail descriptions shorter than this are navigation noise
const MIN_DESCRIPTION_CHARS: usize = 50;
const MAX_DESCRIPTION_CHARS: usize = 1000;
const MAX_SUBJECTS: usize = 5;

/// Candidate records of one page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Records extracted from the page, in page order
    pub records: Vec<Record>,

    /// Raw items seen on the page before any filtering
    ///
    /// The pagination cursor advances by this amount, so it also counts
    /// items that produced no record. Zero means the source is exhausted.
    pub item_count: usize,
}

// ===== Volumes API =====

/// Parses a volumes API payload
///
/// # Example
///
/// ```
/// use biblio_harvest::collector::parse_volumes;
/// use biblio_harvest::record::Field;
///
/// let payload = serde_json::json!({
///     "items": [{"id": "zyTCAlFPjgYC", "volumeInfo": {"title": "The Google Story"}}]
/// });
/// let page = parse_volumes(&payload);
/// assert_eq!(page.item_count, 1);
/// assert_eq!(page.records[0].text(Field::Title), Some("The Google Story"));
/// ```
pub fn parse_volumes(payload: &Json) -> ParsedPage {
    let items = payload
        .get("items")
        .and_then(Json::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    ParsedPage {
        records: items.iter().map(parse_volume).collect(),
        item_count: items.len(),
    }
}

fn parse_volume(item: &Json) -> Record {
    let info = item.get("volumeInfo");
    let info_text = |key: &str| info.and_then(|i| json_text(i, key));

    let mut record = Record::new();
    record.set_opt(Field::Id, json_text(item, "id"));
    record.set_opt(Field::Title, info_text("title"));
    record.set_opt(Field::Author, info.and_then(|i| json_joined(i, "authors")));
    record.set_opt(Field::Publisher, info_text("publisher"));
    record.set_opt(Field::PublishedDate, info_text("publishedDate"));
    record.set_opt(Field::Description, info_text("description"));
    record.set_opt(
        Field::Categories,
        info.and_then(|i| json_joined(i, "categories")),
    );
    record.set_opt(Field::Language, info_text("language"));
    record.set_opt(Field::PageCount, info.and_then(|i| json_int(i, "pageCount")));
    record.set_opt(
        Field::AverageRating,
        info.and_then(|i| json_float(i, "averageRating")),
    );
    record.set_opt(
        Field::RatingsCount,
        info.and_then(|i| json_int(i, "ratingsCount")),
    );
    record.set_opt(
        Field::Thumbnail,
        info.and_then(|i| i.get("imageLinks"))
            .and_then(|links| json_text(links, "thumbnail")),
    );
    record.set(Field::Source.as_str(), API_SOURCE_TAG);
    record
}

fn json_text(value: &Json, key: &str) -> Option<String> {
    value
        .get(key)?
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn json_int(value: &Json, key: &str) -> Option<i64> {
    value.get(key)?.as_i64()
}

fn json_float(value: &Json, key: &str) -> Option<f64> {
    value.get(key)?.as_f64()
}

/// Joins a string array, `None` when absent or empty
fn json_joined(value: &Json, key: &str) -> Option<String> {
    let parts: Vec<&str> = value
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(Json::as_str)
        .collect();
    (!parts.is_empty()).then(|| parts.join(LIST_SEPARATOR))
}

// ===== Catalog listing =====

/// Parses a catalog search page
///
/// Every `li.booklink` counts as a raw item; entries without a title produce
/// no record. Detail links are resolved against `base_url`.
pub fn parse_listing(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let Some(booklink) = selector("li.booklink") else {
        return ParsedPage::default();
    };

    let entries: Vec<ElementRef> = document.select(&booklink).collect();
    ParsedPage {
        records: entries
            .iter()
            .filter_map(|entry| parse_listing_entry(*entry, base_url))
            .collect(),
        item_count: entries.len(),
    }
}

fn parse_listing_entry(entry: ElementRef, base_url: &Url) -> Option<Record> {
    let title = first_text(entry, "span.title")?;

    let mut record = Record::new();
    record.set(Field::Source.as_str(), CATALOG_SOURCE_TAG);
    record.set(Field::Title.as_str(), title);
    record.set_opt(Field::Author, first_text(entry, "span.subtitle"));
    record.set_opt(Field::DetailLink, detail_link(entry, base_url));
    Some(record)
}

fn detail_link(entry: ElementRef, base_url: &Url) -> Option<String> {
    let anchor = entry.select(&selector("a")?).next()?;
    let href = anchor.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    base_url.join(href).ok().map(String::from)
}

// ===== Catalog detail page =====

/// Extracts enrichment fields from a catalog detail page
///
/// Produces any of: `description`, one column per row of the bibliographic
/// table (`release_date`, `language`, ...), `year` when the release date
/// names one, and `subjects`. Missing structure simply yields fewer fields.
pub fn parse_detail(html: &str) -> Record {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut details = Record::new();

    details.set_opt(Field::Description, detail_description(root));

    for (key, value) in bibliographic_rows(root) {
        if key == "release_date" {
            details.set_opt(Field::Year, extract_year(&value));
        }
        details.set(key, value);
    }

    details.set_opt(Field::Subjects, detail_subjects(root));
    details
}

fn detail_description(root: ElementRef) -> Option<String> {
    let text = first_text(root, "div.bibrec")?;
    (text.chars().count() > MIN_DESCRIPTION_CHARS)
        .then(|| truncate_chars(&text, MAX_DESCRIPTION_CHARS))
}

/// `th`/`td` pairs of the bibliographic table, keys snake-cased
fn bibliographic_rows(root: ElementRef) -> Vec<(String, String)> {
    let (Some(rows), Some(th), Some(td)) = (
        selector("table.bibrec tr"),
        selector("th"),
        selector("td"),
    ) else {
        return Vec::new();
    };

    root.select(&rows)
        .filter_map(|row| {
            let key = element_text(row.select(&th).next()?)?;
            let value = element_text(row.select(&td).next()?)?;
            Some((key.to_lowercase().replace(' ', "_"), value))
        })
        .collect()
}

/// Link texts of the subject rows, capped and joined
fn detail_subjects(root: ElementRef) -> Option<String> {
    let (rows, header, value_cell, link) = (
        selector("table.bibrec tr")?,
        selector("th, td")?,
        selector("td.field_value, td")?,
        selector("a")?,
    );

    let subjects: Vec<String> = root
        .select(&rows)
        .filter(|row| {
            row.select(&header)
                .next()
                .and_then(element_text)
                .is_some_and(|label| label.to_lowercase().contains("subject"))
        })
        .filter_map(|row| row.select(&value_cell).last())
        .flat_map(|cell| cell.select(&link).filter_map(element_text).collect::<Vec<_>>())
        .take(MAX_SUBJECTS)
        .collect();

    (!subjects.is_empty()).then(|| subjects.join(LIST_SEPARATOR))
}

// ===== Helpers =====

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Text of the first element matching `css` below `scope`
fn first_text(scope: ElementRef, css: &str) -> Option<String> {
    element_text(scope.select(&selector(css)?).next()?)
}

/// Element text with each fragment trimmed, `None` when blank
fn element_text(element: ElementRef) -> Option<String> {
    let text = element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}
