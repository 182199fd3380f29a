//! Collector module for paginated record sources
//!
//! This module contains the collection logic, including:
//! - HTTP fetching with per-source retry policies
//! - Parsing of API payloads and catalog HTML pages
//! - Deduplication of records across pages and runs
//! - The generic pagination driver with checkpointing

mod dedup;
mod driver;
mod fetcher;
mod pacing;
mod parser;
mod source;

pub use dedup::{DedupKey, Deduplicator, SeedSummary};
pub use driver::{
    Collection, CollectionReport, Driver, ItemSummary, PaginationPolicy, StopReason,
};
pub use fetcher::{build_http_client, ApiFetcher, FetchFailure, HtmlFetcher};
pub use pacing::{RecordingSleeper, Sleeper, TokioSleeper};
pub use parser::{
    parse_detail, parse_listing, parse_volumes, ParsedPage, API_SOURCE_TAG, CATALOG_SOURCE_TAG,
};
pub use source::{ApiSource, CatalogSource, Source};

use crate::config::Config;
use crate::storage::CsvCheckpoint;
use crate::Result;
use std::time::Duration;
use url::Url;

/// Base wait before the first retry of a catalog page
const CATALOG_RETRY_BASE: Duration = Duration::from_secs(1);

/// Runs a complete API collection
///
/// Seeds from the checkpoint at `api.output-path` unless `fresh` is set,
/// walks every configured query, and leaves the full collection in that file.
///
/// # Returns
///
/// * `Ok(Collection)` - The collected records and the run report
/// * `Err(HarvestError)` - The HTTP client or base URL could not be set up
pub async fn collect_api(config: &Config, fresh: bool) -> Result<Collection> {
    let api = &config.api;
    let client = build_http_client(&config.http, Duration::from_secs(api.timeout_secs))?;
    let base_url = Url::parse(&api.base_url)?;

    let api_key = api.resolved_api_key();
    if api_key.is_none() {
        tracing::warn!("No API key configured, using anonymous access with lower quotas");
    }

    let fetcher = ApiFetcher::new(
        client,
        base_url,
        api_key,
        api.max_retries,
        Duration::from_secs(api.rate_limit_backoff_secs),
        TokioSleeper,
    );
    let store = CsvCheckpoint::new(&api.output_path, DedupKey::Identifier.column().as_str());

    let driver = Driver::new(
        ApiSource::new(fetcher),
        store,
        PaginationPolicy::for_api(config),
        TokioSleeper,
    )
    .with_resume(!fresh);

    Ok(driver.run(&api.queries).await)
}

/// Runs a complete catalog collection
///
/// Same flow as [`collect_api`] over the configured categories, stopping the
/// whole run once `catalog.target-total` records are held.
pub async fn collect_catalog(config: &Config, fresh: bool) -> Result<Collection> {
    let catalog = &config.catalog;
    let client = build_http_client(&config.http, Duration::from_secs(catalog.timeout_secs))?;
    let base_url = Url::parse(&catalog.base_url)?;

    let fetcher = HtmlFetcher::new(client, catalog.max_retries, CATALOG_RETRY_BASE, TokioSleeper);
    let source = CatalogSource::new(
        fetcher,
        base_url,
        &catalog.search_path,
        catalog.fetch_details,
    )?;
    let store = CsvCheckpoint::new(
        &catalog.output_path,
        DedupKey::NormalizedTitle.column().as_str(),
    );

    let driver = Driver::new(
        source,
        store,
        PaginationPolicy::for_catalog(config),
        TokioSleeper,
    )
    .with_resume(!fresh);

    Ok(driver.run(&catalog.categories).await)
}
