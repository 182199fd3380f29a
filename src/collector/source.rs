//! Record sources
//!
//! The collection driver is generic over [`Source`], the small capability
//! set that differs between the two remote sites: how to fetch a page, how
//! to parse it, how to key a record, and optionally how to enrich one.

use crate::collector::dedup::DedupKey;
use crate::collector::fetcher::{ApiFetcher, FetchFailure, HtmlFetcher};
use crate::collector::pacing::Sleeper;
use crate::collector::parser::{parse_detail, parse_listing, parse_volumes, ParsedPage};
use crate::record::{Field, Record};
use std::future::Future;
use url::Url;

/// A paginated remote source of records
pub trait Source {
    /// Raw response of one page, before parsing
    type Raw;

    /// Short name used in log messages and reports
    fn name(&self) -> &str;

    /// How records of this source are deduplicated
    fn dedup_key(&self) -> DedupKey;

    /// Fetches the page of `item` starting at `cursor`
    fn fetch(
        &self,
        item: &str,
        cursor: usize,
        page_size: usize,
    ) -> impl Future<Output = Result<Self::Raw, FetchFailure>>;

    /// Parses a fetched page into candidate records
    fn parse(&self, raw: Self::Raw) -> ParsedPage;

    /// Adds fields to a record that is about to be admitted
    ///
    /// Must not change the record's dedup key. The default does nothing.
    fn enrich(&self, record: &mut Record) -> impl Future<Output = ()> {
        let _ = record;
        async {}
    }
}

/// The JSON volumes API
pub struct ApiSource<S> {
    fetcher: ApiFetcher<S>,
}

impl<S: Sleeper> ApiSource<S> {
    pub fn new(fetcher: ApiFetcher<S>) -> Self {
        Self { fetcher }
    }
}

impl<S: Sleeper> Source for ApiSource<S> {
    type Raw = serde_json::Value;

    fn name(&self) -> &str {
        "volumes-api"
    }

    fn dedup_key(&self) -> DedupKey {
        DedupKey::Identifier
    }

    fn fetch(
        &self,
        item: &str,
        cursor: usize,
        page_size: usize,
    ) -> impl Future<Output = Result<Self::Raw, FetchFailure>> {
        self.fetcher.fetch(item, cursor, page_size)
    }

    fn parse(&self, raw: Self::Raw) -> ParsedPage {
        parse_volumes(&raw)
    }
}

/// The HTML catalog site
pub struct CatalogSource<S> {
    fetcher: HtmlFetcher<S>,
    base_url: Url,
    search_url: Url,
    fetch_details: bool,
}

impl<S: Sleeper> CatalogSource<S> {
    /// Creates a catalog source
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetcher for search and detail pages
    /// * `base_url` - Site root, used to resolve relative detail links
    /// * `search_path` - Search endpoint below the site root
    /// * `fetch_details` - Whether to visit detail pages of new records
    pub fn new(
        fetcher: HtmlFetcher<S>,
        base_url: Url,
        search_path: &str,
        fetch_details: bool,
    ) -> Result<Self, url::ParseError> {
        let search_url = base_url.join(search_path)?;
        Ok(Self {
            fetcher,
            base_url,
            search_url,
            fetch_details,
        })
    }

    /// Search URL of one listing page
    pub fn search_url(&self, item: &str, cursor: usize) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("query", item)
            .append_pair("start_index", &cursor.to_string());
        url
    }
}

impl<S: Sleeper> Source for CatalogSource<S> {
    type Raw = String;

    fn name(&self) -> &str {
        "catalog"
    }

    fn dedup_key(&self) -> DedupKey {
        DedupKey::NormalizedTitle
    }

    /// The catalog's page size is fixed server-side, so `page_size` is unused
    async fn fetch(
        &self,
        item: &str,
        cursor: usize,
        _page_size: usize,
    ) -> Result<Self::Raw, FetchFailure> {
        let url = self.search_url(item, cursor);
        self.fetcher.fetch(&url).await
    }

    fn parse(&self, raw: Self::Raw) -> ParsedPage {
        parse_listing(&raw, &self.base_url)
    }

    async fn enrich(&self, record: &mut Record) {
        if !self.fetch_details {
            return;
        }

        let Some(link) = record
            .text(Field::DetailLink)
            .and_then(|link| Url::parse(link).ok())
        else {
            return;
        };

        match self.fetcher.fetch(&link).await {
            Ok(body) => record.fill_from(parse_detail(&body)),
            Err(e) => tracing::warn!("No details for {}: {}", link, e),
        }
    }
}
