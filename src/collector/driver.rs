//! Collection driver - the pagination loop shared by every source
//!
//! The driver walks a worklist of items (queries or categories) in order.
//! For each item it pages through the source until a stop condition holds,
//! admitting new records through the [`Deduplicator`] and checkpointing the
//! whole collection as it grows. Everything runs sequentially on the calling
//! task; every wait goes through the injected [`Sleeper`].

use crate::collector::dedup::Deduplicator;
use crate::collector::pacing::{Sleeper, TokioSleeper};
use crate::collector::source::Source;
use crate::config::Config;
use crate::record::Record;
use crate::storage::CheckpointStore;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Listing entries per catalog search page, fixed by the site
const CATALOG_PAGE_SIZE: usize = 25;

/// Pagination limits and pacing of one collection run
#[derive(Debug, Clone)]
pub struct PaginationPolicy {
    /// Cursor of the first page of every item
    pub start_cursor: usize,
    /// Items requested per page
    pub page_size: usize,
    /// Stop an item once its cursor reaches this offset
    pub max_offset: usize,
    /// Maximum page requests per item
    pub max_requests: usize,
    /// Stop an item after this many consecutive pages without new records
    pub max_stale_pages: Option<usize>,
    /// Halt the whole run once the collection holds this many records
    pub target_total: Option<usize>,
    pub page_delay: Duration,
    pub item_delay: Duration,
    /// Persist whenever the collection size crosses a multiple of this (0 disables)
    pub checkpoint_interval: usize,
}

impl PaginationPolicy {
    /// Policy of the volumes API: 0-based cursor, no stale-page limit
    pub fn for_api(config: &Config) -> Self {
        let api = &config.api;
        Self {
            start_cursor: 0,
            page_size: api.page_size as usize,
            max_offset: api.max_per_query as usize,
            max_requests: api.max_requests as usize,
            max_stale_pages: api.max_stale_pages.map(|n| n as usize),
            target_total: api.target_total.map(|n| n as usize),
            page_delay: Duration::from_millis(api.page_delay_ms),
            item_delay: Duration::from_millis(api.query_delay_ms),
            checkpoint_interval: config.output.checkpoint_interval as usize,
        }
    }

    /// Policy of the catalog site: 1-based cursor
    pub fn for_catalog(config: &Config) -> Self {
        let catalog = &config.catalog;
        Self {
            start_cursor: 1,
            page_size: CATALOG_PAGE_SIZE,
            max_offset: catalog.max_offset as usize,
            max_requests: catalog.max_requests as usize,
            max_stale_pages: catalog.max_stale_pages.map(|n| n as usize),
            target_total: catalog.target_total.map(|n| n as usize),
            page_delay: Duration::from_millis(catalog.page_delay_ms),
            item_delay: Duration::from_millis(catalog.category_delay_ms),
            checkpoint_interval: config.output.checkpoint_interval as usize,
        }
    }
}

/// Why pagination of an item ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source returned a page without items
    Exhausted,
    /// The cursor reached the per-item offset ceiling
    OffsetLimit,
    /// The per-item request budget is spent
    RequestLimit,
    /// A page could not be fetched
    FetchFailed,
    /// Too many consecutive pages admitted nothing new
    StalePages,
    /// The collection reached the global target
    TargetReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Exhausted => "no more results",
            Self::OffsetLimit => "offset limit",
            Self::RequestLimit => "request limit",
            Self::FetchFailed => "fetch failed",
            Self::StalePages => "no new records",
            Self::TargetReached => "target reached",
        };
        f.write_str(text)
    }
}

/// Outcome of one worklist item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSummary {
    pub item: String,
    /// New records admitted for this item
    pub collected: usize,
    /// Collection size after this item
    pub total: usize,
    /// Pages requested
    pub pages: usize,
    pub stop: StopReason,
}

/// Summary of a collection run
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records carried over from the checkpoint
    pub prior_records: usize,
    pub items: Vec<ItemSummary>,
    pub total_records: usize,
    pub checkpoints_written: usize,
    pub checkpoint_failures: usize,
}

impl CollectionReport {
    /// Records admitted during this run
    pub fn new_records(&self) -> usize {
        self.total_records.saturating_sub(self.prior_records)
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Records of a finished run together with its report
#[derive(Debug, Clone)]
pub struct Collection {
    pub records: Vec<Record>,
    pub report: CollectionReport,
}

/// Generic pagination driver
pub struct Driver<Src, St, S = TokioSleeper> {
    source: Src,
    store: St,
    policy: PaginationPolicy,
    sleeper: S,
    resume: bool,
}

impl<Src, St, S> Driver<Src, St, S>
where
    Src: Source,
    St: CheckpointStore,
    S: Sleeper,
{
    pub fn new(source: Src, store: St, policy: PaginationPolicy, sleeper: S) -> Self {
        Self {
            source,
            store,
            policy,
            sleeper,
            resume: true,
        }
    }

    /// Whether to seed the run from the existing checkpoint (default true)
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    /// Collects records for every item of `worklist`, in order
    ///
    /// Never fails: fetch failures end the current item and checkpoint
    /// failures are logged and counted in the report.
    pub async fn run(&self, worklist: &[String]) -> Collection {
        let started_at = Utc::now();
        let mut dedup = Deduplicator::new(self.source.dedup_key());

        let prior_records = if self.resume {
            let seeded = dedup.seed(self.store.load());
            if seeded.missing_key > 0 || seeded.duplicates > 0 {
                tracing::warn!(
                    "Dropped {} checkpoint rows without a key and {} duplicate rows",
                    seeded.missing_key,
                    seeded.duplicates
                );
            }
            seeded.kept
        } else {
            tracing::info!("Fresh run, ignoring checkpoint at {}", self.store.location());
            0
        };

        tracing::info!(
            "Collecting from {} over {} items, starting with {} records",
            self.source.name(),
            worklist.len(),
            prior_records
        );

        let mut checkpointer =
            Checkpointer::new(&self.store, self.policy.checkpoint_interval, dedup.len());
        let mut items = Vec::with_capacity(worklist.len());

        for (idx, item) in worklist.iter().enumerate() {
            if self.target_reached(&dedup) {
                tracing::info!("Target of {} records reached, stopping", dedup.len());
                break;
            }

            tracing::info!("[{}/{}] Processing: {}", idx + 1, worklist.len(), item);
            let summary = self.collect_item(item, &mut dedup, &mut checkpointer).await;
            tracing::info!(
                "Collected {} records for '{}' (total: {}, {})",
                summary.collected,
                summary.item,
                summary.total,
                summary.stop
            );
            let halt = summary.stop == StopReason::TargetReached;
            items.push(summary);

            if !dedup.is_empty() {
                checkpointer.persist(dedup.records());
            }

            if halt || idx + 1 == worklist.len() {
                continue;
            }
            self.sleeper.sleep(self.policy.item_delay).await;
        }

        checkpointer.persist(dedup.records());

        let report = CollectionReport {
            source: self.source.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            prior_records,
            items,
            total_records: dedup.len(),
            checkpoints_written: checkpointer.written,
            checkpoint_failures: checkpointer.failures,
        };

        tracing::info!(
            "Finished {}: {} records ({} new)",
            report.source,
            report.total_records,
            report.new_records()
        );

        Collection {
            records: dedup.into_records(),
            report,
        }
    }

    async fn collect_item(
        &self,
        item: &str,
        dedup: &mut Deduplicator,
        checkpointer: &mut Checkpointer<'_, St>,
    ) -> ItemSummary {
        let mut cursor = self.policy.start_cursor;
        let mut pages = 0;
        let mut stale = 0;
        let mut collected = 0;

        let stop = loop {
            if self.target_reached(dedup) {
                break StopReason::TargetReached;
            }
            if cursor >= self.policy.max_offset {
                break StopReason::OffsetLimit;
            }
            if pages >= self.policy.max_requests {
                break StopReason::RequestLimit;
            }

            tracing::debug!("Requesting '{}' from {}", item, cursor);
            let raw = self.source.fetch(item, cursor, self.policy.page_size).await;
            pages += 1;

            let page = match raw {
                Ok(raw) => self.source.parse(raw),
                Err(e) => {
                    tracing::warn!("No page for '{}' at {}: {}", item, cursor, e);
                    break StopReason::FetchFailed;
                }
            };

            if page.item_count == 0 {
                break StopReason::Exhausted;
            }

            let mut admitted = 0;
            for mut record in page.records {
                if self.target_reached(dedup) {
                    break;
                }
                if !dedup.is_new(&record) {
                    continue;
                }
                self.source.enrich(&mut record).await;
                if dedup.admit(record) {
                    admitted += 1;
                }
            }
            collected += admitted;
            tracing::debug!(
                "Page at {} gave {} items, {} new (total: {})",
                cursor,
                page.item_count,
                admitted,
                dedup.len()
            );

            checkpointer.on_growth(dedup.records());
            cursor += page.item_count;

            if self.target_reached(dedup) {
                break StopReason::TargetReached;
            }

            if admitted == 0 {
                stale += 1;
                if self.policy.max_stale_pages.is_some_and(|max| stale >= max) {
                    break StopReason::StalePages;
                }
            } else {
                stale = 0;
            }

            self.sleeper.sleep(self.policy.page_delay).await;
        };

        ItemSummary {
            item: item.to_string(),
            collected,
            total: dedup.len(),
            pages,
            stop,
        }
    }

    fn target_reached(&self, dedup: &Deduplicator) -> bool {
        self.policy
            .target_total
            .is_some_and(|target| dedup.len() >= target)
    }
}

/// Persistence bookkeeping of one run
struct Checkpointer<'a, St> {
    store: &'a St,
    interval: usize,
    /// Highest interval multiple covered by a successful persist
    mark: usize,
    written: usize,
    failures: usize,
}

impl<'a, St: CheckpointStore> Checkpointer<'a, St> {
    fn new(store: &'a St, interval: usize, initial_len: usize) -> Self {
        let mark = if interval == 0 { 0 } else { initial_len / interval };
        Self {
            store,
            interval,
            mark,
            written: 0,
            failures: 0,
        }
    }

    /// Persists when the collection crossed a new interval multiple
    fn on_growth(&mut self, records: &[Record]) {
        if self.interval == 0 {
            return;
        }
        let multiple = records.len() / self.interval;
        if multiple > self.mark && self.persist(records) {
            self.mark = multiple;
        }
    }

    fn persist(&mut self, records: &[Record]) -> bool {
        match self.store.persist(records) {
            Ok(()) => {
                self.written += 1;
                tracing::info!(
                    "Checkpoint: {} records saved to {}",
                    records.len(),
                    self.store.location()
                );
                true
            }
            Err(e) => {
                self.failures += 1;
                tracing::error!("Failed to save checkpoint {}: {}", self.store.location(), e);
                false
            }
        }
    }
}
