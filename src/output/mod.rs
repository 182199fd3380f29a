//! Output module for the post-collection stages
//!
//! This module handles:
//! - Merging the API and catalog collections into one dataset
//! - Cleaning the merged dataset
//! - Printing run summaries

mod clean;
mod merge;
pub mod stats;

pub use clean::{clean_dataset, clean_records, CleanReport, MissingStat};
pub use merge::{merge_datasets, MergeSummary};
pub use stats::{print_clean_report, print_collection_report, print_merge_summary};
