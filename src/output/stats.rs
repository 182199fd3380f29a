//! Console summaries of collection, merge and clean runs

use crate::collector::CollectionReport;
use crate::output::{CleanReport, MergeSummary};

/// Prints a collection report to stdout
///
/// # Arguments
///
/// * `report` - The report returned by a collection run
pub fn print_collection_report(report: &CollectionReport) {
    println!("=== Collection: {} ===\n", report.source);

    println!("Overview:");
    println!("  Records loaded from checkpoint: {}", report.prior_records);
    println!("  New records: {}", report.new_records());
    println!("  Total records: {}", report.total_records);
    println!("  Duration: {}s", report.elapsed().num_seconds().max(0));
    println!();

    if !report.items.is_empty() {
        println!("Items ({}):", report.items.len());
        for summary in &report.items {
            println!(
                "  {}: +{} (total {}, {} pages, {})",
                summary.item, summary.collected, summary.total, summary.pages, summary.stop
            );
        }
        println!();
    }

    println!(
        "Checkpoints: {} written, {} failed",
        report.checkpoints_written, report.checkpoint_failures
    );
}

/// Prints a merge summary to stdout
pub fn print_merge_summary(summary: &MergeSummary) {
    println!("=== Merged Dataset ===\n");
    println!("  API records: {}", summary.api_records);
    println!("  Catalog records: {}", summary.catalog_records);
    println!("  Total records: {}", summary.total());
    println!("  Columns ({}): {}", summary.columns.len(), summary.columns.join(", "));
}

/// Prints a clean report to stdout
pub fn print_clean_report(report: &CleanReport) {
    println!("=== Cleaned Dataset ===\n");
    println!("  Records: {}", report.rows);
    println!("  Columns: {}", report.columns);
    println!();

    if !report.negatives.is_empty() || !report.outliers.is_empty() {
        println!("Nulled Values:");
        for (column, count) in &report.negatives {
            println!("  {}: {} negative", column, count);
        }
        for (column, count) in &report.outliers {
            println!("  {}: {} outliers", column, count);
        }
        println!();
    }

    if report.missing.is_empty() {
        println!("No missing values");
        return;
    }

    println!("Missing Values:");
    for stat in &report.missing {
        println!("  {}: {} ({:.2}%)", stat.column, stat.missing, stat.percent);
    }
}
