//! Biblio-Harvest main entry point
//!
//! This is the command-line interface for the bibliographic record collector.

use anyhow::{Context, Result};
use biblio_harvest::collector::{collect_api, collect_catalog};
use biblio_harvest::config::{load_config_with_hash, Config};
use biblio_harvest::output::{
    clean_dataset, merge_datasets, print_clean_report, print_collection_report,
    print_merge_summary,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Biblio-Harvest: a resumable bibliographic record collector
///
/// Collects book records from a JSON volumes API and an HTML catalog site,
/// checkpointing progress so interrupted runs pick up where they left off,
/// then merges and cleans both collections into one dataset.
#[derive(Parser, Debug)]
#[command(name = "biblio-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable bibliographic record collector", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore existing checkpoints and collect from scratch
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be collected without collecting
    #[arg(long, conflicts_with_all = ["api_only", "catalog_only", "merge_only", "clean_only"])]
    dry_run: bool,

    /// Only run the API collection
    #[arg(long, conflicts_with_all = ["dry_run", "catalog_only", "merge_only", "clean_only"])]
    api_only: bool,

    /// Only run the catalog collection
    #[arg(long, conflicts_with_all = ["dry_run", "api_only", "merge_only", "clean_only"])]
    catalog_only: bool,

    /// Only merge the existing collections
    #[arg(long, conflicts_with_all = ["dry_run", "api_only", "catalog_only", "clean_only"])]
    merge_only: bool,

    /// Only clean the existing merged dataset
    #[arg(long, conflicts_with_all = ["dry_run", "api_only", "catalog_only", "merge_only"])]
    clean_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let run_all = !(cli.api_only || cli.catalog_only || cli.merge_only || cli.clean_only);

    if run_all || cli.api_only {
        run_api(&config, cli.fresh).await?;
    }
    if run_all || cli.catalog_only {
        run_catalog(&config, cli.fresh).await?;
    }
    if run_all || cli.merge_only {
        run_merge(&config)?;
    }
    if run_all || cli.clean_only {
        run_clean(&config)?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("biblio_harvest=info,warn"),
            1 => EnvFilter::new("biblio_harvest=debug,info"),
            2 => EnvFilter::new("biblio_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Biblio-Harvest Dry Run ===\n");

    println!("Volumes API:");
    println!("  Endpoint: {}", config.api.base_url);
    println!(
        "  API key: {}",
        if config.api.resolved_api_key().is_some() {
            "configured"
        } else {
            "none (anonymous)"
        }
    );
    println!("  Page size: {}", config.api.page_size);
    println!("  Max per query: {}", config.api.max_per_query);
    println!("  Output: {}", config.api.output_path);
    println!("  Queries ({}): {}", config.api.queries.len(), config.api.queries.join(", "));

    println!("\nCatalog:");
    println!("  Site: {}", config.catalog.base_url);
    match config.catalog.target_total {
        Some(target) => println!("  Target records: {}", target),
        None => println!("  Target records: unlimited"),
    }
    println!("  Max offset: {}", config.catalog.max_offset);
    println!("  Fetch details: {}", config.catalog.fetch_details);
    println!("  Output: {}", config.catalog.output_path);
    println!("  Categories ({}):", config.catalog.categories.len());
    for category in &config.catalog.categories {
        println!("    - {}", category);
    }

    println!("\nOutput:");
    println!("  Checkpoint interval: {}", config.output.checkpoint_interval);
    println!("  Merged: {}", config.output.merged_path);
    println!("  Cleaned: {}", config.output.cleaned_path);

    println!("\n✓ Configuration is valid");
}

async fn run_api(config: &Config, fresh: bool) -> Result<()> {
    tracing::info!("Starting API collection");
    let collection = collect_api(config, fresh)
        .await
        .context("API collection could not start")?;
    print_collection_report(&collection.report);
    println!();
    Ok(())
}

async fn run_catalog(config: &Config, fresh: bool) -> Result<()> {
    tracing::info!("Starting catalog collection");
    let collection = collect_catalog(config, fresh)
        .await
        .context("catalog collection could not start")?;
    print_collection_report(&collection.report);
    println!();
    Ok(())
}

fn run_merge(config: &Config) -> Result<()> {
    let summary = merge_datasets(
        Path::new(&config.api.output_path),
        Path::new(&config.catalog.output_path),
        Path::new(&config.output.merged_path),
    )
    .context("merge failed")?;
    print_merge_summary(&summary);
    println!();
    Ok(())
}

fn run_clean(config: &Config) -> Result<()> {
    let report = clean_dataset(
        Path::new(&config.output.merged_path),
        Path::new(&config.output.cleaned_path),
    )
    .context("clean failed")?;
    print_clean_report(&report);
    Ok(())
}
