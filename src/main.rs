mod cli;
mod logging;
mod reporter;

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::Cli;
use colored::*;
use dotenv::dotenv;
use reporter::CliReporter;
use tracing::{debug, info, warn};
use vision_labeler::storage::{FsObjectStore, RocksDbDocumentStore};
use vision_labeler::vision::{Credentials, VisionClient};
use vision_labeler::TaggingEngine;

fn main() -> Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();
    let start = Instant::now();

    run(&args)?;

    println!("Elapsed {}s", start.elapsed().as_secs_f64().round() as u64);
    Ok(())
}

fn run(args: &Cli) -> Result<()> {
    let config = vision_labeler::config::load_configuration()
        .context("Error loading configuration")?;
    debug!("Configuration: {:?}", config);

    let credentials = Credentials::from_env()
        .ok_or_else(|| anyhow!("Set GOOGLE_API_KEY or GOOGLE_OAUTH_ACCESS_TOKEN"))?;
    let annotator = VisionClient::new(
        &config.vision_endpoint,
        &args.project,
        credentials,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let documents = RocksDbDocumentStore::open(&config.document_store_path)
        .with_context(|| format!("Error opening {}", config.document_store_path))?;
    let objects = FsObjectStore::new(&config.object_store_root, &config.bucket_name);

    let engine = TaggingEngine::new(config, &documents, &objects, &annotator)
        .with_json_export(args.export_json);
    let reporter = CliReporter::new();
    let summary = engine.run(&args.dataset, &reporter)?;

    println!();
    info!(
        "Load: {}, Label: {}",
        format!("{:.2}s", summary.load_duration.as_secs_f64()).green(),
        format!("{:.2}s", summary.label_duration.as_secs_f64()).green(),
    );
    info!(
        "{} rows read, {} already labeled, {} repeated in dataset",
        format!("{}", summary.total_rows).cyan(),
        format!("{}", summary.already_stored).cyan(),
        format!("{}", summary.duplicates_in_dataset).cyan(),
    );
    info!(
        "{} records stored, {} rows skipped, {} of {} batches failed",
        format!("{}", summary.stored).green(),
        format!("{}", summary.skipped).red(),
        format!("{}", summary.failed_batches).red(),
        summary.batches,
    );
    if summary.unwritten > 0 {
        warn!(
            "{} labeled documents were not written and will be retried next run",
            format!("{}", summary.unwritten).red(),
        );
    }
    info!("{} records in document store", documents.count()?);

    Ok(())
}
