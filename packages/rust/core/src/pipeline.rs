//! End-to-end runs, one per mode: load inputs, build the unit, schedule,
//! checkpoint.

use std::time::Duration;

use tracing::{info, instrument, warn};

use dbbuilder_shared::{AppConfig, Result};
use dbbuilder_tables::{ResultTable, load_names, load_targets};

use crate::scheduler::{
    MergedTableSink, ProgressReporter, RunSummary, Scheduler, TableDirSink,
};
use crate::toolkit::Toolkit;
use crate::units::{FinderProfile, FinderTarget, ManufacturerSearch, ParameterTables, UrlFinder};

/// Directory under `data_dir` for per-target parameter tables.
pub const PARAMETER_TABLES_DIR: &str = "parameter_tables";

/// Directory under `data_dir` for per-target manufacturer tables.
pub const MANUFACTURER_TABLES_DIR: &str = "manufacturer_tables";

/// Generate a parameter table for every target in the remaining file.
#[instrument(skip_all)]
pub async fn run_parameter_tables(
    toolkit: &Toolkit,
    config: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    progress.phase("Loading targets");
    let targets = load_targets(&config.paths.remaining_file)?;
    info!(count = targets.len(), "processing products");

    let delay = Duration::from_secs(config.pipeline.start_delay_secs);
    if !delay.is_zero() {
        progress.phase("Starting shortly (Ctrl+C to cancel)");
        info!(delay_secs = delay.as_secs(), "processing will start shortly");
        tokio::time::sleep(delay).await;
    }

    let unit = ParameterTables::new(
        toolkit.quantity_generator(config),
        config.pipeline.record_count,
    );
    let mut sink = TableDirSink::new(config.paths.data_dir.join(PARAMETER_TABLES_DIR));

    progress.phase("Generating parameter tables");
    scheduler_for(config, config.pipeline.chunk_size)
        .run(targets, &unit, &mut sink, progress)
        .await
}

/// Search for manufacturers of every target in the remaining file.
#[instrument(skip_all)]
pub async fn run_manufacturer_search(
    toolkit: &Toolkit,
    config: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    progress.phase("Loading targets");
    let targets = load_targets(&config.paths.remaining_file)?;

    let unit = ManufacturerSearch::new(
        toolkit.search()?,
        Toolkit::keyword_filter(config),
        toolkit.judgement(),
        config.pipeline.manufacturer_results,
    );
    let mut sink = TableDirSink::new(config.paths.data_dir.join(MANUFACTURER_TABLES_DIR));

    progress.phase("Searching for manufacturers");
    scheduler_for(config, config.pipeline.chunk_size)
        .run(targets, &unit, &mut sink, progress)
        .await
}

/// Find the website of every manufacturer in the names file.
#[instrument(skip_all)]
pub async fn run_website_finder(
    toolkit: &Toolkit,
    config: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    progress.phase("Loading manufacturer names");
    let targets: Vec<FinderTarget> = load_names(&config.paths.manufacturer_names_file)?
        .into_iter()
        .map(FinderTarget::named)
        .collect();

    let finder = url_finder(toolkit, config, FinderProfile::Website)?;
    run_finder(finder, targets, &config.paths.websites_file, config, progress).await
}

/// Find the product page of every manufacturer in the website table.
#[instrument(skip_all)]
pub async fn run_product_page_finder(
    toolkit: &Toolkit,
    config: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    progress.phase("Loading manufacturer websites");
    let websites = ResultTable::read(&config.paths.websites_file)?;
    let targets = website_targets(&websites);

    let finder = url_finder(toolkit, config, FinderProfile::ProductPage)?;
    run_finder(
        finder,
        targets,
        &config.paths.product_pages_file,
        config,
        progress,
    )
    .await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn scheduler_for(config: &AppConfig, chunk_size: usize) -> Scheduler {
    Scheduler::new(chunk_size, config.pipeline.on_unit_failure)
}

fn url_finder(toolkit: &Toolkit, config: &AppConfig, profile: FinderProfile) -> Result<UrlFinder> {
    let result_count = match profile {
        FinderProfile::Website => config.pipeline.website_results,
        FinderProfile::ProductPage => config.pipeline.product_page_results,
    };
    Ok(UrlFinder::new(
        toolkit.search()?,
        toolkit.generator.clone(),
        toolkit.invoker.clone(),
        Toolkit::keyword_filter(config),
        profile,
        result_count,
    ))
}

async fn run_finder(
    finder: UrlFinder,
    targets: Vec<FinderTarget>,
    output: &std::path::Path,
    config: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let mut sink = MergedTableSink::new(output, &finder.profile().headers())?;

    progress.phase("Finding URLs");
    scheduler_for(config, config.pipeline.finder_batch_size)
        .run(targets, &finder, &mut sink, progress)
        .await
}

/// Rows of a website table with a non-empty website.
fn website_targets(websites: &ResultTable) -> Vec<FinderTarget> {
    let mut targets = Vec::new();
    for row in websites.rows() {
        match row.as_slice() {
            [name, site, ..] if !site.trim().is_empty() => {
                targets.push(FinderTarget::on_site(name.trim(), site.trim()));
            }
            [name, ..] => warn!(name = %name, "no website known, skipping"),
            [] => {}
        }
    }
    targets
}
