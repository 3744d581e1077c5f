// src/pipeline/crawl.rs

//! Crawl entry point: load cities, run the controller, stop on interrupt.

use std::future::Future;

use chrono::Utc;

use crate::error::Result;
use crate::models::{City, Config};
use crate::services::{CitySource, PageFetcher};
use crate::storage::LocalStore;
use crate::utils::report;

use super::run::{RunController, RunReport, RunSettings};

/// How a crawl ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Finished(RunReport),
    /// Stopped by the operator; everything persisted before the stop is
    /// kept and `--resume` continues from the last checkpoint.
    Interrupted,
}

/// Load the configured gazetteer, sorted by population descending.
pub fn load_cities(config: &Config) -> Result<Vec<City>> {
    CitySource::new(&config.paths.cities_file, &config.paths.country_code).load()
}

/// Run until the controller finishes or `shutdown` resolves.
///
/// The controller only yields while a page request is in flight, so
/// dropping it on shutdown never tears a table append or checkpoint write.
pub async fn run_until<F>(
    controller: &RunController<'_>,
    cities: &[City],
    shutdown: F,
) -> Result<RunOutcome>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        result = controller.run(cities) => result.map(RunOutcome::Finished),
        _ = shutdown => {
            log::warn!("Interrupted; progress up to the last completed city is saved");
            Ok(RunOutcome::Interrupted)
        }
    }
}

/// Run a crawl against the local store for `settings.query`.
pub async fn run_crawler<F>(
    config: &Config,
    settings: &RunSettings,
    fetcher: &dyn PageFetcher,
    shutdown: F,
) -> Result<RunOutcome>
where
    F: Future<Output = ()>,
{
    let start_time = Utc::now();
    report::header(&format!("Crawling \"{}\"", settings.query));

    let cities = load_cities(config)?;
    let store = LocalStore::for_query(&config.paths.output_dir, &settings.query);
    log::info!("Output table: {}", store.table_path().display());

    let controller = RunController::new(fetcher, &store, settings);
    let outcome = run_until(&controller, &cities, shutdown).await?;

    let elapsed = Utc::now() - start_time;
    report::separator();
    match &outcome {
        RunOutcome::Finished(run) => {
            let mut items = run.summary_items();
            items.push(("Output", store.table_path().display().to_string()));
            items.push(("Elapsed", format!("{}s", elapsed.num_seconds())));
            report::summary("Run complete", &items);
        }
        RunOutcome::Interrupted => {
            report::summary(
                "Run interrupted",
                &[
                    ("Output", store.table_path().display().to_string()),
                    ("Checkpoint", store.checkpoint_path().display().to_string()),
                    ("Elapsed", format!("{}s", elapsed.num_seconds())),
                ],
            );
        }
    }

    Ok(outcome)
}
