mod config;
mod data;
mod engine;
mod monitoring;

use anyhow::Result;
use rand::Rng;
use std::collections::HashMap;

use config::{Config, EnvConfig, MarketConfig};
use data::store::ResultStore;
use data::types::PredictionResult;
use monitoring::logger::CsvLogger;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("🎯 KalyanX predictor starting...");

    // Load configuration
    tracing::info!("Loading configuration...");
    let config = Config::load("config.toml")?;
    let env_config = EnvConfig::load();

    let database_path = env_config
        .database_path
        .unwrap_or_else(|| config.system.database_path.clone());
    let dry_run = env_config.dry_run_override.unwrap_or(config.system.dry_run);

    tracing::info!("Dry run mode: {}", dry_run);
    tracing::info!("Configured markets: {}", config.markets.len());

    // Initialize database
    tracing::info!("Initializing database: {}", database_path);
    let store = ResultStore::open(&database_path)?;

    let logger = if config.monitoring.csv_logging {
        Some(CsvLogger::new(config.monitoring.csv_log_path.clone())?)
    } else {
        None
    };

    let difficulty = config.difficulty_table();
    let mut rng = rand::thread_rng();

    for market in &config.markets {
        match run_market(market, &config, &difficulty, &store, &mut rng) {
            Ok(Some(prediction)) => {
                tracing::info!(
                    "Prediction for {} on {}: open={:?} close={:?} confidence={:.2}",
                    prediction.market,
                    prediction.date,
                    prediction.open_digits,
                    prediction.close_digits,
                    prediction.confidence_score
                );

                if dry_run {
                    tracing::info!("Dry run: prediction for {} not persisted", prediction.market);
                } else {
                    store.insert_prediction(&prediction)?;
                    if let Some(logger) = &logger {
                        logger.log_prediction(&prediction)?;
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Failed to generate prediction for {}: {:#}", market.name, e)
            }
        }
    }

    // Rolling accuracy check against published results
    let cutoff = chrono::Utc::now().date_naive() - chrono::Duration::days(30);
    match monitoring::accuracy::accuracy_summary(&store, cutoff) {
        Ok(summary) if summary.overall.total > 0 => {
            tracing::info!(
                "30-day accuracy: {} predictions scored, jodi hit rate {:.1}%",
                summary.overall.total,
                summary.overall.jodi_accuracy_pct()
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Accuracy summary failed: {:#}", e),
    }

    tracing::info!("✅ Prediction cycle complete");
    Ok(())
}

/// One market's cycle: find the next operating day after its latest result,
/// skip if a prediction already exists, then run the engine over its window.
fn run_market<R: Rng>(
    market: &MarketConfig,
    config: &Config,
    difficulty: &HashMap<String, f64>,
    store: &ResultStore,
    rng: &mut R,
) -> Result<Option<PredictionResult>> {
    let Some(latest) = store.latest_result_date(&market.name)? else {
        tracing::warn!("No results recorded for {}, skipping", market.name);
        return Ok(None);
    };

    let target_date = market.next_operating_day(latest);
    if store.prediction_exists(target_date, &market.name)? {
        tracing::info!(
            "Prediction already exists for {} on {}",
            market.name,
            target_date
        );
        return Ok(None);
    }

    let window = store.get_window(&market.name, config.engine.window_size)?;
    if window.len() < config.engine.min_window_floor {
        tracing::warn!(
            "Only {} records for {}, need at least {}, skipping",
            window.len(),
            market.name,
            config.engine.min_window_floor
        );
        return Ok(None);
    }

    tracing::info!(
        "Generating prediction for {} on {} from {} records",
        market.name,
        target_date,
        window.len()
    );

    Ok(Some(engine::generate_prediction(
        &market.name,
        target_date,
        &window,
        &config.engine,
        difficulty,
        rng,
    )))
}
