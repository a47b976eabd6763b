use anyhow::Context;
use f1_standings::{
    run_season, split_times, Config, Estimator, FeatureMatrix, PrecomputedPredictions, QualifyingTable, RaceTable,
};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "F1_CONFIG";
const DEFAULT_CONFIG: &str = "f1.toml";

fn load_config(path: &str) -> anyhow::Result<Option<Config>> {
    if !Path::new(path).exists() {
        return Ok(None);
    }
    let config = Config::load(path).with_context(|| format!("loading config {path}"))?;
    Ok(Some(config))
}

fn main() -> anyhow::Result<()> {
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let loaded = load_config(&config_path)?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    if !found {
        warn!(path = %config_path, "config file not found, using defaults");
    }

    let data = &config.data;

    let races = RaceTable::load(&data.races).with_context(|| format!("reading race results {}", data.races))?;
    let qualifying = QualifyingTable::load(&data.qualifying)
        .with_context(|| format!("reading qualifying times {}", data.qualifying))?;

    let splits = split_times(&races, None)?;
    let features = FeatureMatrix::assemble(&splits.records, &races, &qualifying)?;
    if let Some(path) = &data.features_out {
        features.save(path).with_context(|| format!("writing feature matrix {path}"))?;
        info!(path = %path, rows = features.len(), "wrote feature matrix");
    }

    let estimator = PrecomputedPredictions::load(&data.predictions)
        .with_context(|| format!("reading predictions {}", data.predictions))?;
    let predictions = estimator.predict(&features)?;

    let report = run_season(&races, &predictions, &config.evaluation)?;
    println!("{}", report.summary());

    if let Some(path) = &data.report_out {
        report.save(path).with_context(|| format!("writing report {path}"))?;
        info!(path = %path, "wrote evaluation report");
    }
    Ok(())
}
