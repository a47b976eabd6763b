//! Model-ready feature rows and split-time targets.

use crate::age;
use crate::data::{DriverRaceKey, QualifyingTable, RaceTable};
use crate::error::{PredictorError, Result};
use crate::splits::SplitTimeRecord;
use csv::Writer;
use linfa::Dataset;
use ndarray::{Array1, Array2, Ix1};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

pub const FEATURE_NAMES: [&str; 10] = [
    "season",
    "round",
    "grid",
    "qual_position",
    "q_best",
    "q_worst",
    "q_mean",
    "age_years",
    "peak_age",
    "veteran",
];

/// One row per driver-race, aligned with `keys` and `targets`.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub keys: Vec<DriverRaceKey>,
    pub records: Array2<f64>,
    pub targets: Array1<f64>,
}

impl FeatureMatrix {
    /// Assembles rows for every split that has qualifying, grid and age data.
    ///
    /// Entries missing any of those are left out rather than zero-filled.
    pub fn assemble(splits: &[SplitTimeRecord], races: &RaceTable, qualifying: &QualifyingTable) -> Result<Self> {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut targets = Vec::new();

        for split in splits {
            match feature_row(&split.key, races, qualifying) {
                Ok(Some(row)) => {
                    keys.push(split.key.clone());
                    values.extend_from_slice(&row);
                    targets.push(split.seconds());
                }
                Ok(None) => {}
                Err(e) if e.is_exclusion() => {
                    debug!(race = %split.key.race, driver = %split.key.driver, reason = %e, "left out of feature matrix");
                }
                Err(e) => return Err(e),
            }
        }

        let records = Array2::from_shape_vec((keys.len(), FEATURE_NAMES.len()), values)?;
        info!(rows = keys.len(), skipped = splits.len() - keys.len(), "assembled feature matrix");
        Ok(Self {
            keys,
            records,
            targets: Array1::from_vec(targets),
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn to_dataset(&self) -> Dataset<f64, f64, Ix1> {
        Dataset::new(self.records.clone(), self.targets.clone())
            .with_feature_names(FEATURE_NAMES.to_vec())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }

    /// Key columns, features, then the `split` target.
    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = Writer::from_writer(out);
        let mut header = vec!["season", "round", "driver"];
        header.extend_from_slice(&FEATURE_NAMES);
        header.push("split");
        writer.write_record(&header)?;

        for (i, key) in self.keys.iter().enumerate() {
            let mut record = vec![key.race.season.to_string(), key.race.round.to_string(), key.driver.clone()];
            record.extend(self.records.row(i).iter().map(f64::to_string));
            record.push(self.targets[i].to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn feature_row(key: &DriverRaceKey, races: &RaceTable, qualifying: &QualifyingTable) -> Result<Option<[f64; 10]>> {
    let Some(entry) = races.get(key) else {
        return Ok(None);
    };
    let summary = match qualifying.get(key) {
        Some(q) => q.summarize()?,
        None => {
            return Err(PredictorError::MissingQualifyingData {
                race: key.race,
                driver: key.driver.clone(),
            })
        }
    };
    let Some(qual_position) = entry.qualifying_position else {
        debug!(race = %key.race, driver = %key.driver, "did not qualify, left out of feature matrix");
        return Ok(None);
    };
    let (Some(dob), Some(race_date)) = (entry.date_of_birth, entry.race_date) else {
        debug!(race = %key.race, driver = %key.driver, "no birth or race date, left out of feature matrix");
        return Ok(None);
    };
    let age_days = age::age_at_race(dob, race_date)?;

    Ok(Some([
        key.race.season as f64,
        key.race.round as f64,
        entry.grid as f64,
        qual_position as f64,
        summary.best,
        summary.worst,
        summary.mean,
        age::age_years(age_days),
        if age::is_peak_age(age_days) { 1.0 } else { 0.0 },
        if age::is_veteran(age_days, age::VETERAN_AGE_YEARS) { 1.0 } else { 0.0 },
    ]))
}
