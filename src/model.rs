//! The estimator seam: anything that turns a feature matrix into one predicted
//! split per driver-race.

use crate::data::{DriverRaceKey, RaceKey};
use crate::error::{PredictorError, Result};
use crate::features::FeatureMatrix;
use crate::positions::PredictedRaceResult;
use csv::ReaderBuilder;
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Predicted split per driver-race. Entries the estimator could not score are
/// simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predictions {
    values: HashMap<DriverRaceKey, f64>,
}

impl Predictions {
    /// Non-finite scores are dropped: an estimator that returns NaN has not
    /// scored the entry.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (DriverRaceKey, f64)>,
    {
        let mut values = HashMap::new();
        for (key, predicted) in pairs {
            if !predicted.is_finite() {
                warn!(race = %key.race, driver = %key.driver, "estimator returned a non-finite score, entry omitted");
                continue;
            }
            values.insert(key, predicted);
        }
        Self { values }
    }

    pub fn get(&self, key: &DriverRaceKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Predictions grouped per race, each race in driver order.
    pub fn by_race(&self) -> HashMap<RaceKey, Vec<PredictedRaceResult>> {
        let mut grouped: HashMap<RaceKey, Vec<PredictedRaceResult>> = HashMap::new();
        for (key, predicted) in &self.values {
            grouped
                .entry(key.race)
                .or_default()
                .push(PredictedRaceResult::new(key.clone(), *predicted));
        }
        grouped
            .values_mut()
            .for_each(|race| race.sort_by(|a, b| a.key.driver.cmp(&b.key.driver)));
        grouped
    }
}

pub trait Estimator {
    fn predict(&self, features: &FeatureMatrix) -> Result<Predictions>;
}

/// Wraps an already fitted linfa model.
pub struct LinfaEstimator<M> {
    model: M,
}

impl<M> LinfaEstimator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M> Estimator for LinfaEstimator<M>
where
    M: for<'a> linfa::traits::Predict<&'a Array2<f64>, Array1<f64>>,
{
    fn predict(&self, features: &FeatureMatrix) -> Result<Predictions> {
        let scores: Array1<f64> = linfa::traits::Predict::predict(&self.model, &features.records);
        if scores.len() != features.len() {
            return Err(PredictorError::LengthMismatch {
                predicted: scores.len(),
                actual: features.len(),
            });
        }
        Ok(Predictions::from_pairs(
            features.keys.iter().cloned().zip(scores.iter().copied()),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct RawPredictionRow {
    season: i32,
    round: u32,
    driver: String,
    predicted: Option<f64>,
}

/// Scores produced by an estimator outside this crate, read back from CSV.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedPredictions {
    predictions: Predictions,
}

impl PrecomputedPredictions {
    pub fn load<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let reader = ReaderBuilder::new().has_headers(true).from_path(filename)?;
        Self::read(reader)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        Self::read(ReaderBuilder::new().has_headers(true).from_reader(rdr))
    }

    fn read<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut pairs = Vec::new();
        for res in reader.deserialize() {
            let raw: RawPredictionRow = res?;
            let key = DriverRaceKey::new(RaceKey::new(raw.season, raw.round), raw.driver.trim());
            // empty cell: the estimator skipped this entry
            pairs.push((key, raw.predicted.unwrap_or(f64::NAN)));
        }
        let predictions = Predictions::from_pairs(pairs);
        info!(predictions = predictions.len(), "loaded precomputed predictions");
        Ok(Self { predictions })
    }
}

impl Estimator for PrecomputedPredictions {
    /// The scores were computed upstream on the estimator's own feature set,
    /// so the matrix is not consulted.
    fn predict(&self, _features: &FeatureMatrix) -> Result<Predictions> {
        Ok(self.predictions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linfa::traits::Fit;
    use linfa_linear::LinearRegression;

    fn matrix() -> FeatureMatrix {
        let n = 8;
        let keys = (0..n)
            .map(|i| DriverRaceKey::new(RaceKey::new(2021, 1 + i as u32 / 4), format!("d{i}")))
            .collect();
        let records = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 } else { (i * i % 5) as f64 });
        let targets = records.column(0).mapv(|x| 2.0 * x + 1.0) + records.column(1).mapv(|x| 0.5 * x);
        FeatureMatrix { keys, records, targets }
    }

    #[test]
    fn test_linfa_estimator_keys_every_row() {
        let matrix = matrix();
        let fitted = LinearRegression::new().fit(&matrix.to_dataset()).unwrap();
        let predictions = LinfaEstimator::new(fitted).predict(&matrix).unwrap();

        assert_eq!(predictions.len(), matrix.len());
        for (i, key) in matrix.keys.iter().enumerate() {
            let predicted = predictions.get(key).unwrap();
            assert!((predicted - matrix.targets[i]).abs() < 1e-6, "{key:?}: {predicted}");
        }

        let grouped = predictions.by_race();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&RaceKey::new(2021, 1)].len(), 4);
    }

    #[test]
    fn test_precomputed_predictions_from_csv() {
        let csv = "season,round,driver,predicted\n2020,1,hamilton,0.2\n2020,1,bottas,3.5\n2020,1,latifi,\n2020,2,hamilton,NaN\n";
        let estimator = PrecomputedPredictions::from_reader(csv.as_bytes()).unwrap();
        let predictions = estimator.predict(&matrix()).unwrap();

        assert_eq!(predictions.len(), 2);
        let race = RaceKey::new(2020, 1);
        assert_eq!(predictions.get(&DriverRaceKey::new(race, "bottas")), Some(3.5));
        assert_eq!(predictions.get(&DriverRaceKey::new(race, "latifi")), None);
        assert_eq!(predictions.get(&DriverRaceKey::new(RaceKey::new(2020, 2), "hamilton")), None);

        let grouped = predictions.by_race();
        let drivers: Vec<&str> = grouped[&race].iter().map(|p| p.key.driver.as_str()).collect();
        assert_eq!(drivers, vec!["bottas", "hamilton"]);
    }
}
