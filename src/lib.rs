//! F1 championship standings from predicted race splits
//!
//! Turns per-driver split-time predictions into race positions, points and
//! season standings, and measures them against the published results.

pub mod age;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod points;
pub mod positions;
pub mod qualifying;
pub mod report;
pub mod splits;
pub mod standings;
pub mod weather;

pub use config::Config;
pub use data::{DriverRaceKey, QualifyingEntry, QualifyingTable, RaceEntry, RaceKey, RaceStatus, RaceTable};
pub use error::{PredictorError, Result};
pub use features::FeatureMatrix;
pub use model::{Estimator, LinfaEstimator, PrecomputedPredictions, Predictions};
pub use pipeline::{run_season, split_times};
pub use report::EvaluationReport;
pub use standings::{Championship, StandingsRow};
