use crate::data::RaceKey;
use thiserror::Error;

/// Every failure the standings pipeline can report.
///
/// `MissingQualifyingData`, `NoRaceWinner`, `DegenerateSeries` and
/// `EmptySeries` are exclusions: callers turn them into a skipped entry, a
/// skipped race or an undefined statistic. The remaining variants are contract
/// violations and abort the run.
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("no qualifying session recorded for {driver} in {race}")]
    MissingQualifyingData { race: RaceKey, driver: String },

    #[error("no classified finisher in {0}")]
    NoRaceWinner(RaceKey),

    #[error("series has zero variance")]
    DegenerateSeries,

    #[error("series is empty")]
    EmptySeries,

    #[error("invalid classification position {0} (positions start at 1)")]
    InvalidPosition(u32),

    #[error("negative duration: {0}")]
    NegativeDuration(String),

    #[error("paired series differ in length: {predicted} predicted vs {actual} actual")]
    LengthMismatch { predicted: usize, actual: usize },

    #[error("invalid lap time {0:?}")]
    InvalidLapTime(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model error: {0}")]
    Linfa(#[from] linfa::Error),

    #[error("matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl PredictorError {
    /// True for errors that only drop one entry, race or statistic.
    pub fn is_exclusion(&self) -> bool {
        matches!(
            self,
            PredictorError::MissingQualifyingData { .. }
                | PredictorError::NoRaceWinner(_)
                | PredictorError::DegenerateSeries
                | PredictorError::EmptySeries
        )
    }
}

pub type Result<T> = std::result::Result<T, PredictorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusions_are_not_contract_violations() {
        let key = RaceKey::new(2020, 3);
        assert!(PredictorError::NoRaceWinner(key).is_exclusion());
        assert!(PredictorError::DegenerateSeries.is_exclusion());
        assert!(!PredictorError::InvalidPosition(0).is_exclusion());
        assert!(!PredictorError::LengthMismatch { predicted: 2, actual: 3 }.is_exclusion());
    }

    #[test]
    fn test_messages_name_the_race() {
        let err = PredictorError::NoRaceWinner(RaceKey::new(2019, 7));
        assert_eq!(err.to_string(), "no classified finisher in 2019 round 7");
    }
}
