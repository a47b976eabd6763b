// best / worst / mean over the sessions a driver actually ran.
// a session they never reached is skipped, not filled in

use crate::data::QualifyingEntry;
use crate::error::{PredictorError, Result};
use serde::Serialize;
use std::time::Duration;

/// Best, worst and mean qualifying time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualifyingSummary {
    pub best: f64,
    pub worst: f64,
    pub mean: f64,
    pub sessions: usize,
}

impl QualifyingEntry {
    /// Fails with `MissingQualifyingData` when no session time is present.
    pub fn summarize(&self) -> Result<QualifyingSummary> {
        let times: Vec<f64> = self
            .sessions
            .iter()
            .flatten()
            .map(Duration::as_secs_f64)
            .filter(|t| *t > 0.0)
            .collect();

        if times.is_empty() {
            return Err(PredictorError::MissingQualifyingData {
                race: self.race,
                driver: self.driver.clone(),
            });
        }

        let best = times.iter().copied().fold(f64::INFINITY, f64::min);
        let worst = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = times.iter().sum::<f64>() / times.len() as f64;

        Ok(QualifyingSummary {
            best,
            worst,
            mean,
            sessions: times.len(),
        })
    }
}

/// Parses a lap time written as `M:SS.mmm` (surrounding whitespace allowed).
pub fn parse_lap_time(raw: &str) -> Result<Duration> {
    let invalid = || PredictorError::InvalidLapTime(raw.to_string());
    let (minutes, seconds) = raw.trim().split_once(':').ok_or_else(invalid)?;

    let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
    let (whole, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
    let whole: u64 = whole.parse().map_err(|_| invalid())?;
    if whole >= 60 || fraction.len() > 3 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    // "4" is 400ms, "45" is 450ms
    let millis: u64 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<3}", fraction).parse().map_err(|_| invalid())?
    };

    let time = Duration::from_millis((minutes * 60 + whole) * 1000 + millis);
    if time.is_zero() {
        return Err(invalid());
    }
    Ok(time)
}
