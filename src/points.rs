use crate::data::{DriverRaceKey, RaceEntry};
use crate::error::{PredictorError, Result};
use crate::positions::ResolvedPosition;
use serde::Serialize;

/// Points for positions 1 through 10; everything below scores nothing.
pub const POINTS_TABLE: [u32; 10] = [25, 18, 15, 12, 10, 8, 6, 4, 2, 1];

/// Championship points for a classification position. Position 0 is an error.
pub fn points_for_position(position: u32) -> Result<u32> {
    if position == 0 {
        return Err(PredictorError::InvalidPosition(position));
    }
    Ok(POINTS_TABLE
        .get(position as usize - 1)
        .copied()
        .unwrap_or(0))
}

/// A classified result with the points it earned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub key: DriverRaceKey,
    pub constructor: String,
    pub grid: u32,
    /// `None` for unclassified published results.
    pub position: Option<u32>,
    pub points: f64,
}

impl ScoredResult {
    pub fn scored(resolved: &ResolvedPosition, entry: &RaceEntry) -> Result<Self> {
        let points = points_for_position(resolved.position)?;
        Ok(Self {
            key: resolved.key.clone(),
            constructor: entry.constructor.clone(),
            grid: entry.grid,
            position: Some(resolved.position),
            points: points as f64,
        })
    }

    /// The result as published, points included.
    pub fn published(entry: &RaceEntry) -> Self {
        Self {
            key: entry.key(),
            constructor: entry.constructor.clone(),
            grid: entry.grid,
            position: entry.finish_position,
            points: entry.points,
        }
    }
}
