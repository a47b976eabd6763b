//! Turning predicted split times back into classification positions.

use crate::data::{DriverRaceKey, RaceTable};
use serde::Serialize;
use tracing::warn;

/// One estimator output: lower means a smaller predicted gap to the winner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedRaceResult {
    pub key: DriverRaceKey,
    pub predicted: f64,
}

impl PredictedRaceResult {
    pub fn new(key: DriverRaceKey, predicted: f64) -> Self {
        Self { key, predicted }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPosition {
    pub key: DriverRaceKey,
    pub position: u32,
}

/// Ranks the predictions of a single race, best first.
///
/// Equal predictions share a position and the next distinct value skips ahead
/// by the size of the tie group (1, 2, 2, 4). Non-finite predictions are
/// treated as omitted by the estimator and take no position.
pub fn resolve_positions(predictions: &[PredictedRaceResult]) -> Vec<ResolvedPosition> {
    let mut ranked: Vec<&PredictedRaceResult> = predictions
        .iter()
        .filter(|p| {
            let finite = p.predicted.is_finite();
            if !finite {
                warn!(race = %p.key.race, driver = %p.key.driver, "non-finite prediction left unranked");
            }
            finite
        })
        .collect();
    ranked.sort_by(|a, b| a.predicted.total_cmp(&b.predicted));

    let mut resolved = Vec::with_capacity(ranked.len());
    let mut position = 0;
    let mut previous: Option<f64> = None;
    for (index, prediction) in ranked.into_iter().enumerate() {
        if previous != Some(prediction.predicted) {
            position = index as u32 + 1;
            previous = Some(prediction.predicted);
        }
        resolved.push(ResolvedPosition {
            key: prediction.key.clone(),
            position,
        });
    }
    resolved
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionComparison {
    pub key: DriverRaceKey,
    pub predicted: u32,
    pub actual: u32,
}

impl PositionComparison {
    pub fn diff(&self) -> i64 {
        self.predicted as i64 - self.actual as i64
    }

    pub fn within(&self, tolerance: u32) -> bool {
        self.diff().unsigned_abs() <= tolerance as u64
    }
}

/// Pairs resolved positions with published finish positions; entries without
/// a published position (retirements) are left out.
pub fn compare_positions(resolved: &[ResolvedPosition], races: &RaceTable) -> Vec<PositionComparison> {
    resolved
        .iter()
        .filter_map(|r| {
            let actual = races.get(&r.key)?.finish_position?;
            Some(PositionComparison {
                key: r.key.clone(),
                predicted: r.position,
                actual,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RaceKey;

    fn predictions(values: &[f64]) -> Vec<PredictedRaceResult> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| PredictedRaceResult::new(DriverRaceKey::new(RaceKey::new(2020, 1), format!("d{i}")), *v))
            .collect()
    }

    fn position_of(resolved: &[ResolvedPosition], driver: &str) -> u32 {
        resolved.iter().find(|r| r.key.driver == driver).unwrap().position
    }

    #[test]
    fn test_lower_prediction_ranks_higher() {
        let resolved = resolve_positions(&predictions(&[12.3, 0.0, 5.5]));
        assert_eq!(position_of(&resolved, "d1"), 1);
        assert_eq!(position_of(&resolved, "d2"), 2);
        assert_eq!(position_of(&resolved, "d0"), 3);
    }

    #[test]
    fn test_ties_share_rank_and_skip() {
        let resolved = resolve_positions(&predictions(&[1.0, 2.0, 2.0, 3.0]));
        let positions: Vec<u32> = (0..4).map(|i| position_of(&resolved, &format!("d{i}"))).collect();
        assert_eq!(positions, vec![1, 2, 2, 4]);
    }

    #[test]
    fn test_tie_at_five_skips_to_seven() {
        let resolved = resolve_positions(&predictions(&[0.0, 1.0, 2.0, 3.0, 4.0, 4.0, 6.0]));
        assert_eq!(position_of(&resolved, "d4"), 5);
        assert_eq!(position_of(&resolved, "d5"), 5);
        assert_eq!(position_of(&resolved, "d6"), 7);
    }

    #[test]
    fn test_empty_race() {
        assert!(resolve_positions(&[]).is_empty());
    }

    #[test]
    fn test_non_finite_predictions_are_omitted() {
        let resolved = resolve_positions(&predictions(&[3.0, f64::NAN, 1.0]));
        assert_eq!(resolved.len(), 2);
        assert_eq!(position_of(&resolved, "d2"), 1);
        assert_eq!(position_of(&resolved, "d0"), 2);
    }

    #[test]
    fn test_comparison_tolerance() {
        let cmp = PositionComparison {
            key: DriverRaceKey::new(RaceKey::new(2020, 1), "x"),
            predicted: 2,
            actual: 4,
        };
        assert_eq!(cmp.diff(), -2);
        assert!(!cmp.within(1));
        assert!(cmp.within(2));
    }
}
