//! Accuracy and correlation of predictions against the published results.
//!
//! Everything here is deterministic: the same paired series always yield the
//! same numbers.

use crate::error::{PredictorError, Result};
use crate::positions::PositionComparison;
use crate::standings::{compare_standings, Championship, StandingsComparison, StandingsRow};
use linfa::prelude::*;
use nalgebra::DVector;
use ndarray::Array1;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::warn;

fn check_paired<T>(predicted: &[T], actual: &[T]) -> Result<()> {
    if predicted.len() != actual.len() {
        return Err(PredictorError::LengthMismatch {
            predicted: predicted.len(),
            actual: actual.len(),
        });
    }
    if predicted.is_empty() {
        return Err(PredictorError::EmptySeries);
    }
    Ok(())
}

fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|v| *v == values[0])
}

/// Pearson linear correlation.
pub fn pearson(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_paired(predicted, actual)?;
    if is_constant(predicted) || is_constant(actual) {
        return Err(PredictorError::DegenerateSeries);
    }
    let x = DVector::from_column_slice(predicted);
    let y = DVector::from_column_slice(actual);
    let x = x.add_scalar(-x.mean());
    let y = y.add_scalar(-y.mean());
    Ok(x.dot(&y) / (x.norm() * y.norm()))
}

/// Spearman rank correlation; ties take their average rank.
pub fn spearman(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_paired(predicted, actual)?;
    pearson(&average_ranks(predicted), &average_ranks(actual))
}

fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]].total_cmp(&values[order[start]]) == Ordering::Equal {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// Coefficient of determination of `predicted` against `actual`.
pub fn r_squared(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_paired(predicted, actual)?;
    if is_constant(actual) {
        return Err(PredictorError::DegenerateSeries);
    }
    let predicted = Array1::from(predicted.to_vec());
    let actual = Array1::from(actual.to_vec());
    Ok(predicted.r2(&actual)?)
}

pub fn mean_squared_error(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_paired(predicted, actual)?;
    let predicted = Array1::from(predicted.to_vec());
    let actual = Array1::from(actual.to_vec());
    Ok(predicted.mean_squared_error(&actual)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToleranceRate {
    pub tolerance: u32,
    pub rate: f64,
}

/// Fraction of pairs with |predicted - actual| <= t, for each t.
pub fn tolerance_rates(predicted: &[u32], actual: &[u32], tolerances: &[u32]) -> Result<Vec<ToleranceRate>> {
    check_paired(predicted, actual)?;
    let diffs: Vec<u32> = predicted.iter().zip(actual).map(|(p, a)| p.abs_diff(*a)).collect();
    Ok(tolerances
        .iter()
        .map(|&tolerance| ToleranceRate {
            tolerance,
            rate: diffs.iter().filter(|d| **d <= tolerance).count() as f64 / diffs.len() as f64,
        })
        .collect())
}

/// Correlation and error statistics of one paired series.
///
/// A statistic that is undefined for the data (zero variance, no pairs) is
/// `None`; mismatched lengths are a caller bug and fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStatistics {
    pub count: usize,
    pub spearman: Option<f64>,
    pub pearson: Option<f64>,
    pub r2: Option<f64>,
    pub mse: Option<f64>,
    pub rmse: Option<f64>,
}

impl SeriesStatistics {
    pub fn compute(predicted: &[f64], actual: &[f64]) -> Result<Self> {
        let mse = defined(mean_squared_error(predicted, actual))?;
        Ok(Self {
            count: predicted.len(),
            spearman: defined(spearman(predicted, actual))?,
            pearson: defined(pearson(predicted, actual))?,
            r2: defined(r_squared(predicted, actual))?,
            mse,
            rmse: mse.map(f64::sqrt),
        })
    }
}

fn defined(stat: Result<f64>) -> Result<Option<f64>> {
    match stat {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_exclusion() => Ok(None),
        Err(e) => Err(e),
    }
}

fn defined_rates(predicted: &[u32], actual: &[u32], tolerances: &[u32]) -> Result<Vec<ToleranceRate>> {
    match tolerance_rates(predicted, actual, tolerances) {
        Ok(rates) => Ok(rates),
        Err(PredictorError::EmptySeries) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Race-by-race positions against the published classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionEvaluation {
    pub statistics: SeriesStatistics,
    pub tolerance: Vec<ToleranceRate>,
}

pub fn evaluate_positions(comparisons: &[PositionComparison], tolerances: &[u32]) -> Result<PositionEvaluation> {
    if comparisons.is_empty() {
        warn!("no resolved position has a published counterpart");
    }
    let predicted: Vec<u32> = comparisons.iter().map(|c| c.predicted).collect();
    let actual: Vec<u32> = comparisons.iter().map(|c| c.actual).collect();
    Ok(PositionEvaluation {
        statistics: SeriesStatistics::compute(&as_f64(&predicted), &as_f64(&actual))?,
        tolerance: defined_rates(&predicted, &actual, tolerances)?,
    })
}

/// Predicted standings against the true ones for one championship: points
/// drive the correlation and error statistics, ranks the tolerance table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChampionshipEvaluation {
    pub championship: Championship,
    pub statistics: SeriesStatistics,
    pub tolerance: Vec<ToleranceRate>,
    pub comparisons: Vec<StandingsComparison>,
}

pub fn evaluate_championship(
    championship: Championship,
    predicted: &[StandingsRow],
    actual: &[StandingsRow],
    tolerances: &[u32],
) -> Result<ChampionshipEvaluation> {
    let comparisons = compare_standings(predicted, actual);
    let predicted_points: Vec<f64> = comparisons.iter().map(|c| c.predicted_points).collect();
    let actual_points: Vec<f64> = comparisons.iter().map(|c| c.actual_points).collect();
    let predicted_ranks: Vec<u32> = comparisons.iter().map(|c| c.predicted_rank).collect();
    let actual_ranks: Vec<u32> = comparisons.iter().map(|c| c.actual_rank).collect();

    Ok(ChampionshipEvaluation {
        championship,
        statistics: SeriesStatistics::compute(&predicted_points, &actual_points)?,
        tolerance: defined_rates(&predicted_ranks, &actual_ranks, tolerances)?,
        comparisons,
    })
}

fn as_f64(values: &[u32]) -> Vec<f64> {
    values.iter().map(|v| *v as f64).collect()
}
