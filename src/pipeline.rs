//! Season orchestration.
//!
//! Races are independent up to scoring and fan out over rayon; standings and
//! everything after them wait for the whole season.

use crate::config::EvaluationConfig;
use crate::data::{RaceEntry, RaceKey, RaceTable};
use crate::error::{PredictorError, Result};
use crate::evaluation::{evaluate_championship, evaluate_positions, SeriesStatistics};
use crate::model::Predictions;
use crate::points::ScoredResult;
use crate::positions::{compare_positions, resolve_positions, PredictedRaceResult, ResolvedPosition};
use crate::report::{EvaluationReport, RetirementSummary};
use crate::splits::{build_split_times, SplitTimeRecord};
use crate::standings::{aggregate_standings, Championship};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Split times of a set of races, and the races that could not produce any.
#[derive(Debug, Clone, Default)]
pub struct SplitTimes {
    pub records: Vec<SplitTimeRecord>,
    pub excluded: Vec<RaceKey>,
}

fn race_splits(race: RaceKey, entries: &[RaceEntry]) -> Result<Option<Vec<SplitTimeRecord>>> {
    match build_split_times(race, entries) {
        Ok(records) => Ok(Some(records)),
        Err(e @ PredictorError::NoRaceWinner(_)) => {
            warn!(race = %race, reason = %e, "race excluded from split times");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Split times for every race in the table, or for one season only.
pub fn split_times(races: &RaceTable, season: Option<i32>) -> Result<SplitTimes> {
    let selected: Vec<(&RaceKey, &Vec<RaceEntry>)> = races
        .races
        .iter()
        .filter(|(key, _)| season.map_or(true, |s| key.season == s))
        .collect();

    let per_race = selected
        .par_iter()
        .map(|(race, entries)| -> Result<_> { Ok((**race, race_splits(**race, entries)?)) })
        .collect::<Result<Vec<_>>>()?;

    let mut out = SplitTimes::default();
    for (race, splits) in per_race {
        match splits {
            Some(records) => out.records.extend(records),
            None => out.excluded.push(race),
        }
    }
    info!(records = out.records.len(), excluded = out.excluded.len(), "built split times");
    Ok(out)
}

struct RaceOutcome {
    race: RaceKey,
    splits: Option<Vec<SplitTimeRecord>>,
    resolved: Vec<ResolvedPosition>,
    scored: Vec<ScoredResult>,
}

fn process_race(race: RaceKey, entries: &[RaceEntry], predictions: &[PredictedRaceResult]) -> Result<RaceOutcome> {
    // no winner: nothing in this race can be ranked or scored
    let Some(splits) = race_splits(race, entries)? else {
        return Ok(RaceOutcome {
            race,
            splits: None,
            resolved: Vec::new(),
            scored: Vec::new(),
        });
    };

    // only entries that carry a split time take part in the position pool;
    // retirements and drivers missing from the race are left out
    let split_drivers: HashSet<&str> = splits.iter().map(|s| s.key.driver.as_str()).collect();
    let pool: Vec<PredictedRaceResult> = predictions
        .iter()
        .filter(|p| {
            let eligible = split_drivers.contains(p.key.driver.as_str());
            if !eligible {
                warn!(race = %race, driver = %p.key.driver, "prediction for an entry without a split time, ignored");
            }
            eligible
        })
        .cloned()
        .collect();

    let by_driver: HashMap<&str, &RaceEntry> = entries.iter().map(|e| (e.driver.as_str(), e)).collect();
    let resolved = resolve_positions(&pool);
    let scored = resolved
        .iter()
        .filter_map(|r| by_driver.get(r.key.driver.as_str()).map(|entry| ScoredResult::scored(r, entry)))
        .collect::<Result<Vec<_>>>()?;

    Ok(RaceOutcome {
        race,
        splits: Some(splits),
        resolved,
        scored,
    })
}

/// Resolves, scores and evaluates one season of predictions.
pub fn run_season(races: &RaceTable, predictions: &Predictions, config: &EvaluationConfig) -> Result<EvaluationReport> {
    let season = config.season;
    let season_races: Vec<(&RaceKey, &Vec<RaceEntry>)> = races.season(season).collect();
    if season_races.is_empty() {
        warn!(season, "no races recorded for season");
    }
    let by_race = predictions.by_race();

    let outcomes = season_races
        .par_iter()
        .map(|(race, entries)| {
            let race_predictions = by_race.get(*race).map(Vec::as_slice).unwrap_or(&[]);
            if race_predictions.is_empty() {
                warn!(race = %race, "no predictions for race");
            }
            process_race(**race, entries, race_predictions)
        })
        .collect::<Result<Vec<_>>>()?;

    // season barrier
    let excluded_races: Vec<RaceKey> = outcomes.iter().filter(|o| o.splits.is_none()).map(|o| o.race).collect();
    let predicted_results: Vec<ScoredResult> = outcomes.iter().flat_map(|o| o.scored.iter().cloned()).collect();
    let actual_results: Vec<ScoredResult> = season_races
        .iter()
        .flat_map(|(_, entries)| entries.iter().map(ScoredResult::published))
        .collect();
    info!(
        season,
        races = outcomes.len(),
        excluded = excluded_races.len(),
        scored = predicted_results.len(),
        "scored predicted results"
    );

    let (raw_predicted, raw_actual): (Vec<f64>, Vec<f64>) = outcomes
        .iter()
        .filter_map(|o| o.splits.as_ref())
        .flatten()
        .filter_map(|split| Some((predictions.get(&split.key)?, split.seconds())))
        .unzip();
    let raw = SeriesStatistics::compute(&raw_predicted, &raw_actual)?;

    let resolved: Vec<ResolvedPosition> = outcomes.iter().flat_map(|o| o.resolved.iter().cloned()).collect();
    let race_positions = evaluate_positions(&compare_positions(&resolved, races), &config.tolerances)?;

    let driver_standings = aggregate_standings(&predicted_results, Championship::Drivers);
    let constructor_standings = aggregate_standings(&predicted_results, Championship::Constructors);
    let drivers = evaluate_championship(
        Championship::Drivers,
        &driver_standings,
        &aggregate_standings(&actual_results, Championship::Drivers),
        &config.tolerances,
    )?;
    let constructors = evaluate_championship(
        Championship::Constructors,
        &constructor_standings,
        &aggregate_standings(&actual_results, Championship::Constructors),
        &config.tolerances,
    )?;

    Ok(EvaluationReport {
        model_version: config.model_version.clone(),
        season,
        raw,
        race_positions,
        drivers,
        constructors,
        driver_standings,
        constructor_standings,
        excluded_races,
        retirements: RetirementSummary::count(season_races.iter().flat_map(|(_, entries)| entries.iter())),
    })
}
