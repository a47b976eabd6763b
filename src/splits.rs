//! Split time: the gap from each classified driver to the race winner.
//!
//! Drivers on the lead lap get their measured gap. Lapped drivers never cross
//! the line again once the leader finishes, so their gap is extrapolated from
//! a reference pace: the elapsed time of a reference car plus `L` of its laps,
//! minus the winner's time. The reference is the fastest timed car lapped
//! exactly once; failing that the fastest timed car at the nearest lower lap
//! deficit; failing that the winner. Retirements get no split at all.

use crate::data::{DriverRaceKey, RaceEntry, RaceKey, RaceStatus};
use crate::error::{PredictorError, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitTimeRecord {
    pub key: DriverRaceKey,
    pub split: Duration,
    pub laps_down: u32,
}

impl SplitTimeRecord {
    pub fn seconds(&self) -> f64 {
        self.split.as_secs_f64()
    }
}

#[derive(Debug, Clone, Copy)]
struct ReferencePace {
    elapsed: Duration,
    laps: u32,
}

impl ReferencePace {
    fn extrapolate(&self, laps_down: u32) -> Duration {
        self.elapsed + (self.elapsed / self.laps) * laps_down
    }
}

/// Builds one split per classified entry of `race`, in entry order.
///
/// Fails with `NoRaceWinner` when nobody finished on the lead lap with a time.
pub fn build_split_times(race: RaceKey, entries: &[RaceEntry]) -> Result<Vec<SplitTimeRecord>> {
    let winner = entries
        .iter()
        .filter(|e| e.status == RaceStatus::Finished)
        .filter_map(|e| e.finish_time.map(|t| (e, t)))
        .min_by_key(|(_, t)| *t);
    let Some((winner, winner_time)) = winner else {
        return Err(PredictorError::NoRaceWinner(race));
    };

    // timed lapped cars: candidate references
    let lapped: Vec<(u32, ReferencePace)> = entries
        .iter()
        .filter(|e| e.status.is_classified_finish() && e.laps > 0)
        .filter_map(|e| {
            let down = laps_down(e, winner.laps);
            let elapsed = e.finish_time?;
            (down > 0).then_some((down, ReferencePace { elapsed, laps: e.laps }))
        })
        .collect();
    let winner_pace = ReferencePace {
        elapsed: winner_time,
        laps: winner.laps.max(1),
    };

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.status.is_classified_finish() {
            debug!(race = %race, driver = %entry.driver, status = ?entry.status, "retired, no split");
            continue;
        }
        let down = laps_down(entry, winner.laps);
        let finish = if down == 0 {
            match entry.finish_time {
                Some(t) => t,
                None => {
                    debug!(race = %race, driver = %entry.driver, "lead-lap finisher without a time, no split");
                    continue;
                }
            }
        } else {
            reference_for(&lapped, down).unwrap_or(winner_pace).extrapolate(down)
        };

        let split = finish.checked_sub(winner_time).ok_or_else(|| {
            PredictorError::NegativeDuration(format!(
                "{} finishes {:?} ahead of the winner in {}",
                entry.driver,
                winner_time - finish,
                race
            ))
        })?;
        records.push(SplitTimeRecord {
            key: entry.key(),
            split,
            laps_down: down,
        });
    }
    debug!(race = %race, splits = records.len(), "built split times");
    Ok(records)
}

fn laps_down(entry: &RaceEntry, winner_laps: u32) -> u32 {
    match winner_laps.checked_sub(entry.laps) {
        Some(0) | None => entry.status.laps_down().unwrap_or(0),
        Some(down) => down,
    }
}

fn reference_for(lapped: &[(u32, ReferencePace)], laps_down: u32) -> Option<ReferencePace> {
    let fastest_at = |deficit: u32| {
        lapped
            .iter()
            .filter(|(down, _)| *down == deficit)
            .map(|(_, pace)| *pace)
            .min_by_key(|pace| pace.elapsed)
    };
    fastest_at(1).or_else(|| (2..laps_down).rev().find_map(fastest_at))
}
