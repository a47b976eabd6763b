use crate::data::{RaceEntry, RaceKey, RetirementCause};
use crate::error::Result;
use crate::evaluation::{ChampionshipEvaluation, PositionEvaluation, SeriesStatistics, ToleranceRate};
use crate::standings::{format_standings, Championship, StandingsRow};
use serde::Serialize;
use std::fmt;
use std::path::Path;

const SUMMARY_DRIVERS: usize = 5;

/// Retirements of the evaluated season by cause.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetirementSummary {
    pub driver_fault: usize,
    pub car_fault: usize,
    pub other: usize,
}

impl RetirementSummary {
    pub fn count<'a>(entries: impl IntoIterator<Item = &'a RaceEntry>) -> Self {
        let mut summary = Self::default();
        for cause in entries.into_iter().filter_map(|e| e.status.retirement_cause()) {
            match cause {
                RetirementCause::DriverFault => summary.driver_fault += 1,
                RetirementCause::CarFault => summary.car_fault += 1,
                RetirementCause::Other => summary.other += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.driver_fault + self.car_fault + self.other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub model_version: String,
    pub season: i32,
    /// Predicted scalar against the split time it was trained on.
    pub raw: SeriesStatistics,
    pub race_positions: PositionEvaluation,
    pub drivers: ChampionshipEvaluation,
    pub constructors: ChampionshipEvaluation,
    pub driver_standings: Vec<StandingsRow>,
    pub constructor_standings: Vec<StandingsRow>,
    pub excluded_races: Vec<RaceKey>,
    pub retirements: RetirementSummary,
}

impl EvaluationReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Season {} evaluation ({})", self.season, self.model_version)?;
        if !self.excluded_races.is_empty() {
            let races: Vec<String> = self.excluded_races.iter().map(|r| r.round.to_string()).collect();
            writeln!(f, "Rounds without a winner: {}", races.join(", "))?;
        }
        writeln!(
            f,
            "Retirements: {} ({} driver, {} car, {} other)",
            self.retirements.total(),
            self.retirements.driver_fault,
            self.retirements.car_fault,
            self.retirements.other
        )?;

        writeln!(f, "\nSplit time")?;
        write_statistics(f, &self.raw)?;

        writeln!(f, "\nRace positions")?;
        write_statistics(f, &self.race_positions.statistics)?;
        write_tolerance(f, &self.race_positions.tolerance)?;

        for (evaluation, rows, limit) in [
            (&self.drivers, &self.driver_standings, Some(SUMMARY_DRIVERS)),
            (&self.constructors, &self.constructor_standings, None),
        ] {
            let title = match evaluation.championship {
                Championship::Drivers => "Drivers' championship",
                Championship::Constructors => "Constructors' championship",
            };
            writeln!(f, "\n{title}")?;
            write_statistics(f, &evaluation.statistics)?;
            write_tolerance(f, &evaluation.tolerance)?;
            f.write_str(&format_standings(rows, evaluation.championship, limit))?;
        }
        Ok(())
    }
}

fn write_statistics(f: &mut fmt::Formatter<'_>, stats: &SeriesStatistics) -> fmt::Result {
    let show = |v: Option<f64>| v.map_or_else(|| "undefined".to_string(), |v| format!("{v:.3}"));
    writeln!(
        f,
        "  n={}  spearman={}  pearson={}  r2={}  mse={}  rmse={}",
        stats.count,
        show(stats.spearman),
        show(stats.pearson),
        show(stats.r2),
        show(stats.mse),
        show(stats.rmse)
    )
}

fn write_tolerance(f: &mut fmt::Formatter<'_>, rates: &[ToleranceRate]) -> fmt::Result {
    for rate in rates {
        writeln!(f, "  within {}: {:.1}%", rate.tolerance, rate.rate * 100.0)?;
    }
    Ok(())
}
