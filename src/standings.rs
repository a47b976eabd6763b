// standings ranks are never shared, unlike race positions. tied entities stay
// in the order they first show up in the season (round, then grid slot)

use crate::data::grid_order;
use crate::points::ScoredResult;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Championship {
    Drivers,
    Constructors,
}

impl Championship {
    pub fn entity<'a>(&self, result: &'a ScoredResult) -> &'a str {
        match self {
            Championship::Drivers => &result.key.driver,
            Championship::Constructors => &result.constructor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Championship::Drivers => "driver",
            Championship::Constructors => "constructor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingsRow {
    pub entity: String,
    pub total_points: f64,
    pub rank: u32,
    pub wins: u32,
    pub podiums: u32,
    pub points_finishes: u32,
    pub races: u32,
}

impl StandingsRow {
    fn new(entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            total_points: 0.0,
            rank: 0,
            wins: 0,
            podiums: 0,
            points_finishes: 0,
            races: 0,
        }
    }

    fn add(&mut self, result: &ScoredResult) {
        self.total_points += result.points;
        self.races += 1;
        if result.points > 0.0 {
            self.points_finishes += 1;
        }
        match result.position {
            Some(1) => {
                self.wins += 1;
                self.podiums += 1;
            }
            Some(2) | Some(3) => self.podiums += 1,
            _ => {}
        }
    }
}

/// Sums a season's results per entity and ranks them, most points first.
pub fn aggregate_standings(results: &[ScoredResult], championship: Championship) -> Vec<StandingsRow> {
    let mut stream: Vec<&ScoredResult> = results.iter().collect();
    stream.sort_by_key(|r| (r.key.race, grid_order(r.grid)));

    let mut rows: Vec<StandingsRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for result in stream {
        let entity = championship.entity(result);
        let slot = *index.entry(entity).or_insert_with(|| {
            rows.push(StandingsRow::new(entity));
            rows.len() - 1
        });
        rows[slot].add(result);
    }

    // stable: equal totals keep first-appearance order
    rows.sort_by(|a, b| b.total_points.total_cmp(&a.total_points));
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i as u32 + 1;
    }
    rows
}

/// A predicted standings row joined with the true one for the same entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingsComparison {
    pub entity: String,
    pub predicted_rank: u32,
    pub actual_rank: u32,
    pub predicted_points: f64,
    pub actual_points: f64,
}

impl StandingsComparison {
    pub fn rank_diff(&self) -> i64 {
        self.predicted_rank as i64 - self.actual_rank as i64
    }

    pub fn points_diff(&self) -> f64 {
        self.predicted_points - self.actual_points
    }
}

/// Inner join on entity, in true-standings order.
pub fn compare_standings(predicted: &[StandingsRow], actual: &[StandingsRow]) -> Vec<StandingsComparison> {
    let by_entity: HashMap<&str, &StandingsRow> =
        predicted.iter().map(|row| (row.entity.as_str(), row)).collect();
    actual
        .iter()
        .filter_map(|truth| {
            let pred = by_entity.get(truth.entity.as_str())?;
            Some(StandingsComparison {
                entity: truth.entity.clone(),
                predicted_rank: pred.rank,
                actual_rank: truth.rank,
                predicted_points: pred.total_points,
                actual_points: truth.total_points,
            })
        })
        .collect()
}

/// Fixed-width standings table, optionally cut to the top `limit` rows.
pub fn format_standings(rows: &[StandingsRow], championship: Championship, limit: Option<usize>) -> String {
    let limit = limit.unwrap_or(rows.len());
    let width = rows
        .iter()
        .take(limit)
        .map(|r| r.entity.len())
        .chain(std::iter::once(championship.label().len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("{:>4}  {:<width$}  {:>7}  {:>4}\n", "pos", championship.label(), "points", "wins"));
    for row in rows.iter().take(limit) {
        out.push_str(&format!(
            "{:>4}  {:<width$}  {:>7}  {:>4}\n",
            row.rank, row.entity, row.total_points, row.wins
        ));
    }
    out
}
