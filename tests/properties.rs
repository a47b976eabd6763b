use f1_standings::points::ScoredResult;
use f1_standings::positions::{resolve_positions, PredictedRaceResult};
use f1_standings::splits::build_split_times;
use f1_standings::standings::aggregate_standings;
use f1_standings::{Championship, DriverRaceKey, RaceEntry, RaceKey, RaceStatus};
use proptest::prelude::*;
use std::time::Duration;

fn finisher(race: RaceKey, index: usize, grid: u32, millis: u64) -> RaceEntry {
    RaceEntry {
        race,
        driver: format!("d{index}"),
        constructor: format!("team{}", index / 2),
        grid,
        qualifying_position: Some(grid),
        finish_time: Some(Duration::from_millis(millis)),
        laps: 57,
        status: RaceStatus::Finished,
        points: 0.0,
        finish_position: None,
        date_of_birth: None,
        race_date: None,
        weather: None,
    }
}

proptest! {
    #[test]
    fn splits_then_positions_recover_finish_order(
        gaps in prop::collection::hash_set(1u64..600_000, 0..20),
    ) {
        let race = RaceKey::new(2022, 7);
        let mut times: Vec<u64> = gaps.into_iter().map(|g| 5_400_000 + g).collect();
        times.push(5_400_000);
        let entries: Vec<RaceEntry> = times
            .iter()
            .enumerate()
            .map(|(i, t)| finisher(race, i, i as u32 + 1, *t))
            .collect();

        let splits = build_split_times(race, &entries).unwrap();
        prop_assert_eq!(splits.len(), entries.len());
        prop_assert_eq!(splits.iter().filter(|s| s.split.is_zero()).count(), 1);

        let predicted: Vec<PredictedRaceResult> = splits
            .iter()
            .map(|s| PredictedRaceResult::new(s.key.clone(), s.seconds()))
            .collect();
        for resolved in resolve_positions(&predicted) {
            let index: usize = resolved.key.driver[1..].parse().unwrap();
            let faster = times.iter().filter(|t| **t < times[index]).count() as u32;
            prop_assert_eq!(resolved.position, faster + 1);
        }
    }

    #[test]
    fn positions_use_competition_ranking(values in prop::collection::vec(0u8..6, 0..24)) {
        let race = RaceKey::new(2022, 1);
        let predicted: Vec<PredictedRaceResult> = values
            .iter()
            .enumerate()
            .map(|(i, v)| PredictedRaceResult::new(DriverRaceKey::new(race, format!("d{i}")), *v as f64))
            .collect();

        let resolved = resolve_positions(&predicted);
        prop_assert_eq!(resolved.len(), values.len());
        for r in &resolved {
            let index: usize = r.key.driver[1..].parse().unwrap();
            let ahead = values.iter().filter(|v| **v < values[index]).count() as u32;
            prop_assert_eq!(r.position, ahead + 1);
        }
    }

    #[test]
    fn standings_are_idempotent_with_distinct_ranks(
        points in prop::collection::vec(0u8..26, 1..40),
    ) {
        let results: Vec<ScoredResult> = points
            .iter()
            .enumerate()
            .map(|(i, p)| ScoredResult {
                key: DriverRaceKey::new(RaceKey::new(2022, 1 + (i / 8) as u32), format!("d{}", i % 8)),
                constructor: format!("team{}", i % 4),
                grid: (i % 8) as u32 + 1,
                position: Some((i % 8) as u32 + 1),
                points: *p as f64,
            })
            .collect();

        for championship in [Championship::Drivers, Championship::Constructors] {
            let first = aggregate_standings(&results, championship);
            let second = aggregate_standings(&results, championship);
            prop_assert_eq!(&first, &second);

            let ranks: Vec<u32> = first.iter().map(|r| r.rank).collect();
            let expected: Vec<u32> = (1..=first.len() as u32).collect();
            prop_assert_eq!(ranks, expected);
            prop_assert!(first.windows(2).all(|w| w[0].total_points >= w[1].total_points));
        }
    }
}
