use crate::error::{PredictorError, Result};
use crate::qualifying::parse_lap_time;
use crate::weather;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

// Status strings of the source data, grouped by who caused the retirement.
const DRIVER_FAULT_STATUSES: &[&str] = &[
    "Retired", "Withdrew", "Collision", "Accident", "Disqualified", "Damage", "Spun off",
    "Collision damage", "Puncture", "Rear wing", "Tyre", "Front wing", "Excluded", "Illness",
];

const CAR_FAULT_STATUSES: &[&str] = &[
    "Suspension", "Wheel", "Vibrations", "Engine", "ERS", "Power loss", "Water leak",
    "Oil pressure", "Hydraulics", "Steering", "Power Unit", "Brakes", "Mechanical", "Turbo",
    "Battery", "Electrical", "Gearbox", "Wheel nut", "Technical", "Fuel system", "Clutch",
    "Out of fuel", "Driveshaft", "Transmission", "Fuel pressure", "Exhaust", "Oil leak",
    "Electronics", "Drivetrain", "Overheating", "Water pressure", "Radiator", "Debris",
    "Throttle", "Spark plugs", "Brake duct", "Seat",
];

/// Identifies one race: (season, 1-based round).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RaceKey {
    pub season: i32,
    pub round: u32,
}

impl RaceKey {
    pub fn new(season: i32, round: u32) -> Self {
        Self { season, round }
    }
}

impl fmt::Display for RaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} round {}", self.season, self.round)
    }
}

/// Identifies one driver's entry in one race.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverRaceKey {
    pub race: RaceKey,
    pub driver: String,
}

impl DriverRaceKey {
    pub fn new(race: RaceKey, driver: impl Into<String>) -> Self {
        Self {
            race,
            driver: driver.into(),
        }
    }
}

/// Why a retired car stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetirementCause {
    DriverFault,
    CarFault,
    Other,
}

/// Classification status as published with the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    Finished,
    /// Classified at the leader's finish, this many laps down.
    Lapped(u32),
    Retired(String),
}

impl RaceStatus {
    /// Parses "Finished", "+N Lap"/"+N Laps", anything else is a retirement reason.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("finished") {
            return RaceStatus::Finished;
        }
        if let Some(rest) = raw.strip_prefix('+') {
            let mut parts = rest.split_whitespace();
            if let (Some(count), Some(unit)) = (parts.next(), parts.next()) {
                if unit.starts_with("Lap") {
                    if let Ok(laps) = count.parse::<u32>() {
                        return RaceStatus::Lapped(laps);
                    }
                }
            }
        }
        RaceStatus::Retired(raw.to_string())
    }

    /// Finished or lapped: the car was running at the chequered flag.
    pub fn is_classified_finish(&self) -> bool {
        !matches!(self, RaceStatus::Retired(_))
    }

    pub fn laps_down(&self) -> Option<u32> {
        match self {
            RaceStatus::Finished => Some(0),
            RaceStatus::Lapped(laps) => Some(*laps),
            RaceStatus::Retired(_) => None,
        }
    }

    pub fn retirement_cause(&self) -> Option<RetirementCause> {
        let RaceStatus::Retired(reason) = self else {
            return None;
        };
        let cause = if DRIVER_FAULT_STATUSES.iter().any(|s| s.eq_ignore_ascii_case(reason)) {
            RetirementCause::DriverFault
        } else if CAR_FAULT_STATUSES.iter().any(|s| s.eq_ignore_ascii_case(reason)) {
            RetirementCause::CarFault
        } else {
            RetirementCause::Other
        };
        Some(cause)
    }
}

/// One driver's result in one race.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceEntry {
    pub race: RaceKey,
    pub driver: String,
    pub constructor: String,
    /// Post-penalty starting slot; 0 is a pit-lane start.
    pub grid: u32,
    /// `None` when the driver did not qualify.
    pub qualifying_position: Option<u32>,
    pub finish_time: Option<Duration>,
    pub laps: u32,
    pub status: RaceStatus,
    /// Points as published, fractional in half-points races.
    pub points: f64,
    pub finish_position: Option<u32>,
    pub date_of_birth: Option<NaiveDate>,
    pub race_date: Option<NaiveDate>,
    /// Cleaned race-day weather text, when the source had any.
    pub weather: Option<String>,
}

impl RaceEntry {
    pub fn key(&self) -> DriverRaceKey {
        DriverRaceKey::new(self.race, self.driver.clone())
    }

    pub fn grid_order(&self) -> u32 {
        grid_order(self.grid)
    }

    pub fn track_temperature(&self) -> Option<f64> {
        weather::extract_temperature(self.weather.as_deref()?)
    }
}

/// Sort key for within-round grid order; pit-lane starters line up behind the grid.
pub fn grid_order(grid: u32) -> u32 {
    if grid == 0 {
        u32::MAX
    } else {
        grid
    }
}

/// Up to three qualifying session times for one driver in one race.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifyingEntry {
    pub race: RaceKey,
    pub driver: String,
    pub sessions: [Option<Duration>; 3],
}

impl QualifyingEntry {
    pub fn new(race: RaceKey, driver: impl Into<String>, sessions: [Option<Duration>; 3]) -> Self {
        Self {
            race,
            driver: driver.into(),
            sessions,
        }
    }

    pub fn key(&self) -> DriverRaceKey {
        DriverRaceKey::new(self.race, self.driver.clone())
    }

    /// A later session can only be present if an earlier one is.
    pub fn is_consistent(&self) -> bool {
        self.sessions
            .iter()
            .enumerate()
            .all(|(k, s)| k == 0 || s.is_none() || self.sessions[..k].iter().any(Option::is_some))
    }
}

#[derive(Debug, Deserialize)]
struct RawRaceRow {
    season: i32,
    round: u32,
    driver: String,
    constructor: String,
    grid: u32,
    #[serde(rename = "qual_position")]
    qualifying_position: Option<u32>,
    time_millis: Option<u64>,
    laps: u32,
    status: String,
    #[serde(default)]
    points: Option<f64>,
    finish_position: Option<u32>,
    #[serde(default)]
    date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    race_date: Option<NaiveDate>,
    #[serde(default)]
    weather: Option<String>,
}

impl RawRaceRow {
    fn into_entry(self) -> RaceEntry {
        RaceEntry {
            race: RaceKey::new(self.season, self.round),
            driver: self.driver.trim().to_string(),
            constructor: self.constructor.trim().to_string(),
            grid: self.grid,
            qualifying_position: self.qualifying_position.filter(|p| *p > 0),
            finish_time: self.time_millis.map(Duration::from_millis),
            laps: self.laps,
            status: RaceStatus::parse(&self.status),
            points: self.points.unwrap_or(0.0),
            finish_position: self.finish_position.filter(|p| *p > 0),
            date_of_birth: self.date_of_birth,
            race_date: self.race_date,
            weather: Some(weather::clean_weather_text(self.weather.as_deref())).filter(|w| !w.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawQualifyingRow {
    season: i32,
    round: u32,
    driver: String,
    q1: Option<String>,
    q2: Option<String>,
    q3: Option<String>,
}

/// Race results grouped by race, each race in grid order.
#[derive(Debug, Clone, Default)]
pub struct RaceTable {
    pub races: BTreeMap<RaceKey, Vec<RaceEntry>>,
}

impl RaceTable {
    pub fn load<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let reader = ReaderBuilder::new().has_headers(true).from_path(filename)?;
        Self::read(reader)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        Self::read(ReaderBuilder::new().has_headers(true).from_reader(rdr))
    }

    fn read<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut entries = Vec::new();
        for res in reader.deserialize() {
            let raw: RawRaceRow = res?;
            if raw.driver.trim().is_empty() || raw.constructor.trim().is_empty() || raw.round == 0 {
                debug!(season = raw.season, round = raw.round, "skipping row without driver, constructor or round");
                continue;
            }
            entries.push(raw.into_entry());
        }
        let table = Self::from_entries(entries);
        info!(races = table.races.len(), "loaded race results");
        Ok(table)
    }

    /// Groups entries by race, keeping the first row of any duplicated driver.
    pub fn from_entries(entries: Vec<RaceEntry>) -> Self {
        let mut races: BTreeMap<RaceKey, Vec<RaceEntry>> = BTreeMap::new();
        for entry in entries {
            let race = races.entry(entry.race).or_default();
            if race.iter().any(|e| e.driver == entry.driver) {
                warn!(race = %entry.race, driver = %entry.driver, "duplicate driver entry dropped");
                continue;
            }
            race.push(entry);
        }
        // stable: equal grid slots keep file order
        races.values_mut().for_each(|race| race.sort_by_key(RaceEntry::grid_order));
        Self { races }
    }

    pub fn season(&self, season: i32) -> impl Iterator<Item = (&RaceKey, &Vec<RaceEntry>)> {
        self.races.iter().filter(move |(key, _)| key.season == season)
    }

    pub fn get(&self, key: &DriverRaceKey) -> Option<&RaceEntry> {
        self.races.get(&key.race)?.iter().find(|e| e.driver == key.driver)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QualifyingTable {
    pub entries: HashMap<DriverRaceKey, QualifyingEntry>,
}

impl QualifyingTable {
    pub fn load<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let reader = ReaderBuilder::new().has_headers(true).from_path(filename)?;
        Self::read(reader)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        Self::read(ReaderBuilder::new().has_headers(true).from_reader(rdr))
    }

    fn read<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut entries = Vec::new();
        for res in reader.deserialize() {
            let raw: RawQualifyingRow = res?;
            let parse = |time: Option<String>| -> Option<Duration> {
                let time = time?;
                match parse_lap_time(&time) {
                    Ok(t) => Some(t),
                    Err(PredictorError::InvalidLapTime(_)) if time.trim().is_empty() => None,
                    Err(e) => {
                        debug!(driver = %raw.driver, error = %e, "qualifying time treated as absent");
                        None
                    }
                }
            };
            let race = RaceKey::new(raw.season, raw.round);
            let sessions = [parse(raw.q1), parse(raw.q2), parse(raw.q3)];
            entries.push(QualifyingEntry::new(race, raw.driver.trim(), sessions));
        }
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<QualifyingEntry>) -> Self {
        let mut table = HashMap::new();
        for entry in entries {
            if !entry.is_consistent() {
                warn!(race = %entry.race, driver = %entry.driver, "qualifying sessions skip forward, entry dropped");
                continue;
            }
            table.entry(entry.key()).or_insert(entry);
        }
        Self { entries: table }
    }

    pub fn get(&self, key: &DriverRaceKey) -> Option<&QualifyingEntry> {
        self.entries.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RACES: &str = r#"season,round,driver,constructor,grid,qual_position,time_millis,laps,status,points,finish_position,weather
2020,1,bottas,mercedes,1,1,5127717,58,Finished,26,1,"Sunny, 28ºC[2]"
2020,1,leclerc,ferrari,7,7,5130417,58,Finished,18,2,sunny
2020,1,norris,mclaren,0,,,57,+1 Lap,0,3,
2020,1,verstappen,red_bull,3,3,,25,Power Unit,0,,sunny
2020,1,leclerc,ferrari,8,8,,10,Engine,0,,sunny
"#;

    #[test]
    fn test_status_parsing() {
        assert_eq!(RaceStatus::parse("Finished"), RaceStatus::Finished);
        assert_eq!(RaceStatus::parse("+1 Lap"), RaceStatus::Lapped(1));
        assert_eq!(RaceStatus::parse("+3 Laps"), RaceStatus::Lapped(3));
        assert_eq!(RaceStatus::parse("Gearbox"), RaceStatus::Retired("Gearbox".to_string()));
        assert_eq!(RaceStatus::parse("+ Laps"), RaceStatus::Retired("+ Laps".to_string()));
    }

    #[test]
    fn test_retirement_causes() {
        assert_eq!(RaceStatus::parse("Collision").retirement_cause(), Some(RetirementCause::DriverFault));
        assert_eq!(RaceStatus::parse("Gearbox").retirement_cause(), Some(RetirementCause::CarFault));
        assert_eq!(RaceStatus::parse("Fuel leak").retirement_cause(), Some(RetirementCause::Other));
        assert_eq!(RaceStatus::Lapped(2).retirement_cause(), None);
    }

    #[test]
    fn test_race_table_groups_and_orders_by_grid() {
        let table = RaceTable::from_reader(RACES.as_bytes()).unwrap();
        let race = &table.races[&RaceKey::new(2020, 1)];

        // duplicate leclerc row dropped, pit-lane starter moved to the back
        let drivers: Vec<&str> = race.iter().map(|e| e.driver.as_str()).collect();
        assert_eq!(drivers, vec!["bottas", "verstappen", "leclerc", "norris"]);

        let norris = &race[3];
        assert_eq!(norris.qualifying_position, None);
        assert_eq!(norris.finish_time, None);
        assert_eq!(norris.status, RaceStatus::Lapped(1));
        assert_eq!(race[0].finish_time, Some(Duration::from_millis(5127717)));
        assert_eq!(race[0].points, 26.0);

        assert_eq!(race[0].weather.as_deref(), Some("sunny 28°c"));
        assert_eq!(race[0].track_temperature(), Some(28.0));
        assert_eq!(norris.weather, None);
    }

    #[test]
    fn test_qualifying_table_parses_times() {
        let csv = "season,round,driver,q1,q2,q3\n2020,1,bottas,1:24.000,1:23.500, 1:23.000 \n2020,1,latifi,1:26.000,,\n2020,1,ghost,,1:25.000,\n";
        let table = QualifyingTable::from_reader(csv.as_bytes()).unwrap();

        let bottas = table.get(&DriverRaceKey::new(RaceKey::new(2020, 1), "bottas")).unwrap();
        assert_eq!(bottas.sessions[2], Some(Duration::from_millis(83_000)));

        let latifi = table.get(&DriverRaceKey::new(RaceKey::new(2020, 1), "latifi")).unwrap();
        assert_eq!(latifi.sessions, [Some(Duration::from_secs(86)), None, None]);

        // Q2 without Q1 skips forward
        assert!(table.get(&DriverRaceKey::new(RaceKey::new(2020, 1), "ghost")).is_none());
    }

    #[test]
    fn test_consistency_allows_non_participants() {
        let key = RaceKey::new(2021, 2);
        assert!(QualifyingEntry::new(key, "x", [None, None, None]).is_consistent());
        assert!(!QualifyingEntry::new(key, "x", [None, None, Some(Duration::from_secs(80))]).is_consistent());
    }
}
