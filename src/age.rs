use crate::error::{PredictorError, Result};
use chrono::NaiveDate;

const DAYS_PER_YEAR: f64 = 365.25;
pub const VETERAN_AGE_YEARS: f64 = 33.0;

/// Age in whole days on race day.
pub fn age_at_race(date_of_birth: NaiveDate, race_date: NaiveDate) -> Result<i64> {
    let days = race_date.signed_duration_since(date_of_birth).num_days();
    if days < 0 {
        return Err(PredictorError::NegativeDuration(format!(
            "born {} after race on {}",
            date_of_birth, race_date
        )));
    }
    Ok(days)
}

pub fn age_years(age_days: i64) -> f64 {
    age_days as f64 / DAYS_PER_YEAR
}

/// Whole-year bracket on a 365-day year.
pub fn age_bracket(age_days: i64) -> i64 {
    age_days / 365
}

/// Drivers peak between 23 and 27.
pub fn is_peak_age(age_days: i64) -> bool {
    (23.0..=27.0).contains(&age_years(age_days))
}

pub fn is_veteran(age_days: i64, threshold_years: f64) -> bool {
    age_years(age_days) > threshold_years
}
