use regex::{Captures, Regex};
use std::sync::OnceLock;

// markup and separators left over from scraped race reports
const REPLACEMENTS: &[(&str, &str)] = &[
    ("\u{a0}", " "),
    ("º", "°"),
    ("&amp;", ""),
    (",", " "),
    ("<br>", " "),
    ("<br/>", " "),
    ("</p>", ""),
    ("<p>", ""),
    ("/a>", ""),
    ("☁", "clouds"),
    ("☂", "rain"),
    ("<", ""),
    (">", ""),
    ("weather:", ""),
    ("/", " "),
    (";", " "),
    (":", " "),
    ("(", " "),
    (")", " "),
];

const CONDITIONS: &[&str] = &[
    "sunny", "cloudy", "overcast", "rain", "wet", "dry", "clear", "warm", "hot", "cold", "cool", "humid",
    "windy", "partly", "scattered", "showers",
];

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).expect("weather pattern is a valid regex"))
}

fn citation() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"\[\d+\]")
}

fn glued_word() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"(sunny|cloudy|clear|dry|later|times|temperature)")
}

fn range() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"(\d+(?:\.\d+)?)\s*(?:-|–|\bto\b)\s*(\d+(?:\.\d+)?)")
}

fn temperature() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"(\d+(?:\.\d+)?)\s*(?:°\s*|degrees?\s*)?c\b")
}

/// Normalises free-text race weather: lower case, markup and citations
/// stripped, ranges ("20-25") replaced by their midpoint, single spaces.
/// Missing or placeholder text becomes an empty string.
pub fn clean_weather_text(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim) else {
        return String::new();
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("nan") {
        return String::new();
    }

    let mut text = raw.to_lowercase();
    for (from, to) in REPLACEMENTS {
        text = text.replace(from, to);
    }
    let text = citation().replace_all(&text, "");
    // "drysunny" -> "dry sunny"
    let text = glued_word().replace_all(&text, "$1 ");
    let text = range().replace_all(&text, |caps: &Captures| {
        let low: f64 = caps[1].parse().unwrap_or(0.0);
        let high: f64 = caps[2].parse().unwrap_or(0.0);
        format!("{}", (low + high) / 2.0)
    });
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First Celsius reading in cleaned weather text.
pub fn extract_temperature(cleaned: &str) -> Option<f64> {
    temperature().captures(cleaned)?[1].parse().ok()
}

pub fn weather_conditions(cleaned: &str) -> Vec<&'static str> {
    CONDITIONS.iter().copied().filter(|c| cleaned.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_weather_is_empty() {
        assert_eq!(clean_weather_text(None), "");
        assert_eq!(clean_weather_text(Some("  ")), "");
        assert_eq!(clean_weather_text(Some("nan")), "");
    }

    #[test]
    fn test_clean_weather_text() {
        assert_eq!(clean_weather_text(Some("Sunny, 25°C[3]")), "sunny 25°c");
        assert_eq!(clean_weather_text(Some("<p>DrySunny</p>")), "dry sunny");
        assert_eq!(clean_weather_text(Some("Cloudy 20-25 ºC")), "cloudy 22.5 °c");
        assert_eq!(clean_weather_text(Some("air 18 to 20 c")), "air 19 c");
    }

    #[test]
    fn test_temperature_and_conditions() {
        let cleaned = clean_weather_text(Some("Overcast, light rain showers, 16–18 °C"));
        assert_eq!(extract_temperature(&cleaned), Some(17.0));
        assert_eq!(weather_conditions(&cleaned), vec!["overcast", "rain", "showers"]);
        assert_eq!(extract_temperature("dry and clear"), None);
    }
}
