//! Run configuration loaded from a TOML file.

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tolerance levels of the published margin-of-error table.
pub const DEFAULT_TOLERANCES: [u32; 4] = [0, 1, 2, 3];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub evaluation: EvaluationConfig,
    pub logging: LoggingConfig,
}

/// Input tables produced by the data-collection layer and the estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub races: String,
    pub qualifying: String,
    pub predictions: String,
    pub features_out: Option<String>,
    pub report_out: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            races: "data/races.csv".to_string(),
            qualifying: "data/qualifying.csv".to_string(),
            predictions: "data/predictions.csv".to_string(),
            features_out: None,
            report_out: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub season: i32,
    pub tolerances: Vec<u32>,
    pub model_version: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            season: 2020,
            tolerances: DEFAULT_TOLERANCES.to_vec(),
            model_version: "unversioned".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PredictorError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| PredictorError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.evaluation.tolerances.is_empty() {
            return Err(PredictorError::Config(
                "evaluation.tolerances must name at least one level".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_published_tolerances() {
        let config = Config::default();
        assert_eq!(config.evaluation.tolerances, vec![0, 1, 2, 3]);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [evaluation]
            season = 2021
            model_version = "xgb-150"

            [data]
            report_out = "out/report.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.evaluation.season, 2021);
        assert_eq!(config.evaluation.tolerances, vec![0, 1, 2, 3]);
        assert_eq!(config.data.races, "data/races.csv");
        assert_eq!(config.data.report_out.as_deref(), Some("out/report.json"));
    }

    #[test]
    fn test_empty_tolerances_rejected() {
        let err = Config::from_toml("[evaluation]\ntolerances = []\n").unwrap_err();
        assert!(matches!(err, PredictorError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, PredictorError::Config(_)));
    }
}
