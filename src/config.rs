//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable overrides for the data source.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::ParameterError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub analysis: AnalysisDefaults,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env()?;
        config.data.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise start from defaults.
    /// Environment overrides apply in both cases.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let mut config = Config::default();
                config.apply_env()?;
                config.data.validate()?;
                Ok(config)
            }
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("BREAKOUT_DATA_DIR") {
            self.data.data_dir = dir;
        }
        if let Ok(source) = std::env::var("BREAKOUT_SOURCE") {
            self.data.source = source
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid BREAKOUT_SOURCE")?;
        }
        Ok(())
    }
}

/// Where bars come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Yahoo,
    Csv,
}

impl std::str::FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yahoo" => Ok(DataSource::Yahoo),
            "csv" => Ok(DataSource::Csv),
            _ => Err(format!("Unknown data source: {}. Use 'yahoo' or 'csv'", s)),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Yahoo => write!(f, "yahoo"),
            DataSource::Csv => write!(f, "csv"),
        }
    }
}

/// Data retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub source: DataSource,
    /// Directory holding `{TICKER}_1d.csv` files for the CSV source
    pub data_dir: String,
    /// Calendar days fetched ahead of the start date to seed rolling windows
    pub buffer_days: i64,
    /// How many times the buffer may be widened when it holds too few bars
    #[serde(default = "default_max_buffer_extensions")]
    pub max_buffer_extensions: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Use split/dividend adjusted closes when the provider has them
    #[serde(default = "default_adjusted")]
    pub adjusted: bool,
}

/// Upper bound on `buffer_days`, ten years of calendar days
pub const MAX_BUFFER_DAYS: i64 = 3650;

impl DataConfig {
    /// Reject warm-up settings the engine cannot turn into a fetch window
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_BUFFER_DAYS).contains(&self.buffer_days) {
            anyhow::bail!(
                "data.buffer_days must be between 1 and {}, got {}",
                MAX_BUFFER_DAYS,
                self.buffer_days
            );
        }
        if self.max_buffer_extensions > 10 {
            anyhow::bail!(
                "data.max_buffer_extensions must be at most 10, got {}",
                self.max_buffer_extensions
            );
        }
        Ok(())
    }
}

fn default_max_buffer_extensions() -> u32 {
    2
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_adjusted() -> bool {
    true
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            source: DataSource::Yahoo,
            data_dir: "data".to_string(),
            buffer_days: 40,
            max_buffer_extensions: default_max_buffer_extensions(),
            request_timeout_secs: default_request_timeout_secs(),
            adjusted: default_adjusted(),
        }
    }
}

/// Default analysis parameters, overridable from the command line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDefaults {
    pub ticker: String,
    pub start_date: NaiveDate,
    /// `None` means today
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub volume_threshold: f64,
    pub price_threshold: f64,
    pub holding_period: usize,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        AnalysisDefaults {
            ticker: "AAPL".to_string(),
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            end_date: None,
            volume_threshold: 2.0,  // 200% of baseline
            price_threshold: 0.02,  // 2% daily move
            holding_period: 10,
        }
    }
}

impl AnalysisDefaults {
    /// Resolve into concrete parameters; a missing end date becomes `today`.
    pub fn to_params(&self, today: NaiveDate) -> AnalysisParams {
        AnalysisParams {
            ticker: self.ticker.clone(),
            start_date: self.start_date,
            end_date: self.end_date.unwrap_or(today),
            volume_threshold: self.volume_threshold,
            price_threshold: self.price_threshold,
            holding_period: self.holding_period,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub results_dir: String,
    #[serde(default)]
    pub export_csv: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            results_dir: "results".to_string(),
            export_csv: false,
        }
    }
}

/// Inputs of a single analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Volume / baseline ratio a breakout must exceed (2.0 = 200%)
    pub volume_threshold: f64,
    /// Daily return a breakout must exceed (0.02 = 2%)
    pub price_threshold: f64,
    /// Bars held after entry before measuring the exit
    pub holding_period: usize,
}

impl AnalysisParams {
    pub fn validate(&self) -> std::result::Result<(), ParameterError> {
        if self.ticker.trim().is_empty() {
            return Err(ParameterError::EmptyTicker);
        }

        if self.start_date >= self.end_date {
            return Err(ParameterError::DateOrder {
                start: self.start_date,
                end: self.end_date,
            });
        }

        if !self.volume_threshold.is_finite() || self.volume_threshold <= 0.0 {
            return Err(ParameterError::VolumeThreshold(self.volume_threshold));
        }

        // NaN fails both comparisons, so test for membership instead
        if !(self.price_threshold > 0.0 && self.price_threshold <= 1.0) {
            return Err(ParameterError::PriceThreshold(self.price_threshold));
        }

        if self.holding_period < 1 {
            return Err(ParameterError::HoldingPeriod(self.holding_period));
        }

        Ok(())
    }
}

impl fmt::Display for AnalysisParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ticker={} period={}..={} volume_threshold={} price_threshold={} holding_period={}",
            self.ticker,
            self.start_date,
            self.end_date,
            self.volume_threshold,
            self.price_threshold,
            self.holding_period
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> AnalysisParams {
        AnalysisDefaults::default().to_params(NaiveDate::from_ymd_opt(2024, 6, 28).unwrap())
    }

    #[test]
    fn test_defaults_are_valid() {
        let p = params();
        assert_eq!(p.ticker, "AAPL");
        assert_eq!(p.holding_period, 10);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_dates() {
        let mut p = params();
        p.end_date = p.start_date;
        assert!(matches!(p.validate(), Err(ParameterError::DateOrder { .. })));
    }

    #[test]
    fn test_rejects_thresholds_outside_domain() {
        let mut p = params();
        p.volume_threshold = 0.0;
        assert_eq!(p.validate(), Err(ParameterError::VolumeThreshold(0.0)));

        let mut p = params();
        p.price_threshold = 1.5;
        assert_eq!(p.validate(), Err(ParameterError::PriceThreshold(1.5)));

        let mut p = params();
        p.price_threshold = 1.0;
        assert!(p.validate().is_ok());

        let mut p = params();
        p.holding_period = 0;
        assert_eq!(p.validate(), Err(ParameterError::HoldingPeriod(0)));

        let mut p = params();
        p.ticker = "  ".to_string();
        assert_eq!(p.validate(), Err(ParameterError::EmptyTicker));
    }

    #[test]
    fn test_config_parses_partial_json() {
        let json = r#"{
            "data": { "source": "csv", "data_dir": "fixtures", "buffer_days": 60 },
            "analysis": {
                "ticker": "MSFT",
                "start_date": "2023-01-01",
                "end_date": "2023-12-31",
                "volume_threshold": 3.0,
                "price_threshold": 0.03,
                "holding_period": 5
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.data.source, DataSource::Csv);
        assert_eq!(config.data.buffer_days, 60);
        assert_eq!(config.data.max_buffer_extensions, 2);
        assert!(config.data.adjusted);
        assert_eq!(config.output.results_dir, "results");
        assert_eq!(config.analysis.end_date, NaiveDate::from_ymd_opt(2023, 12, 31));
    }

    #[test]
    fn test_rejects_oversized_buffer_days() {
        let data = DataConfig {
            buffer_days: 100_000_000,
            ..DataConfig::default()
        };
        assert!(data.validate().is_err());

        let data = DataConfig {
            buffer_days: 0,
            ..DataConfig::default()
        };
        assert!(data.validate().is_err());
        assert!(DataConfig::default().validate().is_ok());

        let path = std::env::temp_dir().join("breakout_oversized_buffer.json");
        fs::write(&path, r#"{ "data": { "source": "csv", "data_dir": "d", "buffer_days": 100000000 } }"#)
            .unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("buffer_days"));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_data_source_from_str() {
        assert_eq!("Yahoo".parse::<DataSource>(), Ok(DataSource::Yahoo));
        assert_eq!("csv".parse::<DataSource>(), Ok(DataSource::Csv));
        assert!("bloomberg".parse::<DataSource>().is_err());
    }
}
