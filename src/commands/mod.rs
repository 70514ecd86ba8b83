//! Subcommand implementations

pub mod analyze;
pub mod download;
pub mod scan;

use anyhow::{Context, Result};
use breakout_analyzer::config::{AnalysisParams, Config, DataSource};
use breakout_analyzer::data::{BarProvider, CsvBarProvider};
use breakout_analyzer::engine::{BreakoutEngine, WarmUpPolicy};
use breakout_analyzer::yahoo::YahooBarProvider;
use chrono::NaiveDate;
use tracing::info;

use crate::AnalysisArgs;

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", value))
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Load the config file and apply command-line overrides to it
pub fn load_config(args: &AnalysisArgs) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(path) = &args.config {
        info!("Loaded configuration from: {}", path);
    }

    if let Some(source) = args.source {
        info!("Overriding data source to: {}", source);
        config.data.source = source;
    }
    if let Some(dir) = &args.data_dir {
        info!("Overriding data dir to: {}", dir);
        config.data.data_dir = dir.clone();
    }
    if let Some(start) = &args.start {
        config.analysis.start_date = parse_date(start)?;
    }
    if let Some(end) = &args.end {
        config.analysis.end_date = Some(parse_date(end)?);
    }
    if let Some(v) = args.volume_threshold {
        config.analysis.volume_threshold = v;
    }
    if let Some(p) = args.price_threshold {
        config.analysis.price_threshold = p;
    }
    if let Some(h) = args.holding_period {
        config.analysis.holding_period = h;
    }

    Ok(config)
}

/// Parameters for `ticker` using the config's defaults
pub fn params_for(config: &Config, ticker: &str) -> AnalysisParams {
    let mut params = config.analysis.to_params(today());
    params.ticker = ticker.trim().to_string();
    params
}

pub fn build_provider(config: &Config) -> Result<Box<dyn BarProvider>> {
    let provider: Box<dyn BarProvider> = match config.data.source {
        DataSource::Yahoo => Box::new(
            YahooBarProvider::from_config(&config.data).context("Failed to build HTTP client")?,
        ),
        DataSource::Csv => Box::new(CsvBarProvider::new(&config.data.data_dir)),
    };
    Ok(provider)
}

pub fn build_engine(config: &Config) -> Result<BreakoutEngine<Box<dyn BarProvider>>> {
    let provider = build_provider(config)?;
    Ok(BreakoutEngine::new(provider).with_warm_up(WarmUpPolicy::from(&config.data)))
}

/// Split a comma-separated ticker list, dropping blanks and duplicates
pub fn split_tickers(tickers: &str) -> Vec<String> {
    use itertools::Itertools;

    tickers
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .unique()
        .collect()
}
