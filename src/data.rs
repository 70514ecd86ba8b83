//! Data loading and management
//!
//! The engine only sees the [`BarProvider`] capability. Two providers ship
//! with the crate: local CSV files (this module) and the Yahoo Finance chart
//! API ([`crate::yahoo`]).

use chrono::NaiveDate;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::types::Bar;

/// Timeframe suffix used in data file names
pub const DAILY: &str = "1d";

/// Source of daily bars.
///
/// Implementations return bars with `start <= date <= end`, sorted ascending.
/// An empty vector is a valid answer; the caller decides what it means.
pub trait BarProvider: Send + Sync {
    fn provide_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ProviderError>;

    /// Human readable provider name for logs
    fn name(&self) -> &str;
}

impl<P: BarProvider + ?Sized> BarProvider for Box<P> {
    fn provide_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ProviderError> {
        (**self).provide_bars(ticker, start, end)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Load daily bars from a CSV file with header `date,open,high,low,close,volume`
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, ProviderError> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut bars = Vec::new();

    for (row_idx, result) in reader.deserialize::<Bar>().enumerate() {
        let bar = result.map_err(|e| {
            ProviderError::Parse(format!(
                "{} row {}: {}",
                path.as_ref().display(),
                row_idx + 1,
                e
            ))
        })?;
        bars.push(bar);
    }

    Ok(bars)
}

/// Save bars to a CSV file readable by [`load_csv`]
pub fn save_csv(bars: &[Bar], path: impl AsRef<Path>) -> Result<(), ProviderError> {
    let mut file = File::create(path.as_ref())?;

    writeln!(file, "date,open,high,low,close,volume")?;
    for bar in bars {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            bar.date.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        )?;
    }

    info!("Saved {} rows to {}", bars.len(), path.as_ref().display());
    Ok(())
}

/// File name used for a ticker's daily data
pub fn data_file_name(ticker: &str) -> String {
    format!("{}_{}.csv", ticker.trim().to_uppercase(), DAILY)
}

/// Serves bars from `{data_dir}/{TICKER}_1d.csv`
#[derive(Debug, Clone)]
pub struct CsvBarProvider {
    data_dir: PathBuf,
}

impl CsvBarProvider {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.data_dir.join(data_file_name(ticker))
    }
}

impl BarProvider for CsvBarProvider {
    fn provide_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ProviderError> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Err(ProviderError::NotFound(format!(
                "data file not found: {}",
                path.display()
            )));
        }

        let mut bars = load_csv(&path)?;
        let total = bars.len();

        bars.sort_by_key(|b| b.date);
        bars.retain(|b| b.date >= start && b.date <= end);

        debug!(
            "Loaded {} of {} rows from {} for {}..={}",
            bars.len(),
            total,
            path.display(),
            start,
            end
        );
        Ok(bars)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

// =============================================================================
// Tests
// =============================================================================
