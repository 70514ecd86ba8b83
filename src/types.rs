//! Core data types used across the analyzer

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for a single bar
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarValidationError {
    #[error("close ({0}) must be a finite positive price")]
    NonPositiveClose(f64),

    #[error("open/high/low must be finite: open={open}, high={high}, low={low}")]
    NonFinitePrice { open: f64, high: f64, low: f64 },
}

/// Errors raised while assembling a [`BarSeries`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bar {index} ({date}): {source}")]
    InvalidBar {
        index: usize,
        date: NaiveDate,
        #[source]
        source: BarValidationError,
    },

    #[error("bar {index}: date {date} does not follow {previous}")]
    NotChronological {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },
}

/// One trading day of OHLCV data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Create a new bar with validation
    pub fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, BarValidationError> {
        let bar = Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Bar with only the fields the engine reads; open/high/low mirror the close.
    pub fn from_close(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    /// Validate the bar data.
    ///
    /// Only the close is load-bearing for the analysis, so the other prices
    /// are merely required to be finite numbers.
    pub fn validate(&self) -> Result<(), BarValidationError> {
        if !self.close.is_finite() || self.close <= 0.0 {
            return Err(BarValidationError::NonPositiveClose(self.close));
        }

        if !(self.open.is_finite() && self.high.is_finite() && self.low.is_finite()) {
            return Err(BarValidationError::NonFinitePrice {
                open: self.open,
                high: self.high,
                low: self.low,
            });
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Daily bars strictly increasing by date
///
/// Gaps (weekends, holidays) are expected; duplicates and out-of-order rows
/// are rejected at construction time so the engine can index freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        for (index, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|source| SeriesError::InvalidBar {
                index,
                date: bar.date,
                source,
            })?;

            if index > 0 {
                let previous = bars[index - 1].date;
                if bar.date <= previous {
                    return Err(SeriesError::NotChronological {
                        index,
                        date: bar.date,
                        previous,
                    });
                }
            }
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Index of the first bar dated on or after `date`
    pub fn position_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.bars.partition_point(|b| b.date < date);
        (idx < self.bars.len()).then_some(idx)
    }

    /// Number of bars dated strictly before `date`
    pub fn count_before(&self, date: NaiveDate) -> usize {
        self.bars.partition_point(|b| b.date < date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }
}

impl TryFrom<Vec<Bar>> for BarSeries {
    type Error = SeriesError;

    fn try_from(bars: Vec<Bar>) -> Result<Self, Self::Error> {
        BarSeries::new(bars)
    }
}
