//! Error taxonomy for analysis runs and market data providers

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::AnalysisParams;
use crate::types::SeriesError;

/// Parameter domain violations, detected before any data is fetched
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("start date {start} must be before end date {end}")]
    DateOrder { start: NaiveDate, end: NaiveDate },

    #[error("volume threshold ({0}) must be greater than 0")]
    VolumeThreshold(f64),

    #[error("price threshold ({0}) must be in (0, 1]")]
    PriceThreshold(f64),

    #[error("holding period ({0}) must be at least 1 bar")]
    HoldingPeriod(usize),
}

/// Market data provider failures
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Data not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Why a run had no usable data
#[derive(Debug, Error)]
pub enum DataIssue {
    #[error("data fetch failed: {0}")]
    Fetch(#[from] ProviderError),

    #[error("provider returned no bars")]
    Empty,

    #[error("malformed bar series: {0}")]
    Malformed(#[from] SeriesError),

    #[error("no bars inside the analysis period")]
    NoBarsInRange,

    #[error("only {available} warm-up bars before the start date, {required} required")]
    InsufficientWarmUp { available: usize, required: usize },

    #[error("warm-up buffer of {buffer_days} days (attempt {attempt}) falls outside the calendar")]
    BufferOutOfRange { buffer_days: i64, attempt: u32 },
}

/// Terminal failure of an analysis run.
///
/// Every variant carries the parameters of the run so the caller can explain
/// what was attempted.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid parameters ({params}): {reason}")]
    InvalidParameters {
        reason: ParameterError,
        params: Box<AnalysisParams>,
    },

    #[error("data unavailable ({params}): {reason}")]
    DataUnavailable {
        reason: DataIssue,
        params: Box<AnalysisParams>,
    },
}

impl AnalysisError {
    pub fn invalid(reason: ParameterError, params: &AnalysisParams) -> Self {
        Self::InvalidParameters {
            reason,
            params: Box::new(params.clone()),
        }
    }

    pub fn unavailable(reason: impl Into<DataIssue>, params: &AnalysisParams) -> Self {
        Self::DataUnavailable {
            reason: reason.into(),
            params: Box::new(params.clone()),
        }
    }

    pub fn params(&self) -> &AnalysisParams {
        match self {
            Self::InvalidParameters { params, .. } | Self::DataUnavailable { params, .. } => params,
        }
    }

    /// Short label for tables and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameters { .. } => "invalid parameters",
            Self::DataUnavailable { .. } => "data unavailable",
        }
    }
}
