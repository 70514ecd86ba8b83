//! Breakout Analyzer
//!
//! Detects high-volume price breakouts in a security's daily history and
//! measures the forward return after each one.

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod report;
pub mod types;
pub mod yahoo;

pub use config::{AnalysisParams, Config};
pub use data::BarProvider;
pub use engine::{analyze, AnalysisOutcome, BreakoutEngine, BreakoutEvent};
pub use error::AnalysisError;
pub use types::*;
