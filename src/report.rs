//! Result presentation and export
//!
//! Prices and the volume ratio are shown with two decimals, returns as
//! percentages with one decimal. Rounding happens here only; the engine
//! keeps full precision.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

use crate::config::AnalysisParams;
use crate::engine::{AnalysisOutcome, AnalysisSummary, BreakoutEvent};

/// Default export file name
pub const EXPORT_FILE_NAME: &str = "breakout_analysis.csv";

/// Round to two decimals (banker's rounding on the exact binary value),
/// always carrying a scale of 2 so `5.0` prints as `5.00`
pub fn round2(value: f64) -> Decimal {
    let mut rounded = Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(2))
        .unwrap_or(Decimal::ZERO);
    rounded.rescale(2);
    rounded
}

/// `0.05` -> `"5.0%"`
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// `"5.0%"` -> `0.05`
pub fn parse_percent(text: &str) -> Option<f64> {
    let number = text.trim().strip_suffix('%')?;
    number.trim().parse::<f64>().ok().map(|v| v / 100.0)
}

/// One exported row, in presentation format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub entry_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub entry_price: Decimal,
    pub exit_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub exit_price: Decimal,
    pub volume: u64,
    #[serde(with = "rust_decimal::serde::str")]
    pub volume_ratio: Decimal,
    pub daily_return: String,
    pub forward_return: String,
}

impl From<&BreakoutEvent> for EventRecord {
    fn from(event: &BreakoutEvent) -> Self {
        Self {
            entry_date: event.entry_date,
            entry_price: round2(event.entry_price),
            exit_date: event.exit_date,
            exit_price: round2(event.exit_price),
            volume: event.volume,
            volume_ratio: round2(event.volume_ratio),
            daily_return: format_percent(event.daily_return),
            forward_return: format_percent(event.forward_return),
        }
    }
}

impl EventRecord {
    pub fn daily_return_value(&self) -> Option<f64> {
        parse_percent(&self.daily_return)
    }

    pub fn forward_return_value(&self) -> Option<f64> {
        parse_percent(&self.forward_return)
    }
}

pub fn to_records(events: &[BreakoutEvent]) -> Vec<EventRecord> {
    events.iter().map(EventRecord::from).collect()
}

/// Write events as CSV: header row of the eight field names, one row per event
pub fn write_csv<W: Write>(events: &[BreakoutEvent], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in to_records(events) {
        csv_writer.serialize(record).context("Failed to write CSV row")?;
    }
    csv_writer.flush().context("Failed to flush CSV")?;
    Ok(())
}

pub fn to_csv_string(events: &[BreakoutEvent]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(events, &mut buf)?;
    String::from_utf8(buf).context("CSV output is not UTF-8")
}

/// Parse an export produced by [`write_csv`]
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<EventRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for (row_idx, result) in csv_reader.deserialize().enumerate() {
        let record: EventRecord =
            result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        records.push(record);
    }
    Ok(records)
}

pub fn export_csv(events: &[BreakoutEvent], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(events, file)
}

pub fn to_json(outcome: &AnalysisOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("Failed to serialize outcome")
}

/// Summary block printed above the event table
pub fn render_summary(summary: &AnalysisSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Ticker:                 {}\n", summary.ticker));
    out.push_str(&format!("Total Signals:          {}\n", summary.count));
    out.push_str(&format!(
        "Average Forward Return: {}\n",
        format_percent(summary.mean_forward_return)
    ));
    out.push_str(&format!(
        "Analysis Period:        {} to {}\n",
        summary.analysis_period.start, summary.analysis_period.end
    ));
    out.push_str(&format!(
        "Volume Threshold:       {}\n",
        format_percent(summary.volume_threshold)
    ));
    out.push_str(&format!(
        "Price Threshold:        {}\n",
        format_percent(summary.price_threshold)
    ));
    out.push_str(&format!(
        "Holding Period:         {} days\n",
        summary.holding_period
    ));
    out
}

/// Message printed when a run produced no events
pub fn render_no_signals(params: &AnalysisParams) -> String {
    let mut out = format!(
        "No breakout signals found for {} with the given parameters.\n",
        params.ticker
    );
    out.push_str(&format!(
        "Analysis Period:        {} to {}\n",
        params.start_date, params.end_date
    ));
    out.push_str(&format!(
        "Volume Threshold:       {}\n",
        format_percent(params.volume_threshold)
    ));
    out.push_str(&format!(
        "Price Threshold:        {}\n",
        format_percent(params.price_threshold)
    ));
    out.push_str(&format!(
        "Holding Period:         {} days\n",
        params.holding_period
    ));
    out
}

/// Fixed-width event table
pub fn render_table(events: &[BreakoutEvent]) -> String {
    let mut out = format!(
        "{:<4} {:<10} {:>10} {:<10} {:>10} {:>12} {:>7} {:>8} {:>8}\n",
        "#", "Entry", "Price", "Exit", "Price", "Volume", "VolX", "Day%", "Fwd%"
    );
    out.push_str(&"-".repeat(87));
    out.push('\n');

    for (i, record) in to_records(events).iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<10} {:>10} {:<10} {:>10} {:>12} {:>7} {:>8} {:>8}\n",
            i + 1,
            record.entry_date,
            record.entry_price,
            record.exit_date,
            record.exit_price,
            record.volume,
            record.volume_ratio,
            record.daily_return,
            record.forward_return
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::engine::AnalysisPeriod;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn event() -> BreakoutEvent {
        BreakoutEvent {
            entry_date: date(4),
            entry_price: 101.234_567,
            exit_date: date(18),
            exit_price: 99.995,
            volume: 12_345_678,
            volume_ratio: 2.456_789,
            daily_return: 0.034_56,
            forward_return: -0.012_34,
        }
    }

    #[test]
    fn test_format_and_parse_percent() {
        assert_eq!(format_percent(0.05), "5.0%");
        assert_eq!(format_percent(-0.01234), "-1.2%");
        assert_eq!(parse_percent("5.0%"), Some(0.05));
        assert_eq!(parse_percent("5.0"), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(5.0).to_string(), "5.00");
        assert_eq!(round2(101.234_567), dec!(101.23));
        assert_eq!(round2(2.456_789), dec!(2.46));
        assert_eq!(round2(f64::NAN), Decimal::ZERO);
    }

    #[test]
    fn test_record_from_event() {
        let record = EventRecord::from(&event());
        assert_eq!(record.entry_price, dec!(101.23));
        assert_eq!(record.volume_ratio, dec!(2.46));
        assert_eq!(record.daily_return, "3.5%");
        assert_eq!(record.forward_return, "-1.2%");
    }

    #[test]
    fn test_csv_header_and_round_trip() {
        let events = vec![event()];
        let csv = to_csv_string(&events).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(
            header,
            "entry_date,entry_price,exit_date,exit_price,volume,volume_ratio,daily_return,forward_return"
        );

        let parsed = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed, to_records(&events));
        assert!((parsed[0].daily_return_value().unwrap() - 0.035).abs() < 1e-12);
    }

    #[test]
    fn test_render_summary() {
        let summary = AnalysisSummary {
            ticker: "AAPL".to_string(),
            count: 3,
            mean_forward_return: 0.0421,
            analysis_period: AnalysisPeriod {
                start: date(1),
                end: date(29),
            },
            volume_threshold: 2.0,
            price_threshold: 0.02,
            holding_period: 10,
        };
        let text = render_summary(&summary);

        assert!(text.contains("Total Signals:          3"));
        assert!(text.contains("Average Forward Return: 4.2%"));
        assert!(text.contains("Analysis Period:        2024-03-01 to 2024-03-29"));
        assert!(text.contains("Volume Threshold:       200.0%"));
        assert!(text.contains("Price Threshold:        2.0%"));
        assert!(text.contains("Holding Period:         10 days"));
    }

    #[test]
    fn test_render_no_signals_matches_summary_format() {
        let params = AnalysisParams {
            ticker: "AAPL".to_string(),
            start_date: date(1),
            end_date: date(29),
            volume_threshold: 2.0,
            price_threshold: 0.02,
            holding_period: 10,
        };
        let text = render_no_signals(&params);

        assert!(text.starts_with("No breakout signals found for AAPL"));
        assert!(text.contains("Volume Threshold:       200.0%"));
        assert!(text.contains("Price Threshold:        2.0%"));
        assert!(!text.contains("2x"));
    }
}
