//! Yahoo Finance daily bar provider
//!
//! Blocking client for the v8 chart endpoint. Timestamps are shifted by the
//! exchange's GMT offset before being turned into trading dates.

use chrono::{DateTime, Duration, NaiveDate};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tracing::{debug, warn};

use crate::config::DataConfig;
use crate::data::BarProvider;
use crate::error::ProviderError;
use crate::types::Bar;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Fetch daily bars from Yahoo Finance
pub struct YahooBarProvider {
    client: reqwest::blocking::Client,
    timeout: StdDuration,
    adjusted: bool,
}

impl YahooBarProvider {
    pub fn new(timeout_secs: u64, adjusted: bool) -> Result<Self, ProviderError> {
        let timeout = StdDuration::from_secs(timeout_secs);
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            timeout,
            adjusted,
        })
    }

    /// Provider honoring `request_timeout_secs` and `adjusted`
    pub fn from_config(config: &DataConfig) -> Result<Self, ProviderError> {
        Self::new(config.request_timeout_secs, config.adjusted)
    }

    pub fn timeout(&self) -> StdDuration {
        self.timeout
    }

    pub fn is_adjusted(&self) -> bool {
        self.adjusted
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Convert a chart payload into bars dated in the exchange's local calendar
fn parse_chart(
    body: ChartResponse,
    adjusted: bool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Bar>, ProviderError> {
    if let Some(err) = body.chart.error {
        return Err(ProviderError::NotFound(err.description));
    }

    let result = match body.chart.result.and_then(|mut r| r.pop()) {
        Some(r) => r,
        None => return Ok(Vec::new()),
    };

    let quote = result
        .indicators
        .quote
        .first()
        .ok_or_else(|| ProviderError::Parse("No quote data".into()))?;

    let adj_close = result
        .indicators
        .adjclose
        .as_ref()
        .and_then(|v| v.first())
        .map(|v| &v.adjclose);

    let mut bars = Vec::with_capacity(result.timestamp.len());
    let mut skipped = 0usize;

    for (i, &ts) in result.timestamp.iter().enumerate() {
        let fields = (
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
            quote.volume.get(i).copied().flatten(),
        );
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = fields else {
            skipped += 1;
            continue;
        };

        let date = match DateTime::from_timestamp(ts + result.meta.gmtoffset, 0) {
            Some(dt) => dt.date_naive(),
            None => {
                skipped += 1;
                continue;
            }
        };
        if date < start || date > end {
            continue;
        }

        // Scale the whole bar so OHLC stay consistent with the adjusted close
        let factor = match adj_close.and_then(|list| list.get(i).copied().flatten()) {
            Some(adj) if adjusted && close > 0.0 => adj / close,
            _ => 1.0,
        };

        bars.push(Bar {
            date,
            open: open * factor,
            high: high * factor,
            low: low * factor,
            close: close * factor,
            volume: volume.max(0.0).round() as u64,
        });
    }

    if skipped > 0 {
        warn!("Skipped {} incomplete rows from Yahoo response", skipped);
    }

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

impl BarProvider for YahooBarProvider {
    fn provide_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ProviderError> {
        let ticker = ticker.trim();
        let url = format!("{}/{}", YAHOO_CHART_URL, ticker);
        // period2 is exclusive
        let period1 = epoch_seconds(start);
        let period2 = epoch_seconds(end + Duration::days(1));

        debug!("GET {} period1={} period2={}", url, period1, period2);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "div,split".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(format!("unknown ticker {}", ticker)));
        }
        if !status.is_success() {
            return Err(ProviderError::Network(format!("HTTP {}", status)));
        }

        let body: ChartResponse = response.json()?;
        parse_chart(body, self.adjusted, start, end)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "gmtoffset": -14400 },
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [187.15, 184.22, null],
                        "high":   [188.44, 185.88, 183.09],
                        "low":    [183.89, 183.43, 180.88],
                        "close":  [185.64, 184.25, 181.91],
                        "volume": [82488700, 58414500, 71983600]
                    }],
                    "adjclose": [{ "adjclose": [92.82, 92.125, 90.955] }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_dates_and_adjustment() {
        let body: ChartResponse = serde_json::from_str(SAMPLE).unwrap();
        let bars = parse_chart(body, true, date(2024, 1, 1), date(2024, 1, 31)).unwrap();

        // third row has a missing open and is dropped
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2024, 1, 2));
        assert_eq!(bars[1].date, date(2024, 1, 3));
        assert!((bars[0].close - 92.82).abs() < 1e-9);
        assert_eq!(bars[0].volume, 82_488_700);
    }

    #[test]
    fn test_parse_chart_unadjusted_and_filtered() {
        let body: ChartResponse = serde_json::from_str(SAMPLE).unwrap();
        let bars = parse_chart(body, false, date(2024, 1, 3), date(2024, 1, 3)).unwrap();

        assert_eq!(bars.len(), 1);
        assert!((bars[0].close - 184.25).abs() < 1e-9);
    }

    #[test]
    fn test_parse_chart_error_payload() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let body: ChartResponse = serde_json::from_str(json).unwrap();
        let err = parse_chart(body, true, date(2024, 1, 1), date(2024, 1, 31)).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_from_config_honors_data_settings() {
        let config = DataConfig {
            request_timeout_secs: 5,
            adjusted: false,
            ..DataConfig::default()
        };
        let provider = YahooBarProvider::from_config(&config).unwrap();

        assert_eq!(provider.timeout(), StdDuration::from_secs(5));
        assert!(!provider.is_adjusted());
    }
}
