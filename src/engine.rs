//! Breakout detection and forward-return backtest engine
//!
//! [`analyze`] is a pure function of parameters and bars. [`BreakoutEngine`]
//! wraps it with the data fetch, including the warm-up buffer that seeds the
//! rolling volume baseline.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::{debug, info, trace, warn};

use crate::config::{AnalysisParams, DataConfig};
use crate::data::BarProvider;
use crate::error::{AnalysisError, DataIssue};
use crate::indicators::{pct_change, ratio_to_baseline, sma};
use crate::types::BarSeries;

/// Trailing window of the volume baseline, in bars
pub const VOLUME_WINDOW: usize = 20;

/// Per-bar derived values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarFeatures {
    pub ma_volume: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub daily_return: Option<f64>,
}

/// One qualifying bar and what happened `holding_period` bars later
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakoutEvent {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub volume: u64,
    pub volume_ratio: f64,
    pub daily_return: f64,
    pub forward_return: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub ticker: String,
    pub count: usize,
    pub mean_forward_return: f64,
    pub analysis_period: AnalysisPeriod,
    pub volume_threshold: f64,
    pub price_threshold: f64,
    pub holding_period: usize,
}

/// Non-empty event list plus its summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub summary: AnalysisSummary,
    pub events: Vec<BreakoutEvent>,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Signals(AnalysisReport),
    /// Valid run, nothing qualified
    NoSignals { params: AnalysisParams },
}

impl AnalysisOutcome {
    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            AnalysisOutcome::Signals(report) => Some(report),
            AnalysisOutcome::NoSignals { .. } => None,
        }
    }

    pub fn events(&self) -> &[BreakoutEvent] {
        self.report().map(|r| r.events.as_slice()).unwrap_or(&[])
    }
}

/// Rolling volume baseline, volume ratio and daily return for every bar
pub fn compute_features(series: &BarSeries) -> Vec<BarFeatures> {
    let volumes = series.volumes();
    let ma_volume = sma(&volumes, VOLUME_WINDOW);
    let volume_ratio = ratio_to_baseline(&volumes, &ma_volume);
    let daily_return = pct_change(&series.closes());

    ma_volume
        .into_iter()
        .zip(volume_ratio)
        .zip(daily_return)
        .map(|((ma_volume, volume_ratio), daily_return)| BarFeatures {
            ma_volume,
            volume_ratio,
            daily_return,
        })
        .collect()
}

/// Bar index where a position entered at `entry` is closed
pub fn exit_index(entry: usize, holding_period: usize, len: usize) -> usize {
    entry.saturating_add(holding_period).min(len.saturating_sub(1))
}

/// Run the breakout backtest over an already fetched series.
///
/// The series must hold at least [`VOLUME_WINDOW`] bars before
/// `params.start_date`; bars after `params.end_date` are only used as exits.
pub fn analyze(
    params: &AnalysisParams,
    series: &BarSeries,
) -> Result<AnalysisOutcome, AnalysisError> {
    params
        .validate()
        .map_err(|reason| AnalysisError::invalid(reason, params))?;

    if series.is_empty() {
        return Err(AnalysisError::unavailable(DataIssue::Empty, params));
    }

    let first = series
        .position_on_or_after(params.start_date)
        .filter(|&i| series.bars()[i].date <= params.end_date)
        .ok_or_else(|| AnalysisError::unavailable(DataIssue::NoBarsInRange, params))?;

    if first < VOLUME_WINDOW {
        return Err(AnalysisError::unavailable(
            DataIssue::InsufficientWarmUp {
                available: first,
                required: VOLUME_WINDOW,
            },
            params,
        ));
    }

    let bars = series.bars();
    let features = compute_features(series);
    let mut events = Vec::new();

    for i in first..bars.len() {
        let bar = &bars[i];
        if bar.date > params.end_date {
            break;
        }

        let f = features[i];
        let (Some(volume_ratio), Some(daily_return)) = (f.volume_ratio, f.daily_return) else {
            trace!("{}: no volume baseline or return, skipped", bar.date);
            continue;
        };

        if volume_ratio > params.volume_threshold && daily_return > params.price_threshold {
            let exit = &bars[exit_index(i, params.holding_period, bars.len())];
            let event = BreakoutEvent {
                entry_date: bar.date,
                entry_price: bar.close,
                exit_date: exit.date,
                exit_price: exit.close,
                volume: bar.volume,
                volume_ratio,
                daily_return,
                forward_return: (exit.close - bar.close) / bar.close,
            };
            debug!(
                "Breakout {} ratio={:.2} return={:.4} exit={} forward={:.4}",
                event.entry_date,
                event.volume_ratio,
                event.daily_return,
                event.exit_date,
                event.forward_return
            );
            events.push(event);
        }
    }

    if events.is_empty() {
        info!("No breakout signals found for {}", params.ticker);
        return Ok(AnalysisOutcome::NoSignals {
            params: params.clone(),
        });
    }

    let summary = summarize(params, &events);
    info!(
        "{}: {} signals, mean forward return {:.4}",
        params.ticker, summary.count, summary.mean_forward_return
    );
    Ok(AnalysisOutcome::Signals(AnalysisReport { summary, events }))
}

/// Summary statistics over a non-empty event list
fn summarize(params: &AnalysisParams, events: &[BreakoutEvent]) -> AnalysisSummary {
    let mean_forward_return = events.iter().map(|e| e.forward_return).mean();

    AnalysisSummary {
        ticker: params.ticker.clone(),
        count: events.len(),
        mean_forward_return,
        analysis_period: AnalysisPeriod {
            start: params.start_date,
            end: params.end_date,
        },
        volume_threshold: params.volume_threshold,
        price_threshold: params.price_threshold,
        holding_period: params.holding_period,
    }
}

/// How far back to fetch ahead of the start date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmUpPolicy {
    pub buffer_days: i64,
    pub max_extensions: u32,
}

impl Default for WarmUpPolicy {
    fn default() -> Self {
        Self {
            buffer_days: 40,
            max_extensions: 2,
        }
    }
}

impl From<&DataConfig> for WarmUpPolicy {
    fn from(config: &DataConfig) -> Self {
        Self {
            buffer_days: config.buffer_days.max(1),
            max_extensions: config.max_buffer_extensions,
        }
    }
}

impl WarmUpPolicy {
    /// Fetch start for the given attempt (0 = initial fetch).
    ///
    /// `None` when the buffer reaches past the representable calendar.
    pub fn fetch_start(&self, start: NaiveDate, attempt: u32) -> Option<NaiveDate> {
        let days = self.buffer_days.checked_mul(i64::from(attempt) + 1)?;
        start.checked_sub_signed(Duration::try_days(days)?)
    }
}

/// Fetches bars through a provider and runs [`analyze`] on them
pub struct BreakoutEngine<P> {
    provider: P,
    warm_up: WarmUpPolicy,
}

impl<P: BarProvider> BreakoutEngine<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            warm_up: WarmUpPolicy::default(),
        }
    }

    pub fn with_warm_up(mut self, warm_up: WarmUpPolicy) -> Self {
        self.warm_up = warm_up;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Validate, fetch with warm-up buffer, analyze.
    ///
    /// When the buffer holds fewer than [`VOLUME_WINDOW`] bars it is widened
    /// by another `buffer_days` and refetched, up to `max_extensions` times.
    pub fn run(&self, params: &AnalysisParams) -> Result<AnalysisOutcome, AnalysisError> {
        params
            .validate()
            .map_err(|reason| AnalysisError::invalid(reason, params))?;

        let series = self.fetch_with_warm_up(params)?;
        analyze(params, &series)
    }

    fn fetch_with_warm_up(&self, params: &AnalysisParams) -> Result<BarSeries, AnalysisError> {
        let mut attempt = 0;

        loop {
            let fetch_start = self
                .warm_up
                .fetch_start(params.start_date, attempt)
                .ok_or_else(|| {
                    AnalysisError::unavailable(
                        DataIssue::BufferOutOfRange {
                            buffer_days: self.warm_up.buffer_days,
                            attempt,
                        },
                        params,
                    )
                })?;
            info!(
                "Fetching {} bars for {} from {} to {}",
                self.provider.name(),
                params.ticker,
                fetch_start,
                params.end_date
            );

            let bars = self
                .provider
                .provide_bars(&params.ticker, fetch_start, params.end_date)
                .map_err(|e| AnalysisError::unavailable(e, params))?;

            if bars.is_empty() {
                return Err(AnalysisError::unavailable(DataIssue::Empty, params));
            }

            let series =
                BarSeries::new(bars).map_err(|e| AnalysisError::unavailable(e, params))?;
            let warm_up_bars = series.count_before(params.start_date);

            if warm_up_bars >= VOLUME_WINDOW || attempt >= self.warm_up.max_extensions {
                debug!(
                    "Fetched {} bars ({} warm-up) for {}",
                    series.len(),
                    warm_up_bars,
                    params.ticker
                );
                return Ok(series);
            }

            warn!(
                "Only {} warm-up bars before {} for {}, widening buffer",
                warm_up_bars, params.start_date, params.ticker
            );
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bar;

    fn params(start: NaiveDate, end: NaiveDate) -> AnalysisParams {
        AnalysisParams {
            ticker: "TEST".to_string(),
            start_date: start,
            end_date: end,
            volume_threshold: 2.0,
            price_threshold: 0.02,
            holding_period: 10,
        }
    }

    fn series(closes: &[f64], volumes: &[u64]) -> BarSeries {
        let origin = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&c, &v))| Bar::from_close(origin + Duration::days(i as i64), c, v))
            .collect();
        BarSeries::new(bars).unwrap()
    }

    #[test]
    fn test_features_warm_up_is_undefined() {
        let s = series(&[10.0; 25], &[100; 25]);
        let f = compute_features(&s);

        assert_eq!(f[0].daily_return, None);
        assert_eq!(f[18].ma_volume, None);
        assert_eq!(f[19].ma_volume, Some(100.0));
        assert_eq!(f[19].volume_ratio, Some(1.0));
        assert_eq!(f[1].daily_return, Some(0.0));
    }

    #[test]
    fn test_zero_volume_window_has_no_ratio() {
        let s = series(&[10.0; 21], &[0; 21]);
        let f = compute_features(&s);
        assert_eq!(f[20].ma_volume, Some(0.0));
        assert_eq!(f[20].volume_ratio, None);
    }

    #[test]
    fn test_exit_index_clamps() {
        assert_eq!(exit_index(5, 10, 30), 15);
        assert_eq!(exit_index(25, 10, 30), 29);
        assert_eq!(exit_index(29, 1, 30), 29);
        assert_eq!(exit_index(usize::MAX - 1, 10, 30), 29);
    }

    #[test]
    fn test_insufficient_warm_up_is_reported() {
        let s = series(&[10.0; 40], &[100; 40]);
        let start = s.bars()[10].date;
        let end = s.bars()[39].date;

        let err = analyze(&params(start, end), &s).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DataUnavailable {
                reason: DataIssue::InsufficientWarmUp {
                    available: 10,
                    required: VOLUME_WINDOW
                },
                ..
            }
        ));
    }

    #[test]
    fn test_bars_after_end_only_serve_as_exits() {
        let mut closes = vec![100.0; 30];
        let mut volumes = vec![1000u64; 30];
        // breakout on bar 22 and bar 27; end date is bar 25
        closes[22] = 110.0;
        volumes[22] = 10_000;
        closes[27] = 120.0;
        volumes[27] = 10_000;
        for c in closes.iter_mut().skip(23) {
            if *c == 100.0 {
                *c = 110.0;
            }
        }
        let s = series(&closes, &volumes);
        let mut p = params(s.bars()[20].date, s.bars()[25].date);
        p.holding_period = 5;

        let outcome = analyze(&p, &s).unwrap();
        let events = outcome.events();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entry_date, s.bars()[22].date);
        assert_eq!(events[0].exit_date, s.bars()[27].date);
        assert_eq!(events[0].exit_price, 120.0);
    }

    #[test]
    fn test_warm_up_policy_fetch_start() {
        let policy = WarmUpPolicy::default();
        let start = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();

        assert_eq!(policy.fetch_start(start, 0), NaiveDate::from_ymd_opt(2022, 1, 20));
        assert_eq!(policy.fetch_start(start, 1), NaiveDate::from_ymd_opt(2021, 12, 11));
    }

    #[test]
    fn test_warm_up_policy_oversized_buffer() {
        let config = DataConfig {
            buffer_days: 100_000_000,
            ..DataConfig::default()
        };
        let policy = WarmUpPolicy::from(&config);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert_eq!(policy.fetch_start(start, 0), None);

        let huge = WarmUpPolicy {
            buffer_days: i64::MAX,
            max_extensions: 2,
        };
        assert_eq!(huge.fetch_start(start, 1), None);
    }

    struct NeverCalled;

    impl BarProvider for NeverCalled {
        fn provide_bars(
            &self,
            _ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Bar>, crate::error::ProviderError> {
            panic!("provider must not be reached");
        }

        fn name(&self) -> &str {
            "never"
        }
    }

    #[test]
    fn test_run_reports_buffer_out_of_range() {
        let engine = BreakoutEngine::new(NeverCalled).with_warm_up(WarmUpPolicy {
            buffer_days: 100_000_000,
            max_extensions: 0,
        });
        let p = params(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );

        match engine.run(&p) {
            Err(AnalysisError::DataUnavailable {
                reason: DataIssue::BufferOutOfRange { attempt: 0, .. },
                ..
            }) => {}
            other => panic!("expected BufferOutOfRange, got {:?}", other),
        }
    }
}
