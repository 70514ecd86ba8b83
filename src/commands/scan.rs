//! Scan command - independent breakout analyses over several tickers

use anyhow::Result;
use breakout_analyzer::config::Config;
use breakout_analyzer::report::format_percent;
use breakout_analyzer::{AnalysisError, AnalysisOutcome, BarProvider, BreakoutEngine};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressIterator, ProgressStyle};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use super::{build_engine, load_config, params_for, split_tickers};
use crate::AnalysisArgs;

pub fn run(tickers: String, args: AnalysisArgs, sequential: bool) -> Result<()> {
    let config = load_config(&args)?;
    let tickers = split_tickers(&tickers);
    if tickers.is_empty() {
        anyhow::bail!("No tickers given");
    }

    let engine = build_engine(&config)?;
    let template = params_for(&config, &tickers[0]);

    println!("\n{}", "=".repeat(70));
    println!("BREAKOUT SCAN");
    println!("{}", "=".repeat(70));
    println!("  Tickers:          {}", tickers.len());
    println!("  Analysis Period:  {} to {}", template.start_date, template.end_date);
    println!("  Volume Threshold: {}", format_percent(template.volume_threshold));
    println!("  Price Threshold:  {}", format_percent(template.price_threshold));
    println!("  Holding Period:   {} days", template.holding_period);
    println!("  Mode:             {}", if sequential { "sequential" } else { "parallel" });
    println!("{}\n", "=".repeat(70));

    let pb = ProgressBar::new(tickers.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}] {msg}")?
            .progress_chars("█░ "),
    );

    let results = scan_tickers(&engine, &config, &tickers, sequential, &pb);
    let with_signals = results
        .iter()
        .filter(|(_, outcome)| matches!(outcome, Ok(AnalysisOutcome::Signals(_))))
        .count();
    pb.finish_with_message(format!("{} with signals", with_signals));
    println!();

    println!("{}", "=".repeat(70));
    println!("{:<10} {:>8} {:>12}  {}", "Ticker", "Signals", "Avg Fwd", "Status");
    println!("{}", "-".repeat(70));
    for (ticker, outcome) in &results {
        match outcome {
            Ok(AnalysisOutcome::Signals(report)) => println!(
                "{:<10} {:>8} {:>12}  ok",
                ticker,
                report.summary.count,
                format_percent(report.summary.mean_forward_return)
            ),
            Ok(AnalysisOutcome::NoSignals { .. }) => {
                println!("{:<10} {:>8} {:>12}  no signals", ticker, 0, "-")
            }
            Err(e) => println!("{:<10} {:>8} {:>12}  {}", ticker, "-", "-", e.kind()),
        }
    }
    println!("{}", "=".repeat(70));

    info!("Scan completed for {} tickers", results.len());
    Ok(())
}

type ScanResult = (String, Result<AnalysisOutcome, AnalysisError>);

/// Run every ticker independently, advancing `pb` once per ticker.
/// Results keep the input order in both modes.
fn scan_tickers<P: BarProvider>(
    engine: &BreakoutEngine<P>,
    config: &Config,
    tickers: &[String],
    sequential: bool,
    pb: &ProgressBar,
) -> Vec<ScanResult> {
    let with_signals = AtomicUsize::new(0);

    let analyze_one = |ticker: &String| -> ScanResult {
        let params = params_for(config, ticker);
        let outcome = engine.run(&params);
        if let Err(e) = &outcome {
            warn!("{}: {}", ticker, e);
        }
        if matches!(outcome, Ok(AnalysisOutcome::Signals(_))) {
            let count = with_signals.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!("{} with signals", count));
        }
        (ticker.clone(), outcome)
    };

    if sequential {
        tickers
            .iter()
            .progress_with(pb.clone())
            .map(analyze_one)
            .collect()
    } else {
        tickers
            .par_iter()
            .progress_with(pb.clone())
            .map(analyze_one)
            .collect()
    }
}
