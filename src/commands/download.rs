//! Download command - fetch daily bars from Yahoo Finance into CSV files

use anyhow::{Context, Result};
use breakout_analyzer::config::Config;
use breakout_analyzer::data::{data_file_name, save_csv, BarProvider};
use breakout_analyzer::yahoo::YahooBarProvider;
use std::path::PathBuf;
use tracing::{info, warn};

use super::{parse_date, split_tickers, today};

pub fn run(
    tickers: String,
    start: String,
    end: Option<String>,
    output: String,
    config: Option<String>,
) -> Result<()> {
    info!("Starting data download from Yahoo Finance");

    let config = Config::load(config.as_deref())?;

    let start = parse_date(&start)?;
    let end = match end {
        Some(e) => parse_date(&e)?,
        None => today(),
    };
    if start >= end {
        anyhow::bail!("Start date {} must be before end date {}", start, end);
    }

    let symbols = split_tickers(&tickers);
    std::fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create output directory {}", output))?;

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOADING DAILY BARS FROM YAHOO");
    println!("{}", "=".repeat(60));
    println!("  Tickers: {:?}", symbols);
    println!("  Range:   {} to {}", start, end);
    println!("  Output:  {}", output);
    println!(
        "  Prices:  {}",
        if config.data.adjusted { "adjusted" } else { "raw" }
    );
    println!("{}\n", "=".repeat(60));

    let provider =
        YahooBarProvider::from_config(&config.data).context("Failed to build HTTP client")?;
    let mut success_count = 0;
    let mut total_bars = 0;

    for symbol in &symbols {
        print!("  Downloading {}... ", symbol);
        match provider.provide_bars(symbol, start, end) {
            Ok(bars) if bars.is_empty() => {
                warn!("No bars returned for {}", symbol);
                println!("✗ no data");
            }
            Ok(bars) => {
                let path = PathBuf::from(&output).join(data_file_name(symbol));
                match save_csv(&bars, &path) {
                    Ok(()) => {
                        total_bars += bars.len();
                        success_count += 1;
                        println!("✓ {} bars", bars.len());
                    }
                    Err(e) => println!("✗ Error: {}", e),
                }
            }
            Err(e) => {
                warn!("Download failed for {}: {}", symbol, e);
                println!("✗ Error: {}", e);
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOAD COMPLETE");
    println!("{}", "=".repeat(60));
    println!("  Successful: {}/{}", success_count, symbols.len());
    println!("  Total bars: {}", total_bars);
    println!("{}", "=".repeat(60));

    Ok(())
}
