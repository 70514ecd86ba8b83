//! Breakout analyzer - main entry point
//!
//! This binary provides three subcommands:
//! - analyze: Backtest volume/price breakouts for one ticker
//! - scan: Run the same analysis independently over several tickers
//! - download: Save daily bars from Yahoo Finance as CSV

use anyhow::Result;
use breakout_analyzer::config::DataSource;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "breakout-analyzer")]
#[command(about = "Stock breakout strategy analyzer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Parameters shared by `analyze` and `scan`; unset values fall back to the config file
#[derive(clap::Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// End date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub end: Option<String>,

    /// Volume threshold as a multiple of the 20-day average (e.g. 2 for 200%)
    #[arg(long)]
    pub volume_threshold: Option<f64>,

    /// Daily return threshold (e.g. 0.02 for 2%)
    #[arg(long)]
    pub price_threshold: Option<f64>,

    /// Holding period in trading days
    #[arg(long)]
    pub holding_period: Option<usize>,

    /// Data source (yahoo or csv)
    #[arg(long)]
    pub source: Option<DataSource>,

    /// Directory with {TICKER}_1d.csv files for the csv source
    #[arg(long)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze breakouts for a single ticker
    Analyze {
        /// Ticker symbol (e.g. AAPL)
        #[arg(short, long)]
        ticker: Option<String>,

        #[command(flatten)]
        args: AnalysisArgs,

        /// Write the event table as CSV to this path
        #[arg(long)]
        export: Option<PathBuf>,

        /// Print the outcome as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Analyze several tickers independently
    Scan {
        /// Tickers (comma-separated). E.g. "AAPL,MSFT,NVDA"
        #[arg(short, long)]
        tickers: String,

        #[command(flatten)]
        args: AnalysisArgs,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },

    /// Download daily bars from Yahoo Finance
    Download {
        /// Tickers (comma-separated). E.g. "AAPL,MSFT"
        #[arg(short, long)]
        tickers: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = "data")]
        output: String,

        /// Path to configuration file (request timeout, adjusted prices)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{timestamp}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Keep the console clean for the progress bar
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Analyze { .. } => ("analyze", false),
        Commands::Scan { .. } => ("scan", true),
        Commands::Download { .. } => ("download", false),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Analyze {
            ticker,
            args,
            export,
            json,
        } => commands::analyze::run(ticker, args, export, json),

        Commands::Scan {
            tickers,
            args,
            sequential,
        } => commands::scan::run(tickers, args, sequential),

        Commands::Download {
            tickers,
            start,
            end,
            output,
            config,
        } => commands::download::run(tickers, start, end, output, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_console_and_file() {
        setup_logging(false, "test", false).unwrap();
        info!("console and file logging active");
        assert!(PathBuf::from("logs").is_dir());
    }

    #[test]
    fn test_cli_parses_scan() {
        let cli = Cli::try_parse_from([
            "breakout-analyzer",
            "scan",
            "--tickers",
            "AAPL,MSFT",
            "--sequential",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Scan { sequential: true, .. }));
    }

    #[test]
    fn test_cli_download_accepts_config() {
        let cli = Cli::try_parse_from([
            "breakout-analyzer",
            "download",
            "--tickers",
            "AAPL",
            "--start",
            "2024-01-01",
            "--config",
            "configs/breakout.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Download { config, output, .. } => {
                assert_eq!(config.as_deref(), Some("configs/breakout.json"));
                assert_eq!(output, "data");
            }
            other => panic!("expected download, got {:?}", other),
        }
    }
}
