//! Analyze command implementation

use anyhow::Result;
use breakout_analyzer::report;
use breakout_analyzer::AnalysisOutcome;
use std::path::PathBuf;
use tracing::{error, info};

use super::{build_engine, load_config, params_for};
use crate::AnalysisArgs;

pub fn run(
    ticker: Option<String>,
    args: AnalysisArgs,
    export: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    info!("Starting breakout analysis");

    let config = load_config(&args)?;
    let ticker = ticker.unwrap_or_else(|| config.analysis.ticker.clone());
    let params = params_for(&config, &ticker);
    info!("Parameters: {}", params);

    let engine = build_engine(&config)?;
    let outcome = match engine.run(&params) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    if json {
        println!("{}", report::to_json(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    let export_path = export.or_else(|| {
        config
            .output
            .export_csv
            .then(|| PathBuf::from(&config.output.results_dir).join(report::EXPORT_FILE_NAME))
    });

    if let (Some(path), Some(result)) = (export_path, outcome.report()) {
        report::export_csv(&result.events, &path)?;
        info!("Exported {} events to {}", result.events.len(), path.display());
        if !json {
            println!("Report saved to {}", path.display());
        }
    }

    info!("Analysis completed");
    Ok(())
}

fn print_outcome(outcome: &AnalysisOutcome) {
    match outcome {
        AnalysisOutcome::Signals(result) => {
            println!("\n{}", "=".repeat(87));
            println!("BREAKOUT ANALYSIS RESULTS");
            println!("{}", "=".repeat(87));
            print!("{}", report::render_summary(&result.summary));
            println!("{}", "=".repeat(87));
            print!("{}", report::render_table(&result.events));
            println!("{}", "=".repeat(87));
        }
        AnalysisOutcome::NoSignals { params } => {
            println!();
            print!("{}", report::render_no_signals(params));
        }
    }
}
