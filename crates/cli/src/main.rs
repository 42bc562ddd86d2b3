//! TAMS Risk Prediction - Main Entry Point

use anyhow::Context;
use clap::Parser;
use inference_engine::PredictionEngine;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tams_cli::{init_logging, parse_input, score_reports, Settings};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tams-predict")]
#[command(author = "TAMS Team")]
#[command(version)]
#[command(about = "Score anomaly reports for reliability, availability and process-safety risk", long_about = None)]
struct Args {
    /// Settings file (TOML, JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model artifact, overriding the configured path
    #[arg(short, long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// JSON array of anomaly reports; stdin when omitted
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Include the scoring path and fallback reason for each report
    #[arg(long)]
    detailed: bool,

    /// Print the engine status and exit
    #[arg(long)]
    status: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(model) = args.model {
        settings.engine.model_path = model;
    }
    init_logging(&settings.log_level)?;

    info!("=== TAMS Prediction Engine v{} ===", env!("CARGO_PKG_VERSION"));
    let engine = PredictionEngine::from_config(&settings.engine);

    let mut stdout = io::stdout().lock();
    if args.status {
        serde_json::to_writer_pretty(&mut stdout, &engine.status())?;
        writeln!(stdout)?;
        return Ok(());
    }

    let text = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).context("Failed to read stdin")?;
            text
        }
    };
    let raws = parse_input(&text)?;

    let report = score_reports(&engine, &raws, args.detailed);
    for rejected in &report.rejected {
        eprintln!("row {}: {}", rejected.row, rejected.error);
    }

    serde_json::to_writer_pretty(&mut stdout, &report.scored)?;
    writeln!(stdout)?;
    Ok(())
}
