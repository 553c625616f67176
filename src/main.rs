mod error;
mod config;
mod data;
mod source;
mod features;
mod labels;
mod splits;
mod ml;
mod report;
mod pipeline;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{load_config, to_toml_string, EvalConfig, Provider};

#[derive(Parser)]
#[command(name = "walkforward-baselines")]
#[command(version = "0.1.0")]
#[command(about = "Walk-forward cross-validation of ridge and logistic baselines on daily equity prices", long_about = None)]
struct Cli {
    /// Configuration file path (optional)
    #[arg(short, long, default_value = "walkforward.toml")]
    config: PathBuf,

    /// Read prices from a CSV export instead of downloading them
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Directory for the score table
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Comma-separated ticker list
    #[arg(short, long, value_delimiter = ',')]
    tickers: Option<Vec<String>>,

    /// First date to download (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date to download (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Score raw logistic probabilities without sigmoid calibration
    #[arg(long)]
    no_calibration: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut EvalConfig) {
        if let Some(path) = &self.csv {
            config.universe.provider = Provider::Csv;
            config.universe.csv_path = Some(path.clone());
        }
        if let Some(dir) = &self.output {
            config.output.dir = dir.clone();
        }
        if let Some(tickers) = &self.tickers {
            config.universe.tickers = tickers
                .iter()
                .map(|t| t.trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Some(start) = self.start {
            config.universe.start = start;
        }
        if self.end.is_some() {
            config.universe.end = self.end;
        }
        if self.no_calibration {
            config.models.calibrate = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Walk-forward baselines v0.1.0");

    let mut config = load_config(&cli.config)?;
    cli.apply(&mut config);
    config
        .validate()
        .map_err(|errors| anyhow!("Invalid configuration: {}", errors.join(", ")))?;

    if cli.print_config {
        println!("{}", to_toml_string(&config)?);
        return Ok(());
    }

    info!(
        "Universe: {} | horizon {} | {} splits, min {} training days",
        config.universe.tickers.join(", "),
        config.labels.horizon,
        config.splits.n_splits,
        config.splits.min_train_days
    );

    let table = pipeline::run(&config).await?;
    table.print_summary();
    info!("Scores saved to {}", config.output.path().display());

    Ok(())
}
