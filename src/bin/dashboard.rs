use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use aqi_predictor::frontend::dashboard::{render, DashboardOptions};
use aqi_predictor::{init_logging, Config, Dataset, Predictor};

/// Terminal dashboard over the saved model and local dataset.
#[derive(Parser, Debug)]
#[command(name = "aqi-dashboard", version, about)]
struct Args {
    /// Also predict this row (0-based).
    #[arg(long)]
    row: Option<usize>,

    /// Number of recent rows to show.
    #[arg(long, default_value_t = 10)]
    recent: usize,

    /// Write a time-series chart to this PNG.
    #[arg(long, value_name = "PNG")]
    plot: Option<PathBuf>,

    /// Columns to chart (comma separated); defaults to pm2_5, pm10 and the target.
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Chart at most this many trailing rows.
    #[arg(long, default_value_t = 500)]
    plot_rows: usize,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let config = Config::from_env().context("Invalid configuration")?;

    let predictor = Predictor::load(&config.paths)
        .context("Missing artifacts; run aqi-train first")?;
    let dataset = Dataset::read_csv(&config.paths.dataset)
        .with_context(|| format!("Failed to read {}", config.paths.dataset.display()))?;

    let options = DashboardOptions {
        row: args.row,
        recent_rows: args.recent,
        plot_columns: args.columns,
        plot_path: args.plot,
        plot_rows: args.plot_rows,
    };
    let stdout = std::io::stdout();
    render(&predictor, &dataset, &options, &mut stdout.lock())
}
