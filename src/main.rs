use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use aqi_predictor::training::trainer;
use aqi_predictor::{init_logging, Config};

/// Train the AQI model and write the model and feature-order artifacts.
#[derive(Parser, Debug)]
#[command(name = "aqi-train", version, about)]
struct Args {
    /// Skip the remote source and train on the local dataset only.
    #[arg(long)]
    offline: bool,

    /// Also draw a predicted-vs-actual chart of the validation split.
    #[arg(long, value_name = "PNG")]
    validation_plot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if args.offline {
        config.remote.source = None;
    }
    if args.validation_plot.is_some() {
        config.training.validation_plot = args.validation_plot;
    }

    let outcome = trainer::run(&config).await?;

    let meta = &outcome.model.metadata;
    info!(
        "Model {} trained on {} features ({} train / {} validation rows)",
        meta.version,
        outcome.schema.len(),
        meta.train_rows,
        meta.validation_rows
    );
    println!("MAE: {:.4}", meta.metrics.mae);
    Ok(())
}
