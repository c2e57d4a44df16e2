use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use aqi_predictor::inference::api;
use aqi_predictor::{init_logging, Config, Predictor};

/// Serve AQI predictions over HTTP.
#[derive(Parser, Debug)]
#[command(name = "aqi-serve", version, about)]
struct Args {
    /// Address to bind; defaults to AQI_HOST:AQI_PORT.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let config = Config::from_env().context("Invalid configuration")?;

    // Artifacts are loaded once; a missing or mismatched pair is fatal.
    let predictor = Predictor::load(&config.paths).context("Failed to load model artifacts")?;

    api::serve(Arc::new(predictor), args.bind.unwrap_or(config.bind))
        .await
        .context("Failed to start the prediction service")
}
