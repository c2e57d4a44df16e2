use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;

use aqi_predictor::frontend::form::{run_form, Backend};
use aqi_predictor::{init_logging, Config, Dataset, Predictor};

/// Form-style frontend: enter feature values, get a predicted AQI.
#[derive(Parser, Debug)]
#[command(name = "aqi-form", version, about)]
struct Args {
    /// Base URL of a running aqi-serve.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    url: String,

    /// Load the artifacts directly instead of calling the service.
    #[arg(long)]
    local: bool,

    /// HTTP timeout in seconds.
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let config = Config::from_env().context("Invalid configuration")?;

    let backend = if args.local {
        Backend::Local(Predictor::load(&config.paths).context("Failed to load model artifacts")?)
    } else {
        Backend::service(&args.url, Duration::from_secs(args.timeout))?
    };

    // Latest local row supplies the defaults when the dataset is present.
    let defaults = match Dataset::read_csv(&config.paths.dataset) {
        Ok(dataset) => latest_values(&dataset),
        Err(e) => {
            warn!("No defaults available: {e}");
            BTreeMap::new()
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    if run_form(&backend, &defaults, &mut stdin.lock(), &mut stdout).await?.is_none() {
        writeln!(stdout, "\nInput ended before the form was complete")?;
    }
    Ok(())
}

fn latest_values(dataset: &Dataset) -> BTreeMap<String, f64> {
    let Some(row) = dataset.last() else {
        return BTreeMap::new();
    };
    dataset
        .columns()
        .iter()
        .filter_map(|c| row.get(c).map(|v| (c.clone(), v)))
        .collect()
}
