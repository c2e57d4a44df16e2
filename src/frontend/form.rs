use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::inference::api::PredictRequest;
use crate::inference::predictor::{PredictionResult, Predictor};
use crate::utils::input::get_input;

/// Where the form sends its input.
pub enum Backend {
    /// A running prediction service.
    Service { client: Client, base_url: String },
    /// Artifacts loaded in-process.
    Local(Predictor),
}

#[derive(Debug, Deserialize)]
struct SchemaBody {
    features: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl Backend {
    pub fn service(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Backend::Service {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn feature_names(&self) -> Result<Vec<String>> {
        match self {
            Backend::Local(predictor) => Ok(predictor.schema().names().to_vec()),
            Backend::Service { client, base_url } => {
                let response = client
                    .get(format!("{base_url}/schema"))
                    .send()
                    .await
                    .with_context(|| format!("Prediction service at {base_url} is unreachable"))?;
                if !response.status().is_success() {
                    bail!("GET /schema answered {}", response.status());
                }
                let body: SchemaBody = response.json().await.context("Malformed /schema response")?;
                Ok(body.features)
            }
        }
    }

    pub async fn predict(&self, features: &BTreeMap<String, f64>) -> Result<PredictionResult> {
        match self {
            Backend::Local(predictor) => Ok(predictor.predict(features)?),
            Backend::Service { client, base_url } => {
                let request = PredictRequest {
                    features: features
                        .iter()
                        .map(|(name, value)| (name.clone(), Value::from(*value)))
                        .collect(),
                };
                let response = client
                    .post(format!("{base_url}/predict"))
                    .json(&request)
                    .send()
                    .await
                    .with_context(|| format!("Prediction service at {base_url} is unreachable"))?;
                let status = response.status();
                if !status.is_success() {
                    let message = response
                        .json::<ErrorBody>()
                        .await
                        .map(|b| b.error)
                        .unwrap_or_else(|_| status.to_string());
                    bail!("Prediction rejected ({status}): {message}");
                }
                Ok(response.json().await.context("Malformed /predict response")?)
            }
        }
    }
}

/// Asks for every feature in trained order and submits the result.
/// Returns `None` when input ends before the form is complete.
pub async fn run_form<R: BufRead, W: Write>(
    backend: &Backend,
    defaults: &BTreeMap<String, f64>,
    input: &mut R,
    output: &mut W,
) -> Result<Option<PredictionResult>> {
    let names = backend.feature_names().await?;
    writeln!(output, "Enter {} feature values (blank keeps the default):", names.len())?;

    let mut features = BTreeMap::new();
    for name in names {
        match get_input(input, output, &name, defaults.get(&name).copied())? {
            Some(value) => {
                features.insert(name, value);
            }
            None => return Ok(None),
        }
    }

    let result = backend.predict(&features).await?;
    writeln!(output, "\nPredicted AQI: {:.2}", result.prediction)?;
    writeln!(output, "Model version: {}", result.model_version)?;
    Ok(Some(result))
}
