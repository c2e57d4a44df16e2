use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::Paths;
use crate::data::dataset::{Dataset, RowView};
use crate::data::features::{engineer, FeatureVector, HISTORY};
use crate::data::observation::RawObservation;
use crate::error::{ArtifactError, DatasetError, FeatureError, PredictError};
use crate::model::schema::FeatureSchema;
use crate::model::trained::{ModelMetadata, TrainedModel};
use crate::utils::io::load_artifacts;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: f64,
    pub model_version: String,
    pub trained_at: DateTime<Utc>,
    /// Dataset row the prediction was made for, when it came from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Read-only pairing of a trained model and its feature order, plus the
/// dataset used by `predict_latest`.
#[derive(Debug)]
pub struct Predictor {
    model: TrainedModel,
    schema: FeatureSchema,
    dataset_path: PathBuf,
}

impl Predictor {
    pub fn new(
        model: TrainedModel,
        schema: FeatureSchema,
        dataset_path: impl Into<PathBuf>,
    ) -> Result<Self, ArtifactError> {
        if model.feature_names.as_slice() != schema.names() {
            return Err(ArtifactError::Incompatible {
                model: model.feature_names,
                schema: schema.names().to_vec(),
            });
        }
        Ok(Predictor {
            model,
            schema,
            dataset_path: dataset_path.into(),
        })
    }

    pub fn load(paths: &Paths) -> Result<Self, ArtifactError> {
        let (model, schema) = load_artifacts(&paths.model, &paths.feature_columns)?;
        info!(
            "Loaded {} model {} with {} features",
            model.metadata.task,
            model.metadata.version,
            schema.len()
        );
        Predictor::new(model, schema, &paths.dataset)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.model.metadata
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    /// Unordered mapping; the key set must equal the trained feature set.
    pub fn predict(&self, features: &BTreeMap<String, f64>) -> Result<PredictionResult, PredictError> {
        let values = self.schema.order_map(features)?;
        self.infer(&values)
    }

    /// Ordered vector; names must match the trained order exactly.
    pub fn predict_vector(&self, features: &FeatureVector) -> Result<PredictionResult, PredictError> {
        let values = self.schema.order_vector(features)?;
        self.infer(&values)
    }

    pub fn predict_row(&self, row: &RowView<'_>) -> Result<PredictionResult, PredictError> {
        let values = self.schema.project_row(row)?;
        let mut result = self.infer(&values)?;
        result.index = Some(row.index());
        result.timestamp = row.timestamp().map(str::to_string);
        Ok(result)
    }

    /// Re-reads the local dataset and predicts for its newest row.
    pub fn predict_latest(&self) -> Result<PredictionResult, PredictError> {
        let dataset = Dataset::read_csv(&self.dataset_path)?;
        let latest = dataset
            .last()
            .ok_or_else(|| DatasetError::Empty(self.dataset_path.clone()))?;
        self.predict_row(&latest)
    }

    /// Engineers features from raw history and predicts for the newest
    /// engineered row.
    pub fn predict_raw(&self, observations: &[RawObservation]) -> Result<PredictionResult, PredictError> {
        let rows = engineer(observations)?;
        let latest = rows.last().ok_or(FeatureError::InsufficientHistory {
            needed: HISTORY + 1,
            got: observations.len(),
        })?;

        let values = self.schema.order_map(&select(&latest.features, &self.schema))?;
        let mut result = self.infer(&values)?;
        result.timestamp = Some(latest.timestamp.to_rfc3339());
        Ok(result)
    }

    fn infer(&self, values: &[f64]) -> Result<PredictionResult, PredictError> {
        let prediction = self.model.forest.predict_one(values)?;
        if !prediction.is_finite() {
            return Err(PredictError::NonFinite);
        }
        Ok(PredictionResult {
            prediction,
            model_version: self.model.metadata.version.clone(),
            trained_at: self.model.metadata.trained_at,
            index: None,
            timestamp: None,
        })
    }
}

/// Engineered rows carry every canonical feature; keep only those the model
/// was trained on, leaving absent ones absent so validation reports them.
fn select(features: &FeatureVector, schema: &FeatureSchema) -> BTreeMap<String, f64> {
    schema
        .names()
        .iter()
        .filter_map(|name| features.get(name).map(|v| (name.clone(), v)))
        .collect()
}
