use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::source::DataOrigin;
use crate::model::forest::{Forest, Task};
use crate::training::importance::FeatureImportance;
use crate::training::metrics::EvaluationMetrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub task: Task,
    pub target: String,
    pub origin: DataOrigin,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub metrics: EvaluationMetrics,
    /// Sorted most important first.
    pub importances: Vec<FeatureImportance>,
}

/// The model artifact. `feature_names` repeats the feature-order artifact
/// so a mismatched pair can be detected when both are loaded.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    pub forest: Forest,
    pub feature_names: Vec<String>,
    pub metadata: ModelMetadata,
}

pub fn model_version(trained_at: &DateTime<Utc>) -> String {
    trained_at.format("%Y%m%dT%H%M%SZ").to_string()
}
