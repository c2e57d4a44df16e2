use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    Regression,
    Classification,
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regression" | "regressor" => Ok(Task::Regression),
            "classification" | "classifier" => Ok(Task::Classification),
            other => Err(format!(
                "unknown task `{other}` (expected regression or classification)"
            )),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Regression => write!(f, "regression"),
            Task::Classification => write!(f, "classification"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: u16,
    pub max_depth: Option<u16>,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

type Regressor = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Classifier = RandomForestClassifier<f64, i64, DenseMatrix<f64>, Vec<i64>>;

/// A fitted random forest. Classification targets are rounded to integer
/// classes; predictions are always returned as `f64`.
#[derive(Serialize, Deserialize)]
pub enum Forest {
    Regressor(Regressor),
    Classifier(Classifier),
}

impl fmt::Debug for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Forest({})", self.task())
    }
}

impl Forest {
    pub fn fit(
        task: Task,
        x: &Array2<f64>,
        y: &Array1<f64>,
        params: &ForestParams,
    ) -> Result<Self, ModelError> {
        if x.nrows() != y.len() || x.nrows() == 0 || x.ncols() == 0 {
            return Err(ModelError::Fit(format!(
                "cannot fit on {} rows x {} columns with {} targets",
                x.nrows(),
                x.ncols(),
                y.len()
            )));
        }
        let matrix = to_dense(x.view());
        let n_features = x.ncols();

        match task {
            Task::Regression => {
                // every feature is a split candidate, as in the usual regressor default
                let mut parameters = RandomForestRegressorParameters::default()
                    .with_n_trees(usize::from(params.n_trees))
                    .with_m(n_features)
                    .with_min_samples_leaf(params.min_samples_leaf)
                    .with_min_samples_split(params.min_samples_split)
                    .with_seed(params.seed);
                if let Some(depth) = params.max_depth {
                    parameters = parameters.with_max_depth(depth);
                }
                let targets = y.to_vec();
                Regressor::fit(&matrix, &targets, parameters)
                    .map(Forest::Regressor)
                    .map_err(|e| ModelError::Fit(e.to_string()))
            }
            Task::Classification => {
                let m = ((n_features as f64).sqrt().floor() as usize).max(1);
                let mut parameters = RandomForestClassifierParameters::default()
                    .with_n_trees(params.n_trees)
                    .with_m(m)
                    .with_min_samples_leaf(params.min_samples_leaf)
                    .with_min_samples_split(params.min_samples_split)
                    .with_seed(params.seed);
                if let Some(depth) = params.max_depth {
                    parameters = parameters.with_max_depth(depth);
                }
                let labels: Vec<i64> = y.iter().map(|v| v.round() as i64).collect();
                Classifier::fit(&matrix, &labels, parameters)
                    .map(Forest::Classifier)
                    .map_err(|e| ModelError::Fit(e.to_string()))
            }
        }
    }

    pub fn task(&self) -> Task {
        match self {
            Forest::Regressor(_) => Task::Regression,
            Forest::Classifier(_) => Task::Classification,
        }
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, ModelError> {
        if x.nrows() == 0 {
            return Ok(Vec::new());
        }
        let matrix = to_dense(x);
        match self {
            Forest::Regressor(model) => model
                .predict(&matrix)
                .map_err(|e| ModelError::Predict(e.to_string())),
            Forest::Classifier(model) => model
                .predict(&matrix)
                .map(|labels| labels.into_iter().map(|l| l as f64).collect())
                .map_err(|e| ModelError::Predict(e.to_string())),
        }
    }

    pub fn predict_one(&self, values: &[f64]) -> Result<f64, ModelError> {
        let row = ArrayView2::from_shape((1, values.len()), values)
            .map_err(|e| ModelError::Predict(e.to_string()))?;
        self.predict(row)?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Predict("model returned no prediction".to_string()))
    }
}

fn to_dense(x: ArrayView2<'_, f64>) -> DenseMatrix<f64> {
    let rows: Vec<Vec<f64>> = x.outer_iter().map(|row| row.to_vec()).collect();
    DenseMatrix::from_2d_vec(&rows)
}
