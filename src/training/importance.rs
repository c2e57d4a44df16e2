use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::forest::{Forest, Task};
use crate::training::metrics::{accuracy, mean_absolute_error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Permutation importance: how much the validation error grows when one
/// column is shuffled. Error is MAE for regression and `1 - accuracy` for
/// classification. Sorted most important first.
pub fn permutation_importance(
    forest: &Forest,
    x: &Array2<f64>,
    y: &Array1<f64>,
    names: &[String],
    seed: u64,
) -> Result<Vec<FeatureImportance>, ModelError> {
    if names.len() != x.ncols() {
        return Err(ModelError::Shape {
            expected: x.ncols(),
            got: names.len(),
        });
    }

    let score = |predictions: Vec<f64>| {
        let predictions = Array1::from(predictions);
        match forest.task() {
            Task::Regression => mean_absolute_error(y, &predictions),
            Task::Classification => 1.0 - accuracy(y, &predictions),
        }
    };
    let baseline = score(forest.predict(x.view())?);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut importances = Vec::with_capacity(names.len());
    for (j, name) in names.iter().enumerate() {
        let mut column = x.column(j).to_vec();
        column.shuffle(&mut rng);

        let mut permuted = x.clone();
        permuted
            .index_axis_mut(Axis(1), j)
            .assign(&Array1::from(column));

        importances.push(FeatureImportance {
            feature: name.clone(),
            importance: score(forest.predict(permuted.view())?) - baseline,
        });
    }

    importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(importances)
}
