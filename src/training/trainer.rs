use std::fs;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{info, warn};
use ndarray::{Array1, Axis};

use crate::config::{Config, TrainingConfig};
use crate::data::dataset::Dataset;
use crate::data::source::{acquire, DataOrigin, RemoteClient};
use crate::model::forest::Forest;
use crate::model::schema::FeatureSchema;
use crate::model::trained::{model_version, ModelMetadata, TrainedModel};
use crate::training::importance::permutation_importance;
use crate::training::metrics::EvaluationMetrics;
use crate::training::split::train_validation_split;
use crate::utils::io::save_artifacts;
use crate::utils::plot::plot_validation;

pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub schema: FeatureSchema,
    /// Rows dropped because a feature or the target was missing.
    pub skipped_rows: usize,
    pub validation_actual: Vec<f64>,
    pub validation_predicted: Vec<f64>,
}

/// Runs the whole pipeline: acquire, fit, evaluate, persist.
/// Any failure aborts before the artifacts or the local dataset are
/// replaced. A remote snapshot is staged next to the dataset and only
/// renamed over it once both artifacts are saved.
pub async fn run(config: &Config) -> Result<TrainingOutcome> {
    let remote = match &config.remote.source {
        Some(source) => Some(
            RemoteClient::new(source.clone(), config.remote.timeout)
                .context("Failed to build the remote source client")?
                .with_weather(config.remote.weather.clone()),
        ),
        None => None,
    };

    let acquired = acquire(remote.as_ref(), &config.paths.dataset, &config.training.target)
        .await
        .with_context(|| {
            format!(
                "No training data available from the remote source or {}",
                config.paths.dataset.display()
            )
        })?;
    info!(
        "Training on {} rows ({:?})",
        acquired.dataset.len(),
        acquired.origin
    );

    let outcome = fit_dataset(&acquired.dataset, &config.training, acquired.origin)?;

    let staged = match acquired.origin {
        DataOrigin::Remote => Some(
            acquired
                .dataset
                .stage_csv(&config.paths.dataset)
                .context("Failed to stage the remote dataset snapshot")?,
        ),
        DataOrigin::LocalFallback => None,
    };

    if let Err(e) = save_artifacts(
        &config.paths.model,
        &config.paths.feature_columns,
        &outcome.model,
        &outcome.schema,
    ) {
        if let Some(tmp) = &staged {
            if let Err(cleanup) = fs::remove_file(tmp) {
                warn!("Could not remove staged snapshot {}: {cleanup}", tmp.display());
            }
        }
        return Err(e).context("Failed to persist model artifacts");
    }
    info!(
        "Saved model to {} and feature order to {}",
        config.paths.model.display(),
        config.paths.feature_columns.display()
    );

    if let Some(tmp) = staged {
        fs::rename(&tmp, &config.paths.dataset).with_context(|| {
            format!(
                "Failed to replace {} with the remote snapshot",
                config.paths.dataset.display()
            )
        })?;
        info!(
            "Local dataset snapshot refreshed at {}",
            config.paths.dataset.display()
        );
    }

    if let Some(path) = &config.training.validation_plot {
        plot_validation(&outcome.validation_actual, &outcome.validation_predicted, path)
            .map_err(|e| anyhow::anyhow!("Failed to draw validation plot: {e}"))?;
        info!("Validation plot written to {}", path.display());
    }

    Ok(outcome)
}

/// Feature selection: the configured list, or every non-target column.
pub fn select_features(dataset: &Dataset, settings: &TrainingConfig) -> Result<FeatureSchema> {
    let names = match &settings.features {
        Some(names) => names.clone(),
        None => dataset.feature_columns(&settings.target),
    };
    if names.iter().any(|n| n == &settings.target) {
        bail!("The target `{}` cannot also be a feature", settings.target);
    }
    FeatureSchema::new(names).context("Invalid feature selection")
}

/// Fits and evaluates a forest on an in-memory dataset. No I/O.
pub fn fit_dataset(
    dataset: &Dataset,
    settings: &TrainingConfig,
    origin: DataOrigin,
) -> Result<TrainingOutcome> {
    let schema = select_features(dataset, settings)?;
    let (x, y, skipped_rows) = dataset
        .to_training_matrix(&schema, &settings.target)
        .context("Failed to build the training matrix")?;
    if skipped_rows > 0 {
        warn!("Dropped {skipped_rows} rows with missing values");
    }

    let (train_idx, val_idx) =
        match train_validation_split(x.nrows(), settings.test_fraction, settings.forest.seed) {
            Some(split) => split,
            None => bail!("Need at least 2 complete rows to train, found {}", x.nrows()),
        };

    let x_train = x.select(Axis(0), &train_idx);
    let y_train = y.select(Axis(0), &train_idx);
    let x_val = x.select(Axis(0), &val_idx);
    let y_val = y.select(Axis(0), &val_idx);

    info!(
        "Fitting {} forest with {} trees on {} rows x {} features",
        settings.task,
        settings.forest.n_trees,
        x_train.nrows(),
        schema.len()
    );
    let forest = Forest::fit(settings.task, &x_train, &y_train, &settings.forest)?;

    let predicted = Array1::from(forest.predict(x_val.view())?);
    let metrics = EvaluationMetrics::evaluate(settings.task, &y_val, &predicted);
    info!(
        "Validation MAE: {:.4}, RMSE: {:.4}, R2: {:.4}",
        metrics.mae, metrics.rmse, metrics.r2
    );
    if let Some(accuracy) = metrics.accuracy {
        info!("Validation accuracy: {:.2}%", accuracy * 100.0);
    }

    let importances =
        permutation_importance(&forest, &x_val, &y_val, schema.names(), settings.forest.seed)?;

    let trained_at = Utc::now();
    let metadata = ModelMetadata {
        version: model_version(&trained_at),
        trained_at,
        task: settings.task,
        target: settings.target.clone(),
        origin,
        train_rows: x_train.nrows(),
        validation_rows: x_val.nrows(),
        metrics,
        importances,
    };

    Ok(TrainingOutcome {
        model: TrainedModel {
            forest,
            feature_names: schema.names().to_vec(),
            metadata,
        },
        schema,
        skipped_rows,
        validation_actual: y_val.to_vec(),
        validation_predicted: predicted.to_vec(),
    })
}
