use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ArtifactError;
use crate::model::schema::FeatureSchema;
use crate::model::trained::TrainedModel;

/// Writes the model and feature-order artifacts as a pair. Both are staged
/// in temp files first, so a failed write leaves the previous pair intact.
pub fn save_artifacts(
    model_path: &Path,
    schema_path: &Path,
    model: &TrainedModel,
    schema: &FeatureSchema,
) -> Result<(), ArtifactError> {
    if model.feature_names.as_slice() != schema.names() {
        return Err(ArtifactError::Incompatible {
            model: model.feature_names.clone(),
            schema: schema.names().to_vec(),
        });
    }

    let model_data = bincode::serialize(model)?;
    let schema_data = serde_json::to_vec_pretty(schema).map_err(|source| ArtifactError::Schema {
        path: schema_path.to_path_buf(),
        source,
    })?;

    let model_tmp = staging_path(model_path);
    let schema_tmp = staging_path(schema_path);
    let written = fs::write(&model_tmp, model_data)
        .and_then(|()| fs::write(&schema_tmp, schema_data))
        .and_then(|()| fs::rename(&model_tmp, model_path))
        .and_then(|()| fs::rename(&schema_tmp, schema_path));
    if let Err(e) = written {
        // leftovers from a failed write; either may already be gone
        let _ = fs::remove_file(&model_tmp);
        let _ = fs::remove_file(&schema_tmp);
        return Err(e.into());
    }
    Ok(())
}

pub fn load_model(path: &Path) -> Result<TrainedModel, ArtifactError> {
    let model_data = read_artifact(path)?;
    bincode::deserialize(&model_data).map_err(|source| ArtifactError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_schema(path: &Path) -> Result<FeatureSchema, ArtifactError> {
    let schema_data = read_artifact(path)?;
    serde_json::from_slice(&schema_data).map_err(|source| ArtifactError::Schema {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads both artifacts and checks that they belong together.
pub fn load_artifacts(
    model_path: &Path,
    schema_path: &Path,
) -> Result<(TrainedModel, FeatureSchema), ArtifactError> {
    let model = load_model(model_path)?;
    let schema = load_schema(schema_path)?;
    if model.feature_names.as_slice() != schema.names() {
        return Err(ArtifactError::Incompatible {
            model: model.feature_names,
            schema: schema.names().to_vec(),
        });
    }
    Ok((model, schema))
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }
    Ok(fs::read(path)?)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
