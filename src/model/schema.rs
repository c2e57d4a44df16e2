use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::data::dataset::RowView;
use crate::data::features::FeatureVector;
use crate::error::{SchemaError, ValidationError};

/// The feature-order artifact: the exact names, in order, a model was
/// trained on. Serialized as a bare JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = SchemaError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        FeatureSchema::new(names)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.names
    }
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::Duplicate(name.clone()));
            }
        }
        Ok(FeatureSchema { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Checks an unordered mapping: the key set must equal the schema.
    /// Returns the values in schema order.
    pub fn order_map(&self, features: &BTreeMap<String, f64>) -> Result<Vec<f64>, ValidationError> {
        let missing: Vec<String> = self
            .names
            .iter()
            .filter(|n| !features.contains_key(n.as_str()))
            .cloned()
            .collect();
        let unexpected: Vec<String> = features
            .keys()
            .filter(|k| !self.names.contains(k))
            .cloned()
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(ValidationError::KeyMismatch {
                missing,
                unexpected,
            });
        }

        self.names
            .iter()
            .map(|name| finite(name, features[name]))
            .collect()
    }

    /// Checks an ordered vector: names must match the schema position by position.
    pub fn order_vector(&self, features: &FeatureVector) -> Result<Vec<f64>, ValidationError> {
        if features.names() == self.names.as_slice() {
            return self
                .names
                .iter()
                .zip(features.values())
                .map(|(name, value)| finite(name, *value))
                .collect();
        }

        let map: BTreeMap<String, f64> = features.iter().map(|(n, v)| (n.to_string(), v)).collect();
        if map.len() != features.len() {
            // duplicate names can never line up with a duplicate-free schema
            return Err(ValidationError::OrderMismatch);
        }
        self.order_map(&map)?;
        Err(ValidationError::OrderMismatch)
    }

    /// Projects a dataset row onto the schema. Extra columns are ignored; a
    /// missing column or an empty cell is a validation failure.
    pub fn project_row(&self, row: &RowView<'_>) -> Result<Vec<f64>, ValidationError> {
        let missing: Vec<String> = self
            .names
            .iter()
            .filter(|n| !row.has_column(n))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::KeyMismatch {
                missing,
                unexpected: Vec::new(),
            });
        }

        self.names
            .iter()
            .map(|name| match row.get(name) {
                Some(value) => finite(name, value),
                None => Err(ValidationError::NonNumeric { name: name.clone() }),
            })
            .collect()
    }
}

fn finite(name: &str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NonNumeric {
            name: name.to_string(),
        })
    }
}
