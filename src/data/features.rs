use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::data::observation::{RawObservation, POLLUTANTS, WEATHER_FIELDS};
use crate::error::FeatureError;

pub const ROLLING_WINDOW: usize = 3;
pub const LAGS: [usize; 3] = [1, 3, 6];
/// Column the engineered AQI value is stored under.
pub const TARGET_COLUMN: &str = "aqi";
pub const LAGGED_COLUMNS: [&str; 3] = [TARGET_COLUMN, "pm2_5", "pm10"];

const RATIO_EPSILON: f64 = 1e-5;

/// Observations consumed as history before the first complete row.
pub const HISTORY: usize = 6;

/// An ordered mapping from feature name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        FeatureVector {
            names: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.names.push(name.into());
        self.values.push(value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut vector = FeatureVector::new();
        for (name, value) in iter {
            vector.push(name, value);
        }
        vector
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredRow {
    pub timestamp: DateTime<Utc>,
    pub aqi: Option<f64>,
    pub features: FeatureVector,
}

/// Canonical column order produced by [`engineer`].
pub fn feature_names(with_weather: bool) -> Vec<String> {
    let mut names: Vec<String> = [
        "hour",
        "day",
        "month",
        "dayofweek",
        "is_weekend",
        "hour_sin",
        "hour_cos",
        "day_sin",
        "day_cos",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    names.extend(POLLUTANTS.iter().map(|s| s.to_string()));
    if with_weather {
        names.extend(WEATHER_FIELDS.iter().map(|s| s.to_string()));
    }
    for pollutant in POLLUTANTS {
        names.push(format!("{pollutant}_rolling_mean_{ROLLING_WINDOW}"));
        names.push(format!("{pollutant}_rolling_std_{ROLLING_WINDOW}"));
    }
    for column in LAGGED_COLUMNS {
        for lag in LAGS {
            names.push(format!("{column}_lag_{lag}"));
        }
    }
    names.push("pm_ratio".to_string());
    names.push("no2_to_o3_ratio".to_string());
    names
}

/// Builds feature rows from raw observations.
///
/// Observations are ordered by timestamp first, so the result does not depend
/// on input order. The first [`HISTORY`] observations only serve as lag and
/// rolling-window history and produce no row of their own.
pub fn engineer(observations: &[RawObservation]) -> Result<Vec<EngineeredRow>, FeatureError> {
    let needed = HISTORY + 1;
    if observations.len() < needed {
        return Err(FeatureError::InsufficientHistory {
            needed,
            got: observations.len(),
        });
    }

    let mut sorted: Vec<&RawObservation> = observations.iter().collect();
    sorted.sort_by_key(|o| o.timestamp);

    let with_weather = sorted[0].weather.is_some();
    for observation in &sorted {
        check_observation(observation, with_weather)?;
    }

    (HISTORY..sorted.len())
        .map(|i| engineer_row(&sorted, i, with_weather))
        .collect()
}

fn check_observation(observation: &RawObservation, with_weather: bool) -> Result<(), FeatureError> {
    if observation.weather.is_some() != with_weather {
        return Err(FeatureError::InconsistentWeather {
            timestamp: observation.timestamp.to_rfc3339(),
        });
    }
    match observation.raw_values().into_iter().find(|(_, v)| !v.is_finite()) {
        Some((field, _)) => Err(FeatureError::NonFinite {
            field: field.to_string(),
            timestamp: observation.timestamp.to_rfc3339(),
        }),
        None => Ok(()),
    }
}

fn engineer_row(
    history: &[&RawObservation],
    index: usize,
    with_weather: bool,
) -> Result<EngineeredRow, FeatureError> {
    let current = history[index];
    let mut features = FeatureVector::with_capacity(64);

    push_time_features(&mut features, &current.timestamp);

    for (name, value) in POLLUTANTS.iter().zip(current.pollutants.values()) {
        features.push(*name, value);
    }
    if with_weather {
        if let Some(weather) = &current.weather {
            for (name, value) in WEATHER_FIELDS.iter().zip(weather.values()) {
                features.push(*name, value);
            }
        }
    }

    let window = &history[index + 1 - ROLLING_WINDOW..=index];
    for (k, pollutant) in POLLUTANTS.iter().enumerate() {
        let values: Vec<f64> = window.iter().map(|o| o.pollutants.values()[k]).collect();
        features.push(format!("{pollutant}_rolling_mean_{ROLLING_WINDOW}"), mean(&values));
        features.push(
            format!("{pollutant}_rolling_std_{ROLLING_WINDOW}"),
            sample_std(&values),
        );
    }

    for column in LAGGED_COLUMNS {
        for lag in LAGS {
            let past = history[index - lag];
            features.push(format!("{column}_lag_{lag}"), lagged_value(past, column)?);
        }
    }

    let p = &current.pollutants;
    features.push("pm_ratio", p.pm2_5 / (p.pm10 + RATIO_EPSILON));
    features.push("no2_to_o3_ratio", p.no2 / (p.o3 + RATIO_EPSILON));

    Ok(EngineeredRow {
        timestamp: current.timestamp,
        aqi: current.aqi,
        features,
    })
}

fn push_time_features(features: &mut FeatureVector, timestamp: &DateTime<Utc>) {
    let hour = f64::from(timestamp.hour());
    let dayofweek = f64::from(timestamp.weekday().num_days_from_monday());

    features.push("hour", hour);
    features.push("day", f64::from(timestamp.day()));
    features.push("month", f64::from(timestamp.month()));
    features.push("dayofweek", dayofweek);
    features.push("is_weekend", if dayofweek >= 5.0 { 1.0 } else { 0.0 });
    features.push("hour_sin", (2.0 * PI * hour / 24.0).sin());
    features.push("hour_cos", (2.0 * PI * hour / 24.0).cos());
    features.push("day_sin", (2.0 * PI * dayofweek / 7.0).sin());
    features.push("day_cos", (2.0 * PI * dayofweek / 7.0).cos());
}

fn lagged_value(past: &RawObservation, column: &str) -> Result<f64, FeatureError> {
    match column {
        TARGET_COLUMN => past.aqi.ok_or_else(|| FeatureError::MissingHistory {
            timestamp: past.timestamp.to_rfc3339(),
        }),
        "pm2_5" => Ok(past.pollutants.pm2_5),
        _ => Ok(past.pollutants.pm10),
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

// ddof = 1, matching pandas' rolling std.
fn sample_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() as f64 - 1.0)).sqrt()
}
