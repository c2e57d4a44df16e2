use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info};

use crate::data::source::RemoteSource;
use crate::data::weather::WeatherSource;
use crate::error::ConfigError;
use crate::model::forest::{ForestParams, Task};

const DEFAULT_LATITUDE: f64 = 24.8607;
const DEFAULT_LONGITUDE: f64 = 67.0011;

/// Artifact and dataset locations shared by every binary.
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    pub model: PathBuf,
    pub feature_columns: PathBuf,
    pub dataset: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            model: PathBuf::from("model.bin"),
            feature_columns: PathBuf::from("feature_columns.json"),
            dataset: PathBuf::from("features_data.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    pub source: Option<RemoteSource>,
    /// Joined onto the pollution history; unused without `source`.
    pub weather: Option<WeatherSource>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub task: Task,
    pub target: String,
    /// Explicit feature selection; `None` trains on every non-target column.
    pub features: Option<Vec<String>>,
    pub forest: ForestParams,
    pub test_fraction: f64,
    pub validation_plot: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            task: Task::Regression,
            target: "aqi".to_string(),
            features: None,
            forest: ForestParams::default(),
            test_fraction: 0.2,
            validation_plot: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub paths: Paths,
    pub remote: RemoteConfig,
    pub training: TrainingConfig,
    pub bind: SocketAddr,
}

impl Config {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenv::dotenv() {
            Ok(path) => info!("Loaded environment variables from {}", path.display()),
            Err(_) => debug!("No .env file found, using environment variables from system"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = Paths::default();
        let paths = Paths {
            model: get("AQI_MODEL_PATH").map(PathBuf::from).unwrap_or(defaults.model),
            feature_columns: get("AQI_FEATURES_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.feature_columns),
            dataset: get("AQI_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset),
        };

        let latitude = parse_or(&get, "AQI_LATITUDE", DEFAULT_LATITUDE)?;
        let longitude = parse_or(&get, "AQI_LONGITUDE", DEFAULT_LONGITUDE)?;
        let history_days = parse_or(&get, "AQI_HISTORY_DAYS", 90)?;

        let source = match (get("AQI_REMOTE_URL"), get("OPENWEATHER_API_KEY")) {
            (Some(url), _) => Some(RemoteSource::Url(url)),
            (None, Some(api_key)) => Some(RemoteSource::OpenWeather {
                api_key,
                latitude,
                longitude,
                history_days,
            }),
            (None, None) => None,
        };
        let weather = match (get("AQI_WEATHER_URL"), get("AQI_WEATHER_SOURCE")) {
            (Some(url), _) => Some(WeatherSource::Url(url)),
            (None, Some(name)) => match name.trim().to_ascii_lowercase().as_str() {
                "open-meteo" | "openmeteo" => Some(WeatherSource::OpenMeteo {
                    latitude,
                    longitude,
                    history_days,
                }),
                "none" | "off" => None,
                _ => {
                    return Err(invalid(
                        "AQI_WEATHER_SOURCE",
                        &name,
                        "expected open-meteo or none",
                    ))
                }
            },
            (None, None) => None,
        };
        let remote = RemoteConfig {
            source,
            weather,
            timeout: Duration::from_secs(parse_or(&get, "AQI_REMOTE_TIMEOUT_SECS", 10)?),
        };

        let base = ForestParams::default();
        let forest = ForestParams {
            n_trees: parse_or(&get, "AQI_N_TREES", base.n_trees)?,
            max_depth: parse_opt(&get, "AQI_MAX_DEPTH")?,
            min_samples_leaf: parse_or(&get, "AQI_MIN_SAMPLES_LEAF", base.min_samples_leaf)?,
            min_samples_split: parse_or(&get, "AQI_MIN_SAMPLES_SPLIT", base.min_samples_split)?,
            seed: parse_or(&get, "AQI_SEED", base.seed)?,
        };
        if forest.n_trees == 0 {
            return Err(invalid("AQI_N_TREES", "0", "at least one tree is required"));
        }

        let test_fraction: f64 = parse_or(&get, "AQI_TEST_FRACTION", 0.2)?;
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(invalid(
                "AQI_TEST_FRACTION",
                &test_fraction.to_string(),
                "must lie strictly between 0 and 1",
            ));
        }

        let features = get("AQI_FEATURES").map(|list| {
            list.split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect::<Vec<_>>()
        });

        let training = TrainingConfig {
            task: parse_or(&get, "AQI_TASK", Task::Regression)?,
            target: get("AQI_TARGET").unwrap_or_else(|| "aqi".to_string()),
            features,
            forest,
            test_fraction,
            validation_plot: get("AQI_VALIDATION_PLOT").map(PathBuf::from),
        };

        let host: IpAddr = parse_or(&get, "AQI_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port: u16 = parse_or(&get, "AQI_PORT", 8000)?;

        Ok(Config {
            paths,
            remote,
            training,
            bind: SocketAddr::new(host, port),
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

fn parse_opt<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
    }
}
