use std::collections::BTreeMap;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::observation::{RawObservation, Weather};

const OPEN_METEO_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,dew_point_2m,\
apparent_temperature,precipitation,rain,pressure_msl,cloud_cover,wind_speed_10m,wind_direction_10m";
const HOUR_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Where hourly weather history is pulled from to enrich pollution readings.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherSource {
    /// Any endpoint answering with an Open-Meteo style `hourly` payload.
    Url(String),
    OpenMeteo {
        latitude: f64,
        longitude: f64,
        history_days: i64,
    },
}

impl WeatherSource {
    pub fn url(&self, now: DateTime<Utc>) -> String {
        match self {
            WeatherSource::Url(url) => url.clone(),
            WeatherSource::OpenMeteo {
                latitude,
                longitude,
                history_days,
            } => {
                let start = now - ChronoDuration::days(*history_days);
                format!(
                    "{OPEN_METEO_ARCHIVE_URL}?latitude={latitude}&longitude={longitude}\
                     &start_date={}&end_date={}&hourly={HOURLY_FIELDS}&timezone=GMT",
                    start.format("%Y-%m-%d"),
                    now.format("%Y-%m-%d"),
                )
            }
        }
    }
}

/// Open-Meteo archive payload. Times are UTC hours (`timezone=GMT`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub hourly: HourlyWeather,
}

/// Column-wise hourly series; any value may be `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub dew_point_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub apparent_temperature: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default)]
    pub rain: Vec<Option<f64>>,
    #[serde(default)]
    pub pressure_msl: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_direction_10m: Vec<Option<f64>>,
}

impl WeatherResponse {
    /// Complete readings keyed by hour. Hours with an unparsable time or any
    /// missing or non-finite value are left out.
    pub fn into_readings(self) -> BTreeMap<DateTime<Utc>, Weather> {
        let h = self.hourly;
        let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten().filter(|v| v.is_finite());

        h.time
            .iter()
            .enumerate()
            .filter_map(|(i, time)| {
                let timestamp = NaiveDateTime::parse_from_str(time, HOUR_FORMAT).ok()?.and_utc();
                let weather = Weather {
                    temperature: at(&h.temperature_2m, i)?,
                    humidity: at(&h.relative_humidity_2m, i)?,
                    dew_point: at(&h.dew_point_2m, i)?,
                    apparent_temp: at(&h.apparent_temperature, i)?,
                    precipitation: at(&h.precipitation, i)?,
                    rain: at(&h.rain, i)?,
                    pressure: at(&h.pressure_msl, i)?,
                    cloud_cover: at(&h.cloud_cover, i)?,
                    wind_speed: at(&h.wind_speed_10m, i)?,
                    wind_dir: at(&h.wind_direction_10m, i)?,
                };
                Some((timestamp, weather))
            })
            .collect()
    }
}

/// Inner join on the hour: observations without a weather reading are
/// dropped so every returned observation carries weather.
pub fn attach_weather(
    observations: &[RawObservation],
    readings: &BTreeMap<DateTime<Utc>, Weather>,
) -> Vec<RawObservation> {
    observations
        .iter()
        .filter_map(|o| {
            let weather = readings.get(&o.timestamp)?;
            Some(RawObservation {
                weather: Some(*weather),
                ..o.clone()
            })
        })
        .collect()
}
