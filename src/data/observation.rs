use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const POLLUTANTS: [&str; 8] = ["co", "no", "no2", "o3", "so2", "pm2_5", "pm10", "nh3"];

pub const WEATHER_FIELDS: [&str; 10] = [
    "temperature",
    "humidity",
    "dew_point",
    "apparent_temp",
    "precipitation",
    "rain",
    "pressure",
    "cloud_cover",
    "wind_speed",
    "wind_dir",
];

/// Pollutant concentrations in µg/m³, as reported by the air-pollution API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    pub co: f64,
    pub no: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
}

impl Pollutants {
    /// Values in `POLLUTANTS` order.
    pub fn values(&self) -> [f64; 8] {
        [
            self.co, self.no, self.no2, self.o3, self.so2, self.pm2_5, self.pm10, self.nh3,
        ]
    }
}

/// Hourly weather readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature: f64,
    pub humidity: f64,
    pub dew_point: f64,
    pub apparent_temp: f64,
    pub precipitation: f64,
    pub rain: f64,
    pub pressure: f64,
    pub cloud_cover: f64,
    pub wind_speed: f64,
    pub wind_dir: f64,
}

impl Weather {
    /// Values in `WEATHER_FIELDS` order.
    pub fn values(&self) -> [f64; 10] {
        [
            self.temperature,
            self.humidity,
            self.dew_point,
            self.apparent_temp,
            self.precipitation,
            self.rain,
            self.pressure,
            self.cloud_cover,
            self.wind_speed,
            self.wind_dir,
        ]
    }
}

/// One hourly reading before feature engineering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub timestamp: DateTime<Utc>,
    /// Target value; absent for the row being predicted.
    #[serde(default)]
    pub aqi: Option<f64>,
    pub pollutants: Pollutants,
    #[serde(default)]
    pub weather: Option<Weather>,
}

impl RawObservation {
    /// Every named raw value carried by this observation, pollutants first.
    pub fn raw_values(&self) -> Vec<(&'static str, f64)> {
        let mut values: Vec<(&'static str, f64)> = POLLUTANTS
            .iter()
            .copied()
            .zip(self.pollutants.values())
            .collect();
        if let Some(weather) = &self.weather {
            values.extend(WEATHER_FIELDS.iter().copied().zip(weather.values()));
        }
        if let Some(aqi) = self.aqi {
            values.push(("aqi", aqi));
        }
        values
    }
}
