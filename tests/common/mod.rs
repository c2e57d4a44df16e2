#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{Duration, TimeZone, Utc};

use aqi_predictor::data::observation::{Pollutants, RawObservation, Weather};
use aqi_predictor::Config;

pub const FEATURES: [&str; 3] = ["pm2_5", "temperature", "humidity"];

/// Hourly rows whose AQI is a smooth function of the three features.
pub fn dataset_csv(rows: usize) -> String {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let mut csv = String::from("timestamp,pm2_5,temperature,humidity,aqi\n");
    for i in 0..rows {
        let pm2_5 = 5.0 + (i % 17) as f64 * 3.0;
        let temperature = 20.0 + (i % 11) as f64;
        let humidity = 40.0 + (i % 7) as f64 * 5.0;
        let aqi = 1.5 * pm2_5 + 0.2 * humidity - 0.3 * temperature + 20.0;
        let ts = start + Duration::hours(i as i64);
        writeln!(
            csv,
            "{},{},{},{},{}",
            ts.to_rfc3339(),
            pm2_5,
            temperature,
            humidity,
            aqi
        )
        .unwrap();
    }
    csv
}

pub fn write_dataset(path: &Path, rows: usize) {
    fs::write(path, dataset_csv(rows)).unwrap();
}

/// Config rooted in `dir` with a small, fast forest. Extra pairs override.
pub fn config_in(dir: &Path, extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("AQI_MODEL_PATH".into(), dir.join("model.bin").display().to_string());
    vars.insert(
        "AQI_FEATURES_PATH".into(),
        dir.join("feature_columns.json").display().to_string(),
    );
    vars.insert(
        "AQI_DATASET_PATH".into(),
        dir.join("features_data.csv").display().to_string(),
    );
    vars.insert("AQI_N_TREES".into(), "15".into());
    vars.insert("AQI_REMOTE_TIMEOUT_SECS".into(), "2".into());
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub fn observation(hour: i64, pm2_5: f64, aqi: Option<f64>, weather: bool) -> RawObservation {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    RawObservation {
        timestamp: start + Duration::hours(hour),
        aqi,
        pollutants: Pollutants {
            co: 200.0 + hour as f64,
            no: 0.5,
            no2: 4.0 + (hour % 3) as f64,
            o3: 60.0 - (hour % 5) as f64,
            so2: 6.0,
            pm2_5,
            pm10: pm2_5 * 1.8,
            nh3: 1.2,
        },
        weather: weather.then_some(Weather {
            temperature: 28.5,
            humidity: 55.0,
            dew_point: 18.0,
            apparent_temp: 30.0,
            precipitation: 0.0,
            rain: 0.0,
            pressure: 1008.0,
            cloud_cover: 20.0,
            wind_speed: 12.0,
            wind_dir: 220.0,
        }),
    }
}

/// `n` consecutive hours with AQI on every row.
pub fn observations(n: usize, weather: bool) -> Vec<RawObservation> {
    (0..n as i64)
        .map(|h| observation(h, 10.0 + h as f64, Some(2.0 + (h % 3) as f64), weather))
        .collect()
}
