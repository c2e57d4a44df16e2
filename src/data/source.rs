use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::data::dataset::Dataset;
use crate::data::features::engineer;
use crate::data::observation::{Pollutants, RawObservation};
use crate::data::weather::{attach_weather, WeatherResponse, WeatherSource};
use crate::error::{DatasetError, SourceError};

const OPENWEATHER_HISTORY_URL: &str = "http://api.openweathermap.org/data/2.5/air_pollution/history";

/// Where historical observations are pulled from before training.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteSource {
    /// Any endpoint that answers with an air-pollution history payload.
    Url(String),
    OpenWeather {
        api_key: String,
        latitude: f64,
        longitude: f64,
        history_days: i64,
    },
}

impl RemoteSource {
    pub fn url(&self, now: DateTime<Utc>) -> String {
        match self {
            RemoteSource::Url(url) => url.clone(),
            RemoteSource::OpenWeather {
                api_key,
                latitude,
                longitude,
                history_days,
            } => {
                let end = now.timestamp();
                let start = end - history_days * 24 * 60 * 60;
                format!(
                    "{OPENWEATHER_HISTORY_URL}?lat={latitude}&lon={longitude}&start={start}&end={end}&appid={api_key}"
                )
            }
        }
    }
}

/// Air-pollution history payload (`{"list": [...]}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub list: Vec<HistoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub dt: i64,
    pub main: HistoryMain,
    pub components: Pollutants,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMain {
    pub aqi: f64,
}

impl HistoryResponse {
    pub fn into_observations(self) -> Vec<RawObservation> {
        self.list
            .into_iter()
            .filter_map(|item| {
                let timestamp = DateTime::<Utc>::from_timestamp(item.dt, 0)?;
                Some(RawObservation {
                    timestamp,
                    aqi: Some(item.main.aqi),
                    pollutants: item.components,
                    weather: None,
                })
            })
            .collect()
    }
}

pub struct RemoteClient {
    client: Client,
    source: RemoteSource,
    weather: Option<WeatherSource>,
}

impl RemoteClient {
    /// Every request is bounded by `timeout`; there are no retries.
    pub fn new(source: RemoteSource, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(RemoteClient {
            client,
            source,
            weather: None,
        })
    }

    /// Enrich pollution history with hourly weather from `weather`.
    pub fn with_weather(mut self, weather: Option<WeatherSource>) -> Self {
        self.weather = weather;
        self
    }

    /// Pollution history, joined with weather when a weather source is set.
    /// A weather failure, or no overlapping hours, leaves the pollution
    /// history as it is.
    pub async fn fetch(&self) -> Result<Vec<RawObservation>, SourceError> {
        let now = Utc::now();
        let body: HistoryResponse = self.get_json(&self.source.url(now)).await?;
        let observations = body.into_observations();
        if observations.is_empty() {
            return Err(SourceError::Empty);
        }

        let Some(weather) = &self.weather else {
            return Ok(observations);
        };
        match self.get_json::<WeatherResponse>(&weather.url(now)).await {
            Ok(body) => {
                let joined = attach_weather(&observations, &body.into_readings());
                if joined.is_empty() {
                    warn!("Weather history shares no hours with the pollution history; training without weather");
                    return Ok(observations);
                }
                info!(
                    "Joined weather onto {} of {} hourly observations",
                    joined.len(),
                    observations.len()
                );
                Ok(joined)
            }
            Err(e) => {
                warn!("Weather source unavailable ({e}); training without weather");
                Ok(observations)
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataOrigin {
    Remote,
    LocalFallback,
}

#[derive(Debug)]
pub struct Acquired {
    pub origin: DataOrigin,
    pub dataset: Dataset,
}

/// Pulls history from the remote source when one is configured and
/// engineers it. Any remote failure, or engineered rows without `target`,
/// falls back to reading `local` as it is. Nothing is written here: the
/// caller replaces `local` once training has succeeded.
pub async fn acquire(
    remote: Option<&RemoteClient>,
    local: &Path,
    target: &str,
) -> Result<Acquired, DatasetError> {
    if let Some(client) = remote {
        match fetch_engineered(client, target).await {
            Ok(dataset) => {
                info!(
                    "Fetched {} engineered rows from the remote source",
                    dataset.len()
                );
                return Ok(Acquired {
                    origin: DataOrigin::Remote,
                    dataset,
                });
            }
            Err(e) => warn!(
                "Remote source unavailable ({}); falling back to {}",
                e,
                local.display()
            ),
        }
    } else {
        info!("No remote source configured, reading {}", local.display());
    }

    let dataset = Dataset::read_csv(local)?;
    Ok(Acquired {
        origin: DataOrigin::LocalFallback,
        dataset,
    })
}

async fn fetch_engineered(client: &RemoteClient, target: &str) -> Result<Dataset, SourceError> {
    let observations = client.fetch().await?;
    let rows = engineer(&observations)?;
    let dataset = Dataset::from_rows(&rows);
    if !dataset.columns().iter().any(|c| c == target) {
        return Err(SourceError::MissingTarget(target.to_string()));
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn openweather_url_covers_the_history_window() {
        let source = RemoteSource::OpenWeather {
            api_key: "k".into(),
            latitude: 24.8607,
            longitude: 67.0011,
            history_days: 1,
        };
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let url = source.url(now);
        let end = now.timestamp();
        assert!(url.starts_with(OPENWEATHER_HISTORY_URL));
        assert!(url.contains(&format!("start={}", end - 86_400)));
        assert!(url.contains(&format!("end={end}")));
        assert!(url.ends_with("appid=k"));
    }

    #[test]
    fn history_payload_maps_to_observations() {
        let payload = r#"{"list":[{"dt":1704067200,"main":{"aqi":3},
            "components":{"co":201.9,"no":0.1,"no2":3.4,"o3":68.6,"so2":6.2,
            "pm2_5":12.3,"pm10":20.1,"nh3":1.5}}]}"#;
        let response: HistoryResponse = serde_json::from_str(payload).unwrap();
        let observations = response.into_observations();

        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].aqi, Some(3.0));
        assert_eq!(observations[0].pollutants.pm2_5, 12.3);
        assert_eq!(observations[0].timestamp.timestamp(), 1_704_067_200);
        assert!(observations[0].weather.is_none());
    }
}
