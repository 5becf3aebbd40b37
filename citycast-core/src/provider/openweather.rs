use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::model::{Coordinates, Forecast, RawReading};

use super::{GeoCandidate, WeatherProvider, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Talks to the OpenWeather geocoding, current weather and 5 day / 3 hour
/// forecast endpoints. All values are requested in metric units.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    /// Offset used for local dates; `None` means the machine's zone.
    local_offset: Option<FixedOffset>,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_client(api_key, Client::new())
    }

    pub fn with_client(api_key: String, http: Client) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            local_offset: None,
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_local_offset(mut self, offset: FixedOffset) -> Self {
        self.local_offset = Some(offset);
        self
    }

    fn to_local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        match self.local_offset {
            Some(offset) => at.with_timezone(&offset).naive_local(),
            None => at.with_timezone(&Local).naive_local(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "requesting OpenWeather {what}");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to OpenWeather ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read OpenWeather {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather {} request failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse OpenWeather {what} JSON"))
    }
}

#[derive(Debug, Deserialize)]
struct OwGeoCandidate {
    lat: f64,
    lon: f64,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    icon: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: u16,
    #[serde(default)]
    gust: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

fn first_condition(weather: &[OwWeather]) -> (String, String) {
    weather
        .first()
        .map(|w| (w.icon.clone(), w.description.clone()))
        .unwrap_or_else(|| (String::new(), "Unknown".to_string()))
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn geocode(&self, city_name: &str, country_code: &str) -> Result<Vec<GeoCandidate>> {
        let q = format!("{city_name},{country_code}");
        let parsed: Vec<OwGeoCandidate> = self
            .get_json("/geo/1.0/direct", &[("q", q.as_str()), ("limit", "5")], "geocoding")
            .await?;

        Ok(parsed
            .into_iter()
            .map(|c| GeoCandidate {
                coordinates: Coordinates::new(c.lat, c.lon),
                state_name: c.state.filter(|s| !s.is_empty()),
            })
            .collect())
    }

    async fn current_weather(&self, at: Coordinates) -> Result<Forecast> {
        let (lat, lon) = at.query_pair();
        let parsed: OwCurrentResponse = self
            .get_json(
                "/data/2.5/weather",
                &[("lat", lat.as_str()), ("lon", lon.as_str()), ("units", "metric")],
                "current weather",
            )
            .await?;

        let observed_at = unix_to_utc(parsed.dt).unwrap_or_else(Utc::now);
        let (icon, description) = first_condition(&parsed.weather);

        Ok(Forecast {
            date: Some(self.to_local(observed_at).date()),
            observed_at: Some(observed_at),
            icon,
            description,
            temperature: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            min: parsed.main.temp_min,
            max: parsed.main.temp_max,
            wind: parsed.wind.speed,
            wind_gust: parsed.wind.gust,
            wind_degrees: parsed.wind.deg,
            humidity: parsed.main.humidity,
            has_data: true,
        })
    }

    async fn five_day_forecast(&self, at: Coordinates) -> Result<Vec<RawReading>> {
        let (lat, lon) = at.query_pair();
        let parsed: OwForecastResponse = self
            .get_json(
                "/data/2.5/forecast",
                &[("lat", lat.as_str()), ("lon", lon.as_str()), ("units", "metric")],
                "5-day forecast",
            )
            .await?;

        parsed
            .list
            .into_iter()
            .map(|entry| -> Result<RawReading> {
                let timestamp = unix_to_utc(entry.dt)
                    .ok_or_else(|| anyhow!("Invalid forecast timestamp {}", entry.dt))?;
                let (icon, description) = first_condition(&entry.weather);

                Ok(RawReading {
                    timestamp,
                    local: self.to_local(timestamp),
                    temperature: entry.main.temp,
                    feels_like: entry.main.feels_like,
                    temp_min: entry.main.temp_min,
                    temp_max: entry.main.temp_max,
                    icon,
                    description,
                    humidity: entry.main.humidity,
                    wind_speed: entry.wind.speed,
                    wind_degrees: entry.wind.deg,
                    wind_gust: entry.wind.gust,
                })
            })
            .collect()
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}
