use crate::{
    Config,
    model::{Coordinates, Forecast, RawReading},
    provider::{openweather::OpenWeatherProvider, worldbank::WorldBankProvider},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, time::Duration};

pub mod openweather;
pub mod worldbank;

/// One geocoding match.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCandidate {
    pub coordinates: Coordinates,
    pub state_name: Option<String>,
}

/// Geocoding plus current and five-day weather for a location.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Candidate locations for a city, best match first.
    async fn geocode(&self, city_name: &str, country_code: &str)
    -> anyhow::Result<Vec<GeoCandidate>>;

    /// Current conditions as a single reading with `has_data` set.
    async fn current_weather(&self, at: Coordinates) -> anyhow::Result<Forecast>;

    /// Raw 3-hour readings in ascending time order.
    async fn five_day_forecast(&self, at: Coordinates) -> anyhow::Result<Vec<RawReading>>;
}

/// One entry of a country-list page, before aggregates are filtered out.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRecord {
    pub code: String,
    pub name: String,
    pub region_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryPage {
    pub page: u32,
    pub total_pages: u32,
    pub records: Vec<CountryRecord>,
}

/// Paginated source of countries.
#[async_trait]
pub trait CountryProvider: Send + Sync + Debug {
    /// Fetches page `page`, counting from 1.
    async fn fetch_page(&self, page: u32) -> anyhow::Result<CountryPage>;
}

fn http_client(config: &Config) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// Construct the weather provider from config.
pub fn weather_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key()?;
    let provider = OpenWeatherProvider::with_client(api_key.to_owned(), http_client(config)?);
    Ok(Box::new(provider))
}

/// Construct the country-list provider from config.
pub fn country_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn CountryProvider>> {
    Ok(Box::new(WorldBankProvider::with_client(http_client(config)?)))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_provider_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = weather_provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn weather_provider_builds_when_configured() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());

        assert!(weather_provider_from_config(&cfg).is_ok());
    }

    #[test]
    fn country_provider_needs_no_key() {
        assert!(country_provider_from_config(&Config::default()).is_ok());
    }

    #[test]
    fn truncate_body_limits_long_payloads() {
        let long = "x".repeat(500);
        let cut = truncate_body(&long);
        assert_eq!(cut.len(), 203);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_body("short"), "short");
    }
}
