use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{CountryPage, CountryProvider, CountryRecord, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org";

/// Countries per requested page.
pub const PAGE_SIZE: u32 = 50;

/// Reads the World Bank country list one page at a time.
#[derive(Debug, Clone)]
pub struct WorldBankProvider {
    base_url: String,
    http: Client,
}

impl Default for WorldBankProvider {
    fn default() -> Self {
        Self::with_client(Client::new())
    }
}

impl WorldBankProvider {
    pub fn with_client(http: Client) -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string(), http }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct WbPageMeta {
    page: u32,
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct WbRegion {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WbCountry {
    iso2_code: String,
    name: String,
    region: WbRegion,
}

/// The API answers with a two element array: paging metadata, then records.
#[derive(Debug, Deserialize)]
struct WbResponse(WbPageMeta, Vec<WbCountry>);

#[async_trait]
impl CountryProvider for WorldBankProvider {
    async fn fetch_page(&self, page: u32) -> Result<CountryPage> {
        let url = format!("{}/v2/country", self.base_url);
        let page_param = page.to_string();
        let per_page = PAGE_SIZE.to_string();
        tracing::debug!(%url, page, "requesting country page");

        let res = self
            .http
            .get(&url)
            .query(&[("format", "json"), ("per_page", per_page.as_str()), ("page", page_param.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to World Bank (page {page})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read World Bank country response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "World Bank country request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let WbResponse(meta, countries) = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse World Bank country page {page}"))?;

        Ok(CountryPage {
            page: meta.page,
            total_pages: meta.pages,
            records: countries
                .into_iter()
                .map(|c| CountryRecord { code: c.iso2_code, name: c.name, region_id: c.region.id })
                .collect(),
        })
    }
}
