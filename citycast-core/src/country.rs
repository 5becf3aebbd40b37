//! Country codes and names, fetched page by page and cached in the store.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::PaginationFailure,
    provider::CountryProvider,
    storage::{COUNTRIES_KEY, Store},
};

/// Region id the provider uses for groupings that are not countries.
pub const AGGREGATE_REGION: &str = "NA";

/// A cached list shorter than this is treated as stale and refetched.
pub const MIN_CACHED_COUNTRIES: usize = 100;

/// Countries offered ahead of the alphabetical list.
const PINNED: [(&str, &str); 2] = [("AU", "Australia"), ("NZ", "New Zealand")];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
}

/// Result of walking every page. `failure` is set when a page failed and
/// `countries` only holds what came before it.
#[derive(Debug)]
pub struct CountryListing {
    pub countries: Vec<Country>,
    pub failure: Option<PaginationFailure>,
}

impl CountryListing {
    pub fn is_partial(&self) -> bool {
        self.failure.is_some()
    }
}

/// Requests pages one after another until the provider reports no more.
///
/// Aggregate regions and records without a code are skipped. A failing
/// page ends the walk but keeps the countries gathered so far.
pub async fn fetch_all(provider: &dyn CountryProvider) -> CountryListing {
    let mut countries = Vec::new();
    let mut page = 1;

    loop {
        let fetched = match provider.fetch_page(page).await {
            Ok(fetched) => fetched,
            Err(source) => {
                tracing::warn!(page, "Country list fetch stopped early: {source:#}");
                return CountryListing {
                    countries,
                    failure: Some(PaginationFailure { page, source }),
                };
            }
        };

        countries.extend(
            fetched
                .records
                .into_iter()
                .filter(|r| r.region_id != AGGREGATE_REGION && !r.code.is_empty())
                .map(|r| Country { code: r.code, name: r.name }),
        );

        if fetched.total_pages > page {
            page += 1;
        } else {
            tracing::debug!(pages = page, countries = countries.len(), "fetched country list");
            return CountryListing { countries, failure: None };
        }
    }
}

/// What [`CountryCatalog::load_or_fetch`] did.
#[derive(Debug)]
pub struct CatalogLoad {
    pub catalog: CountryCatalog,
    /// True when the provider was asked rather than the cache.
    pub refreshed: bool,
    pub failure: Option<PaginationFailure>,
}

/// Countries sorted by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryCatalog {
    countries: Vec<Country>,
}

impl CountryCatalog {
    pub fn new(mut countries: Vec<Country>) -> Self {
        countries.sort_by_cached_key(|c| c.name.to_lowercase());
        Self { countries }
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn is_stale(&self) -> bool {
        self.countries.len() < MIN_CACHED_COUNTRIES
    }

    pub fn name_for(&self, code: &str) -> Option<&str> {
        let code = code.trim();
        self.countries
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .map(|c| c.name.as_str())
    }

    /// Choices for a country picker: Australia and New Zealand first, then
    /// everything else by name.
    pub fn for_selection(&self) -> Vec<Country> {
        let mut out: Vec<Country> = PINNED
            .iter()
            .map(|(code, fallback)| Country {
                code: (*code).to_string(),
                name: self.name_for(code).unwrap_or(*fallback).to_string(),
            })
            .collect();

        out.extend(
            self.countries
                .iter()
                .filter(|c| !PINNED.iter().any(|(code, _)| c.code.eq_ignore_ascii_case(code)))
                .cloned(),
        );
        out
    }

    /// Cached catalog from `store`, if one was saved and can be read.
    pub fn cached(store: &dyn Store) -> Result<Option<Self>> {
        let Some(json) = store.load(COUNTRIES_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<Country>>(&json) {
            Ok(countries) => Ok(Some(Self::new(countries))),
            Err(err) => {
                tracing::warn!("Ignoring unreadable country cache: {err}");
                Ok(None)
            }
        }
    }

    /// Uses the cached catalog unless it is missing, stale or `refresh` is
    /// set; otherwise fetches every page and caches the result.
    pub async fn load_or_fetch(
        store: &dyn Store,
        provider: &dyn CountryProvider,
        refresh: bool,
    ) -> Result<CatalogLoad> {
        if !refresh {
            if let Some(catalog) = Self::cached(store)?.filter(|c| !c.is_stale()) {
                return Ok(CatalogLoad { catalog, refreshed: false, failure: None });
            }
        }

        let listing = fetch_all(provider).await;
        let catalog = Self::new(listing.countries);

        if !catalog.is_empty() {
            let json = serde_json::to_string(&catalog.countries)
                .context("Failed to serialize country list")?;
            if let Err(err) = store.save(COUNTRIES_KEY, &json) {
                tracing::warn!("Failed to cache country list: {err:#}");
            }
        }

        Ok(CatalogLoad { catalog, refreshed: true, failure: listing.failure })
    }
}
