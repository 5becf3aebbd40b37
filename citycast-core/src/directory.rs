//! The collection of every city record across all named lists.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};

use crate::{
    model::{City, Coordinates, SerializedCity},
    storage::{CITY_LIST_KEY, DEFAULT_CITY_KEY, Store},
};

/// Virtual list made of every record flagged as favourite.
pub const FAVOURITES_LIST: &str = "Favourites";

/// List that searched cities land in unless configured otherwise.
pub const SEARCH_HISTORY_LIST: &str = "Search History";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedDirectory {
    cities: Vec<SerializedCity>,
}

/// Holds one record per `(city_name, country_code, list_name)` and keeps
/// records of the same place in agreement on favourite status and weather.
///
/// Every mutation that changes persisted fields writes the whole directory
/// back to the store. Write failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct CityDirectory {
    cities: Vec<City>,
    store: Arc<dyn Store>,
}

impl CityDirectory {
    /// Empty directory backed by `store`. Nothing is read from it.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { cities: Vec::new(), store }
    }

    /// Restores the directory saved in `store`, or an empty one.
    pub fn load(store: Arc<dyn Store>) -> Result<Self> {
        let persisted = match store.load(CITY_LIST_KEY)? {
            Some(json) => serde_json::from_str::<PersistedDirectory>(&json)
                .context("Failed to parse stored city list")?,
            None => PersistedDirectory::default(),
        };

        let mut directory = Self::new(store);
        for serialized in persisted.cities {
            let city = City::deserialize(serialized);
            let duplicate = directory
                .cities
                .iter()
                .any(|c| c.is_entry(&city.city_name, &city.country_code, &city.list_name));
            if !duplicate {
                directory.cities.push(city);
            }
        }
        directory.sort();

        tracing::debug!(cities = directory.cities.len(), "loaded city directory");
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn get(&self, city_name: &str, country_code: &str, list_name: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.is_entry(city_name, country_code, list_name))
    }

    /// Inserts a copy of `city` unless its list already holds that place.
    ///
    /// An existing record is left alone, weather and favourite flag
    /// included. Returns whether a record was inserted.
    pub fn upsert(&mut self, city: &City) -> bool {
        if self.get(&city.city_name, &city.country_code, &city.list_name).is_some() {
            return false;
        }

        self.cities.push(city.clone());
        self.sort();
        tracing::debug!(city = %city.city_name, list = %city.list_name, "added city to list");

        if !self.propagate_favourites() {
            self.persist();
        }
        true
    }

    /// Spreads favourite status to every record of a favourite place.
    ///
    /// Flags are only ever set here, never cleared. Persists and returns
    /// `true` if any record changed.
    pub fn propagate_favourites(&mut self) -> bool {
        let favourites: HashSet<_> =
            self.cities.iter().filter(|c| c.is_favourite).map(City::identity).collect();

        let mut changed = false;
        for city in &mut self.cities {
            if !city.is_favourite && favourites.contains(&city.identity()) {
                city.is_favourite = true;
                changed = true;
            }
        }

        if changed {
            self.persist();
        }
        changed
    }

    /// Copies the weather of `source` onto every record of the same place.
    pub fn propagate_weather(&mut self, source: &City) {
        let identity = source.identity();
        let mut updated = 0;
        for city in self.cities.iter_mut().filter(|c| c.identity() == identity) {
            city.copy_weather_from(source);
            updated += 1;
        }
        tracing::debug!(city = %source.city_name, updated, "propagated weather");
    }

    /// Whether any list holds this place as a favourite.
    pub fn is_favourite(&self, city_name: &str, country_code: &str) -> bool {
        self.cities.iter().any(|c| c.is_favourite && c.is_named(city_name, country_code))
    }

    /// Sets the favourite flag on every list membership of a place, and on
    /// the last viewed city when it is the same place.
    pub fn set_favourite(&mut self, city_name: &str, country_code: &str, value: bool) {
        for city in self.cities.iter_mut().filter(|c| c.is_named(city_name, country_code)) {
            city.is_favourite = value;
        }
        self.persist();

        match self.stored_last_viewed() {
            Ok(Some(mut last))
                if last.is_named(city_name, country_code) && last.is_favourite != value =>
            {
                last.is_favourite = value;
                self.set_last_viewed(&last);
            }
            Ok(_) => {}
            Err(err) => tracing::warn!("Ignoring stored default city: {err:#}"),
        }
    }

    /// Drops a single list membership. Returns whether one was found.
    pub fn remove(&mut self, city_name: &str, country_code: &str, list_name: &str) -> bool {
        let Some(index) =
            self.cities.iter().position(|c| c.is_entry(city_name, country_code, list_name))
        else {
            return false;
        };

        self.cities.remove(index);
        self.persist();
        true
    }

    /// Copies of the records in `list_name`, one per place.
    ///
    /// [`FAVOURITES_LIST`] (any case) selects favourite records from every
    /// list instead of matching the list name.
    pub fn list_for(&self, list_name: &str) -> Vec<City> {
        let favourites = list_name.eq_ignore_ascii_case(FAVOURITES_LIST);
        let mut seen = HashSet::new();

        self.cities
            .iter()
            .filter(|c| if favourites { c.is_favourite } else { c.list_name == list_name })
            .filter(|c| seen.insert(c.identity()))
            .cloned()
            .collect()
    }

    /// Distinct list names in use, in order of first appearance.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for city in &self.cities {
            if !names.contains(&city.list_name) {
                names.push(city.list_name.clone());
            }
        }
        names
    }

    /// The last city the user looked at, or Adelaide when none was saved.
    pub fn last_viewed(&self) -> City {
        match self.stored_last_viewed() {
            Ok(Some(city)) => city,
            Ok(None) => fallback_city(),
            Err(err) => {
                tracing::warn!("Ignoring stored default city: {err:#}");
                fallback_city()
            }
        }
    }

    fn stored_last_viewed(&self) -> Result<Option<City>> {
        let Some(json) = self.store.load(DEFAULT_CITY_KEY)? else {
            return Ok(None);
        };
        let serialized: SerializedCity =
            serde_json::from_str(&json).context("Failed to parse stored default city")?;

        Ok(Some(City::deserialize(serialized)).filter(|c| !c.city_name.is_empty()))
    }

    pub fn set_last_viewed(&self, city: &City) {
        match serde_json::to_string(&city.serialize()) {
            Ok(json) => {
                if let Err(err) = self.store.save(DEFAULT_CITY_KEY, &json) {
                    tracing::warn!("Failed to save default city: {err:#}");
                }
            }
            Err(err) => tracing::warn!("Failed to serialize default city: {err}"),
        }
    }

    fn sort(&mut self) {
        self.cities.sort_by_cached_key(|c| c.city_name.to_lowercase());
    }

    fn persist(&self) {
        let persisted = PersistedDirectory {
            cities: self.cities.iter().map(City::serialize).collect(),
        };

        let result = serde_json::to_string(&persisted)
            .context("Failed to serialize city list")
            .and_then(|json| self.store.save(CITY_LIST_KEY, &json));

        if let Err(err) = result {
            tracing::warn!("Failed to persist city list: {err:#}");
        }
    }
}

/// City shown before anything has been searched for.
pub fn fallback_city() -> City {
    let mut city = City::new("Adelaide", "AU");
    city.country_name = "Australia".into();
    city.state_name = "South Australia".into();
    city.set_coordinates(Coordinates::new(-34.92, 138.60));
    city
}
