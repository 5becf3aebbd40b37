use serde::{Deserialize, Serialize};

use super::forecast::{Coordinates, Forecast};

/// Number of daily slots a city carries, for day offsets 1 through 5.
pub const FORECAST_DAYS: usize = 5;

/// The key that says two records describe the same place, whatever list
/// they sit in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    city: String,
    country: String,
}

impl Identity {
    pub fn new(city_name: &str, country_code: &str) -> Self {
        Self {
            city: city_name.trim().to_lowercase(),
            country: country_code.trim().to_uppercase(),
        }
    }
}

/// A city record as it appears in one named list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct City {
    pub city_name: String,
    pub country_code: String,
    pub country_name: String,
    pub state_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub current_weather: Forecast,
    pub five_day_forecast: [Forecast; FORECAST_DAYS],
    pub list_name: String,
    pub is_favourite: bool,
    pub has_data: bool,
}

impl City {
    /// Creates an empty record, normalizing the name to title case and the
    /// country code to upper case.
    pub fn new(city_name: &str, country_code: &str) -> Self {
        Self {
            city_name: title_case(city_name),
            country_code: country_code.trim().to_uppercase(),
            ..Self::default()
        }
    }

    /// Same record, tagged for another list.
    pub fn in_list(mut self, list_name: impl Into<String>) -> Self {
        self.list_name = list_name.into();
        self
    }

    pub fn identity(&self) -> Identity {
        Identity::new(&self.city_name, &self.country_code)
    }

    pub fn is_same_place(&self, other: &City) -> bool {
        self.identity() == other.identity()
    }

    pub fn is_named(&self, city_name: &str, country_code: &str) -> bool {
        self.identity() == Identity::new(city_name, country_code)
    }

    /// Full membership match: identity pair plus list name.
    pub fn is_entry(&self, city_name: &str, country_code: &str, list_name: &str) -> bool {
        self.is_named(city_name, country_code) && self.list_name == list_name
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.latitude = coordinates.latitude;
        self.longitude = coordinates.longitude;
    }

    /// Fills the daily slots in order. Missing days stay as empty
    /// placeholders and extra days are dropped.
    pub fn set_daily_forecasts(&mut self, days: Vec<Forecast>) {
        let mut days = days.into_iter();
        for slot in &mut self.five_day_forecast {
            *slot = days.next().unwrap_or_default();
        }
    }

    pub fn set_forecast_has_data(&mut self, value: bool) {
        for slot in &mut self.five_day_forecast {
            slot.has_data = value;
        }
    }

    /// Marks every piece of weather on this record as stale.
    pub fn clear_weather_flags(&mut self) {
        self.has_data = false;
        self.current_weather.has_data = false;
        self.set_forecast_has_data(false);
    }

    /// Takes weather state from another record of the same place.
    pub fn copy_weather_from(&mut self, source: &City) {
        self.current_weather = source.current_weather.clone();
        self.five_day_forecast = source.five_day_forecast.clone();
        self.has_data = source.has_data;
    }

    /// "City, State, Country", leaving out whatever is unknown.
    pub fn display_name(&self) -> String {
        [&self.city_name, &self.state_name, &self.country_name]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Persistable part of the record. Weather is never written out.
    pub fn serialize(&self) -> SerializedCity {
        SerializedCity {
            city_name: self.city_name.clone(),
            country_code: self.country_code.clone(),
            country_name: self.country_name.clone(),
            state_name: self.state_name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            is_favourite: self.is_favourite,
            list_name: self.list_name.clone(),
        }
    }

    pub fn deserialize(serialized: SerializedCity) -> Self {
        Self {
            city_name: serialized.city_name,
            country_code: serialized.country_code,
            country_name: serialized.country_name,
            state_name: serialized.state_name,
            latitude: serialized.latitude,
            longitude: serialized.longitude,
            is_favourite: serialized.is_favourite,
            list_name: serialized.list_name,
            ..Self::default()
        }
    }
}

/// Storage shape of a [`City`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCity {
    pub city_name: String,
    pub country_code: String,
    #[serde(default)]
    pub country_name: String,
    #[serde(default)]
    pub state_name: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub is_favourite: bool,
    #[serde(default)]
    pub list_name: String,
}

/// Upper-cases the first character of each whitespace-separated word and
/// lower-cases the rest.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut word_start = true;

    for ch in input.trim().chars() {
        if ch.is_whitespace() {
            word_start = true;
            out.push(ch);
        } else if word_start {
            word_start = false;
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sunny(day: u32) -> Forecast {
        Forecast {
            date: NaiveDate::from_ymd_opt(2024, 3, day),
            icon: "01d".into(),
            has_data: true,
            ..Forecast::default()
        }
    }

    fn weathered_city() -> City {
        let mut city = City::new("paris", "fr").in_list("World Cities");
        city.country_name = "France".into();
        city.state_name = "Ile-de-France".into();
        city.set_coordinates(Coordinates::new(48.8589, 2.32));
        city.is_favourite = true;
        city.current_weather = Forecast { temperature: 18.5, has_data: true, ..Forecast::default() };
        city.set_daily_forecasts(vec![sunny(2), sunny(3)]);
        city.has_data = true;
        city
    }

    #[test]
    fn new_normalizes_name_and_code() {
        let city = City::new("  new YORK ", " us");
        assert_eq!(city.city_name, "New York");
        assert_eq!(city.country_code, "US");
        assert!(!city.coordinates().is_resolved());
    }

    #[test]
    fn title_case_handles_mixed_input() {
        assert_eq!(title_case("rIO de janeiro"), "Rio De Janeiro");
        assert_eq!(title_case("st. john's"), "St. John's");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn identity_ignores_case_and_list() {
        let a = City::new("Tokyo", "JP").in_list("Search History");
        let mut b = City::new("Tokyo", "JP").in_list("World Cities");
        b.city_name = "TOKYO".into();
        b.country_code = "jp".into();

        assert!(a.is_same_place(&b));
        assert!(a.is_named("tokyo", "jp"));
        assert!(!a.is_entry("Tokyo", "JP", "World Cities"));
        assert!(b.is_entry("Tokyo", "JP", "World Cities"));
    }

    #[test]
    fn short_forecast_is_padded_with_placeholders() {
        let city = weathered_city();

        assert!(city.five_day_forecast[0].has_data);
        assert!(city.five_day_forecast[1].has_data);
        for slot in &city.five_day_forecast[2..] {
            assert_eq!(slot, &Forecast::default());
        }
    }

    #[test]
    fn clear_weather_flags_reaches_every_slot() {
        let mut city = weathered_city();
        city.clear_weather_flags();

        assert!(!city.has_data);
        assert!(!city.current_weather.has_data);
        assert!(city.five_day_forecast.iter().all(|f| !f.has_data));
    }

    #[test]
    fn serialize_roundtrip_keeps_identity_and_drops_weather() {
        let city = weathered_city();
        let restored = City::deserialize(city.serialize());

        assert_eq!(restored.city_name, city.city_name);
        assert_eq!(restored.country_code, city.country_code);
        assert_eq!(restored.country_name, city.country_name);
        assert_eq!(restored.state_name, city.state_name);
        assert_eq!(restored.latitude, city.latitude);
        assert_eq!(restored.longitude, city.longitude);
        assert_eq!(restored.is_favourite, city.is_favourite);
        assert_eq!(restored.list_name, city.list_name);

        assert!(!restored.has_data);
        assert_eq!(restored.current_weather, Forecast::default());
        assert!(restored.five_day_forecast.iter().all(|f| *f == Forecast::default()));
    }

    #[test]
    fn serialized_city_uses_camel_case_keys() {
        let json = serde_json::to_value(weathered_city().serialize()).unwrap();

        assert_eq!(json["cityName"], "Paris");
        assert_eq!(json["countryCode"], "FR");
        assert_eq!(json["isFavourite"], true);
        assert_eq!(json["listName"], "World Cities");
        assert!(json.get("currentWeather").is_none());
    }

    #[test]
    fn display_name_skips_missing_parts() {
        let mut city = City::new("adelaide", "au");
        assert_eq!(city.display_name(), "Adelaide");

        city.country_name = "Australia".into();
        assert_eq!(city.display_name(), "Adelaide, Australia");

        city.state_name = "South Australia".into();
        assert_eq!(city.display_name(), "Adelaide, South Australia, Australia");
    }

    #[test]
    fn clones_do_not_alias_weather() {
        let original = weathered_city();
        let mut copy = original.clone();
        copy.current_weather.temperature = -5.0;
        copy.five_day_forecast[0].icon = "13d".into();

        assert_eq!(original.current_weather.temperature, 18.5);
        assert_eq!(original.five_day_forecast[0].icon, "01d");
    }
}
