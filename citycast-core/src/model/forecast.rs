use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// A single reading, either a point-in-time observation or a daily summary.
///
/// When `has_data` is false the numeric fields carry no meaning and display
/// code should show them as unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Calendar day the reading describes.
    pub date: Option<NaiveDate>,
    /// Provider timestamp of the underlying data, when known.
    pub observed_at: Option<DateTime<Utc>>,
    pub icon: String,
    pub description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub min: f64,
    pub max: f64,
    /// Wind speed in m/s.
    pub wind: f64,
    /// Gust speed in m/s.
    pub wind_gust: f64,
    pub wind_degrees: u16,
    pub humidity: u8,
    pub has_data: bool,
}

impl Forecast {
    /// 16-point compass name for `wind_degrees`.
    pub fn compass_point(&self) -> &'static str {
        let index = (f64::from(self.wind_degrees) / 22.5).round() as usize % COMPASS_POINTS.len();
        COMPASS_POINTS[index]
    }

    /// Provider icon image, only when there is something to show.
    pub fn icon_url(&self) -> Option<String> {
        if self.has_data && !self.icon.is_empty() {
            Some(format!("{ICON_BASE_URL}/{}@4x.png", self.icon))
        } else {
            None
        }
    }
}

/// One 3-hour interval from the raw forecast feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub timestamp: DateTime<Utc>,
    /// `timestamp` shifted into the viewer's local time.
    pub local: NaiveDateTime,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub icon: String,
    pub description: String,
    pub humidity: u8,
    pub wind_speed: f64,
    pub wind_degrees: u16,
    pub wind_gust: f64,
}

impl RawReading {
    pub fn local_date(&self) -> NaiveDate {
        self.local.date()
    }

    pub fn local_hour(&self) -> u32 {
        self.local.hour()
    }
}

/// Latitude/longitude pair. `(0, 0)` means "not resolved yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const UNRESOLVED: Coordinates = Coordinates { latitude: 0.0, longitude: 0.0 };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_resolved(&self) -> bool {
        self.latitude != 0.0 || self.longitude != 0.0
    }

    /// Query-string form, rounded to two decimal places.
    pub fn query_pair(&self) -> (String, String) {
        (format!("{:.2}", self.latitude), format!("{:.2}", self.longitude))
    }
}
