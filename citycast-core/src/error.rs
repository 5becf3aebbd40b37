use thiserror::Error;

/// Fatal outcomes of a search session.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Could not resolve coordinates for {city}, {country}")]
    CoordinateResolution {
        city: String,
        country: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not retrieve current weather for {city}")]
    CurrentWeather {
        city: String,
        #[source]
        source: anyhow::Error,
    },
}

impl SearchError {
    /// Stable machine-readable slug.
    pub fn reason(&self) -> &'static str {
        match self {
            SearchError::CoordinateResolution { .. } => "coordinates-unresolved",
            SearchError::CurrentWeather { .. } => "current-weather-unavailable",
        }
    }

    /// Short notice suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            SearchError::CoordinateResolution { .. } => {
                "Could not retrieve weather information as the city coordinates could not be found."
            }
            SearchError::CurrentWeather { .. } => "Could not retrieve weather information.",
        }
    }
}

/// The five-day feed failed but current weather is still usable.
#[derive(Debug, Error)]
#[error("Could not retrieve five day forecast for {city}")]
pub struct ForecastWarning {
    pub city: String,
    #[source]
    pub source: anyhow::Error,
}

/// A country page failed to load; earlier pages are kept.
#[derive(Debug, Error)]
#[error("Country list stopped at page {page}")]
pub struct PaginationFailure {
    pub page: u32,
    #[source]
    pub source: anyhow::Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn reasons_are_stable() {
        let unresolved = SearchError::CoordinateResolution {
            city: "Atlantis".into(),
            country: "XX".into(),
            source: anyhow::anyhow!("no candidates"),
        };
        let current = SearchError::CurrentWeather {
            city: "Paris".into(),
            source: anyhow::anyhow!("status 500"),
        };

        assert_eq!(unresolved.reason(), "coordinates-unresolved");
        assert_eq!(current.reason(), "current-weather-unavailable");
    }

    #[test]
    fn source_is_kept_for_diagnostics() {
        let err = SearchError::CurrentWeather {
            city: "Paris".into(),
            source: anyhow::anyhow!("status 500"),
        };

        assert_eq!(err.to_string(), "Could not retrieve current weather for Paris");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("status 500"));
    }
}
