//! One search: resolve a city, fetch its weather, fold it into the directory.

use anyhow::anyhow;
use chrono::NaiveDate;

use crate::{
    aggregate::aggregate,
    country::CountryCatalog,
    directory::{CityDirectory, SEARCH_HISTORY_LIST},
    error::{ForecastWarning, SearchError},
    model::City,
    provider::WeatherProvider,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ResolvingCoordinates,
    FetchingCurrent,
    FetchingForecast,
    Reconciling,
    Done,
    /// Carries [`SearchError::reason`].
    Failed(&'static str),
}

/// Position of a search in the order searches were started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchTicket(u64);

/// Hands out tickets so that only the newest search may write its result.
///
/// A response that arrives after a later search was started is dropped
/// instead of overwriting the newer result.
#[derive(Debug, Default)]
pub struct SearchSequencer {
    latest: u64,
}

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> SearchTicket {
        self.latest += 1;
        SearchTicket(self.latest)
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        ticket.0 == self.latest
    }
}

/// Result of reconciling a finished fetch.
#[derive(Debug)]
pub enum SearchOutcome {
    Done(SearchReport),
    /// A newer search was started meanwhile; the directory was not touched.
    Superseded,
}

#[derive(Debug)]
pub struct SearchReport {
    /// Copy of the working city as it was reconciled.
    pub city: City,
    /// Set when only current weather could be fetched.
    pub forecast_warning: Option<ForecastWarning>,
}

/// Drives a single search from coordinates to a reconciled directory.
#[derive(Debug)]
pub struct SearchSession {
    city: City,
    today: NaiveDate,
    target_list: String,
    ticket: Option<SearchTicket>,
    state: SessionState,
    visited: Vec<SessionState>,
    forecast_warning: Option<ForecastWarning>,
}

impl SearchSession {
    /// Starts from `city`, which becomes the session's working record.
    /// Known coordinates on it skip geocoding.
    pub fn new(city: City, today: NaiveDate) -> Self {
        Self {
            city,
            today,
            target_list: SEARCH_HISTORY_LIST.to_string(),
            ticket: None,
            state: SessionState::Idle,
            visited: vec![SessionState::Idle],
            forecast_warning: None,
        }
    }

    pub fn for_search(city_name: &str, country_code: &str, today: NaiveDate) -> Self {
        Self::new(City::new(city_name, country_code), today)
    }

    /// List the result is filed under.
    pub fn into_list(mut self, list_name: impl Into<String>) -> Self {
        self.target_list = list_name.into();
        self
    }

    pub fn with_ticket(mut self, ticket: SearchTicket) -> Self {
        self.ticket = Some(ticket);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn visited(&self) -> &[SessionState] {
        &self.visited
    }

    pub fn city(&self) -> &City {
        &self.city
    }

    /// Fills in the country name from `catalog` when it is still unknown.
    pub fn enrich_country(&mut self, catalog: &CountryCatalog) {
        if self.city.country_name.is_empty() {
            if let Some(name) = catalog.name_for(&self.city.country_code) {
                self.city.country_name = name.to_string();
            }
        }
    }

    fn enter(&mut self, state: SessionState) {
        tracing::debug!(city = %self.city.city_name, ?state, "search session");
        self.visited.push(state.clone());
        self.state = state;
    }

    fn fail(&mut self, err: SearchError) -> SearchError {
        tracing::warn!(reason = err.reason(), "{err}: {:#}", anyhow_source(&err));
        self.enter(SessionState::Failed(err.reason()));
        err
    }

    /// Runs the fetch states. On success the returned handle is the only way
    /// to reconcile, so a failed session can never write to a directory.
    pub async fn fetch(
        &mut self,
        provider: &dyn WeatherProvider,
    ) -> Result<FetchedSearch<'_>, SearchError> {
        if !self.city.coordinates().is_resolved() {
            self.enter(SessionState::ResolvingCoordinates);

            let resolved = provider
                .geocode(&self.city.city_name, &self.city.country_code)
                .await
                .and_then(|candidates| {
                    candidates
                        .into_iter()
                        .next()
                        .filter(|c| c.coordinates.is_resolved())
                        .ok_or_else(|| anyhow!("Geocoding returned no usable candidate"))
                });

            match resolved {
                Ok(candidate) => {
                    self.city.set_coordinates(candidate.coordinates);
                    self.city.state_name = candidate.state_name.unwrap_or_default();
                }
                Err(source) => {
                    let err = SearchError::CoordinateResolution {
                        city: self.city.city_name.clone(),
                        country: self.city.country_code.clone(),
                        source,
                    };
                    return Err(self.fail(err));
                }
            }
        }

        let at = self.city.coordinates();

        self.enter(SessionState::FetchingCurrent);
        match provider.current_weather(at).await {
            Ok(current) => {
                self.city.current_weather = current;
                self.city.current_weather.has_data = true;
                self.city.has_data = true;
            }
            Err(source) => {
                self.city.clear_weather_flags();
                let err = SearchError::CurrentWeather { city: self.city.city_name.clone(), source };
                return Err(self.fail(err));
            }
        }

        self.enter(SessionState::FetchingForecast);
        match provider.five_day_forecast(at).await {
            Ok(readings) => {
                self.city.set_daily_forecasts(aggregate(&readings, self.today));
            }
            Err(source) => {
                self.city.set_forecast_has_data(false);
                let warning = ForecastWarning { city: self.city.city_name.clone(), source };
                tracing::warn!("{warning}: {:#}", warning.source);
                self.forecast_warning = Some(warning);
            }
        }

        Ok(FetchedSearch { session: self })
    }

    /// Fetch then reconcile in one go.
    pub async fn run(
        &mut self,
        provider: &dyn WeatherProvider,
        directory: &mut CityDirectory,
        sequencer: &SearchSequencer,
    ) -> Result<SearchOutcome, SearchError> {
        let fetched = self.fetch(provider).await?;
        Ok(fetched.reconcile(directory, sequencer))
    }
}

/// A session whose fetch states completed, ready to be reconciled.
#[derive(Debug)]
pub struct FetchedSearch<'a> {
    session: &'a mut SearchSession,
}

impl FetchedSearch<'_> {
    pub fn city(&self) -> &City {
        &self.session.city
    }

    /// Files the result under the session's list, spreads its weather to
    /// every list holding the same place and remembers it as last viewed.
    pub fn reconcile(self, directory: &mut CityDirectory, sequencer: &SearchSequencer) -> SearchOutcome {
        let session = self.session;
        session.enter(SessionState::Reconciling);

        if let Some(ticket) = session.ticket {
            if !sequencer.is_current(ticket) {
                tracing::info!(city = %session.city.city_name, "dropping result of superseded search");
                session.enter(SessionState::Done);
                return SearchOutcome::Superseded;
            }
        }

        // Favourite status is owned by the directory; the flag on the
        // working record may be stale.
        let city = &mut session.city;
        city.list_name = session.target_list.clone();
        city.is_favourite = directory.is_favourite(&city.city_name, &city.country_code);
        directory.upsert(city);

        if let Some(stored) = directory.get(&city.city_name, &city.country_code, &city.list_name) {
            city.is_favourite = stored.is_favourite;
        }

        directory.propagate_weather(&session.city);
        directory.set_last_viewed(&session.city);

        session.enter(SessionState::Done);
        tracing::info!(
            city = %session.city.display_name(),
            forecast = session.forecast_warning.is_none(),
            "search complete"
        );

        SearchOutcome::Done(SearchReport {
            city: session.city.clone(),
            forecast_warning: session.forecast_warning.take(),
        })
    }
}

fn anyhow_source(err: &SearchError) -> &anyhow::Error {
    match err {
        SearchError::CoordinateResolution { source, .. } | SearchError::CurrentWeather { source, .. } => {
            source
        }
    }
}
