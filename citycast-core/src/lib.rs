//! Core library for the `citycast` CLI.
//!
//! This crate defines:
//! - The city and forecast model, and the daily forecast aggregation
//! - The city directory that keeps list memberships consistent
//! - Search sessions tying geocoding, fetching and reconciliation together
//! - Weather and country providers, storage and configuration
//!
//! It is used by `citycast-cli`, but can also be reused by other binaries or services.

pub mod aggregate;
pub mod config;
pub mod country;
pub mod directory;
pub mod error;
pub mod model;
pub mod provider;
pub mod session;
pub mod storage;

pub use aggregate::aggregate;
pub use config::Config;
pub use country::{Country, CountryCatalog};
pub use directory::{CityDirectory, FAVOURITES_LIST, SEARCH_HISTORY_LIST};
pub use error::{ForecastWarning, PaginationFailure, SearchError};
pub use model::{City, Coordinates, Forecast, RawReading, SerializedCity};
pub use provider::{CountryProvider, WeatherProvider};
pub use session::{SearchOutcome, SearchSequencer, SearchSession, SessionState};
pub use storage::{JsonFileStore, MemoryStore, Store};
