use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use citycast_core::{
    City, CityDirectory, Config, CountryCatalog, MemoryStore, SearchError, SearchOutcome,
    SearchSequencer, SearchSession, Store,
    provider::{country_provider_from_config, weather_provider_from_config},
    storage::{CITY_LIST_KEY, COUNTRIES_KEY, DEFAULT_CITY_KEY},
};
use inquire::{Password, PasswordDisplayMode, Text};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citycast", version, about = "City weather lists from the terminal")]
pub struct Cli {
    /// Work on an in-memory copy of the saved lists; nothing is written back.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and the search history list.
    Configure,

    /// Search for a city and show its current weather and next five days.
    Show {
        /// City name, e.g. "Melbourne".
        city: String,

        /// Two-letter country code, e.g. "AU".
        country: String,

        /// List the city is saved under; defaults to the search history.
        #[arg(long)]
        list: Option<String>,
    },

    /// Fetch fresh weather for the last viewed city.
    Refresh,

    /// Print the cities in a list. "Favourites" gathers favourites from every list.
    List {
        name: Option<String>,
    },

    /// Mark a city as favourite in every list it appears in.
    Favourite {
        city: String,
        country: String,

        #[arg(long)]
        unset: bool,
    },

    /// Remove a city from one list.
    Remove {
        city: String,
        country: String,

        #[arg(long)]
        list: String,
    },

    /// Print the known countries, fetching them if the cache is missing or short.
    Countries {
        #[arg(long)]
        refresh: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, country, list } => {
                let config = Config::load()?;
                let store = open_store(&config, self.dry_run)?;
                let list = list.unwrap_or_else(|| config.history_list.clone());
                search(&config, store, City::new(&city, &country), list).await
            }
            Command::Refresh => {
                let config = Config::load()?;
                let store = open_store(&config, self.dry_run)?;
                let city = CityDirectory::load(store.clone())?.last_viewed();
                let list = if city.list_name.is_empty() {
                    config.history_list.clone()
                } else {
                    city.list_name.clone()
                };
                search(&config, store, city, list).await
            }
            Command::List { name } => {
                let config = Config::load()?;
                let directory = CityDirectory::load(open_store(&config, self.dry_run)?)?;
                let name = name.unwrap_or_else(|| config.history_list.clone());

                let cities = directory.list_for(&name);
                if cities.is_empty() {
                    println!("No cities in \"{name}\".");
                    let names = directory.list_names();
                    if !names.is_empty() {
                        println!("Lists: {}", names.join(", "));
                    }
                }
                for city in &cities {
                    println!("{}", render::city_line(city));
                }
                Ok(())
            }
            Command::Favourite { city, country, unset } => {
                let config = Config::load()?;
                let mut directory = CityDirectory::load(open_store(&config, self.dry_run)?)?;
                let city = City::new(&city, &country);

                directory.set_favourite(&city.city_name, &city.country_code, !unset);
                let state = if unset { "no longer a favourite" } else { "a favourite" };
                println!("{} is now {state}.", city.city_name);
                Ok(())
            }
            Command::Remove { city, country, list } => {
                let config = Config::load()?;
                let mut directory = CityDirectory::load(open_store(&config, self.dry_run)?)?;
                let city = City::new(&city, &country);

                if directory.remove(&city.city_name, &city.country_code, &list) {
                    println!("Removed {} from \"{list}\".", city.city_name);
                } else {
                    println!("{} is not in \"{list}\".", city.city_name);
                }
                Ok(())
            }
            Command::Countries { refresh } => {
                let config = Config::load()?;
                let store = open_store(&config, self.dry_run)?;
                let provider = country_provider_from_config(&config)?;

                let load = CountryCatalog::load_or_fetch(store.as_ref(), provider.as_ref(), refresh)
                    .await?;
                for country in load.catalog.for_selection() {
                    println!("{}", render::country_line(&country));
                }
                if let Some(failure) = &load.failure {
                    eprintln!("Note: {failure}; the list may be incomplete.");
                }
                Ok(())
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(api_key);

    config.history_list = Text::new("Search history list name:")
        .with_default(&config.history_list)
        .prompt()
        .context("Failed to read history list name")?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

/// The on-disk store, or an in-memory copy of it for `--dry-run`.
fn open_store(config: &Config, dry_run: bool) -> anyhow::Result<Arc<dyn Store>> {
    let disk = config.store()?;
    if !dry_run {
        return Ok(Arc::new(disk));
    }

    let memory = MemoryStore::new();
    for key in [CITY_LIST_KEY, DEFAULT_CITY_KEY, COUNTRIES_KEY] {
        if let Some(value) = disk.load(key)? {
            memory.save(key, &value)?;
        }
    }
    tracing::debug!("dry run: changes stay in memory");
    Ok(Arc::new(memory))
}

async fn search(
    config: &Config,
    store: Arc<dyn Store>,
    city: City,
    list: String,
) -> anyhow::Result<()> {
    let provider = weather_provider_from_config(config)?;
    let mut directory = CityDirectory::load(store.clone())?;
    let catalog = CountryCatalog::cached(store.as_ref())?.unwrap_or_default();

    let today = chrono::Local::now().date_naive();
    let mut sequencer = SearchSequencer::new();
    let mut session = SearchSession::new(city, today)
        .into_list(list)
        .with_ticket(sequencer.issue());
    session.enrich_country(&catalog);

    match session.run(provider.as_ref(), &mut directory, &sequencer).await {
        Ok(SearchOutcome::Done(report)) => {
            println!("{}", render::report(&report.city));
            if report.forecast_warning.is_some() {
                eprintln!("Note: the five day forecast is unavailable right now.");
            }
            Ok(())
        }
        Ok(SearchOutcome::Superseded) => Ok(()),
        Err(err) => {
            eprintln!("{}", err.user_message());
            Err(search_failure(err))
        }
    }
}

fn search_failure(err: SearchError) -> anyhow::Error {
    let reason = err.reason();
    anyhow::Error::new(err).context(format!("search failed ({reason})"))
}
