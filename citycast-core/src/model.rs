pub mod city;
pub mod forecast;

pub use city::{City, FORECAST_DAYS, Identity, SerializedCity, title_case};
pub use forecast::{Coordinates, Forecast, RawReading};
