//! Service layer for the listing crawler.
//!
//! This module contains the business logic for:
//! - Loading the ordered city list (`CitySource`)
//! - Walking a city's result pages (`fetch_city`, `PageFetcher`)
//! - Talking to the maps search API (`SerperClient`)

mod cities;
mod search;
mod serper;

pub use cities::{CitySource, sort_by_population};
pub use search::{CityFetch, FetchStop, PageFetcher, PageRequest, fetch_city};
pub use serper::SerperClient;
