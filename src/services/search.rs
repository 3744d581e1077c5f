// src/services/search.rs

//! Page fetcher contract and the per-city page loop.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{City, PlaceEntry};

/// One page query against the search API.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub query: &'a str,
    pub city: &'a City,
    /// 1-based page number
    pub page: u32,
}

/// Source of search result pages.
///
/// An empty `Ok` means the location has no more results. Any `Err` ends the
/// current city's page loop.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<Vec<PlaceEntry>>;
}

/// Why the page loop for a city stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStop {
    /// Every budgeted page returned entries.
    PageBudgetSpent,
    /// A page came back empty; later pages were not requested.
    NoMoreResults { page: u32 },
    /// A page request failed; earlier pages are kept.
    Failed { page: u32, message: String },
}

/// Everything gathered for one city.
#[derive(Debug, Clone)]
pub struct CityFetch {
    pub entries: Vec<PlaceEntry>,
    pub pages_requested: u32,
    pub stop: FetchStop,
}

impl CityFetch {
    pub fn failed(&self) -> bool {
        matches!(self.stop, FetchStop::Failed { .. })
    }
}

/// Request pages `1..=page_budget` for a city, strictly one after another.
///
/// Never fails: a page error is logged and recorded in [`FetchStop::Failed`],
/// and entries from earlier pages are returned with it.
pub async fn fetch_city(
    fetcher: &dyn PageFetcher,
    query: &str,
    city: &City,
    page_budget: u32,
) -> CityFetch {
    let mut entries = Vec::new();
    let mut pages_requested = 0;

    for page in 1..=page_budget {
        pages_requested += 1;
        let request = PageRequest { query, city, page };

        match fetcher.fetch_page(request).await {
            Ok(places) if places.is_empty() => {
                log::debug!("{}: page {} empty, stopping early", city.name, page);
                return CityFetch {
                    entries,
                    pages_requested,
                    stop: FetchStop::NoMoreResults { page },
                };
            }
            Ok(places) => {
                log::debug!("{}: page {} returned {} places", city.name, page, places.len());
                entries.extend(places);
            }
            Err(error) => {
                log::warn!("{}: request for page {} failed: {}", city.name, page, error);
                return CityFetch {
                    entries,
                    pages_requested,
                    stop: FetchStop::Failed {
                        page,
                        message: error.to_string(),
                    },
                };
            }
        }
    }

    CityFetch {
        entries,
        pages_requested,
        stop: FetchStop::PageBudgetSpent,
    }
}
